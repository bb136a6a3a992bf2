// ==========================================
// 车队收益台账系统 - 导入层
// ==========================================
// 职责: 历史流水文件导入，生成台账条目
// 流程: 读取 → 列映射 → 行解析 → 实体解析 → 落库 → 汇总
// ==========================================

// 模块声明
pub mod column_mapper;
pub mod date_parser;
pub mod entity_resolver;
pub mod error;
pub mod file_parser;
pub mod import_orchestrator;
pub mod import_pipeline_trait;
pub mod row_parser;

// 重导出核心类型
pub use column_mapper::ColumnMapper as ColumnMapperImpl;
pub use date_parser::DateParser;
pub use entity_resolver::{EntityResolutionPlan, EntityResolver as EntityResolverImpl, NameResolution};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvFileParser, ExcelFileParser};
pub use import_orchestrator::ImportOrchestrator;
pub use row_parser::{RowParser as RowParserImpl, UNKNOWN_DRIVER, UNKNOWN_VEHICLE};

// 重导出 Trait 接口
pub use import_pipeline_trait::{
    ColumnMapper, EntityResolver, FileParser, ParsedFile, ProgressSink, ProgressSnapshot,
    RowParser,
};
