// ==========================================
// 车队收益台账系统 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 红线: 阶段严格串行，上一阶段完整输出后才进入下一阶段
// ==========================================

use crate::domain::ledger::{ColumnMapping, ImportIssue, RowRecord};
use crate::domain::types::ImportStep;
use crate::importer::entity_resolver::EntityResolutionPlan;
use crate::importer::error::ImportResult;
use crate::repository::persistence_gateway::PersistenceGateway;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// ParsedFile - 文件解析产物
// ==========================================
// rows 与表头按列号对齐；RawRow 即 Vec<String>
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 字节流 → 表头 + 原始数据行（阶段 READING）
// 实现者: CsvFileParser, ExcelFileParser
pub trait FileParser: Send + Sync {
    /// 解析输入字节流
    ///
    /// # 返回
    /// - Ok(ParsedFile): 表头 + 数据行（全空白行已剔除）
    /// - Err: 空输入、编码/格式错误
    fn parse(&self, bytes: &[u8]) -> ImportResult<ParsedFile>;
}

// ==========================================
// ColumnMapper Trait
// ==========================================
// 用途: 表头 → 规范字段映射（阶段 MAPPING）
// 实现者: ColumnMapper（别名表 + 模糊匹配）
pub trait ColumnMapper: Send + Sync {
    /// 将表头映射为 ColumnMapping
    ///
    /// # 返回
    /// - Ok((mapping, warnings)): 映射 + 可选字段缺失的会话级警告（row_number = 0）
    /// - Err(MissingRequiredColumn): 缺失 DATE 列，导入中止
    fn map_columns(&self, header: &[String]) -> ImportResult<(ColumnMapping, Vec<ImportIssue>)>;
}

// ==========================================
// RowParser Trait
// ==========================================
// 用途: 单行 → 已校验 RowRecord（阶段 PARSING）
// 实现者: RowParser（内部使用 DateParser）
pub trait RowParser: Send + Sync {
    /// 解析一个数据行
    ///
    /// # 参数
    /// - raw: 原始单元格序列（与表头列号对齐）
    /// - mapping: 列映射
    /// - row_number: 数据行号（1 起算，不含表头）
    ///
    /// # 返回
    /// - Ok((record, warnings)): 完整 RowRecord + 零或多条 WARNING
    /// - Err(issue): 单条 ERROR，整行排除
    fn parse_row(
        &self,
        raw: &[String],
        mapping: &ColumnMapping,
        row_number: usize,
    ) -> Result<(RowRecord, Vec<ImportIssue>), ImportIssue>;
}

// ==========================================
// EntityResolver Trait
// ==========================================
// 用途: 去重解析/新建被引用实体（阶段 RESOLVING）
// 实现者: EntityResolver
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// 解析全部非排除行引用的司机/车辆名
    ///
    /// # 说明
    /// - 名称按大小写不敏感去重，同名只建一次
    /// - 单个实体创建失败不中止，失败记录进 plan 由上层降级相关行
    async fn resolve(
        &self,
        records: &[RowRecord],
        gateway: &dyn PersistenceGateway,
    ) -> ImportResult<EntityResolutionPlan>;
}

// ==========================================
// ProgressSnapshot / ProgressSink
// ==========================================
// 用途: 阶段边界与落库行间的进度上报
// 约定: 无 sink（headless）时管道必须照常工作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_step: ImportStep,
    pub percent_complete: u8,
    pub errors_so_far: usize,
    pub warnings_so_far: usize,
}

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}
