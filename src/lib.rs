// ==========================================
// 车队收益台账系统 - 历史流水批量导入库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 宿主应用管理操作内嵌的导入子系统（无独立命令行入口）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 持久化网关
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 会话配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CanonicalField, DateOrder, EntityId, EntityKind, ImportStep, Severity,
};

// 领域实体
pub use domain::{
    ColumnMapping, EntityStub, ImportIssue, ImportSummary, LedgerEntry, ProviderColumn, RowRecord,
};

// 配置
pub use config::{AliasTable, CancelFlag, ProviderConfig, SessionConfig};

// 导入管道
pub use importer::{
    ImportError, ImportOrchestrator, ImportResult, ProgressSink, ProgressSnapshot,
    UNKNOWN_DRIVER, UNKNOWN_VEHICLE,
};

// 持久化网关
pub use repository::{GatewayError, PersistenceGateway, SqliteGateway};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车队收益台账系统";
