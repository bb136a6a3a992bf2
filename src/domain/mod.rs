// ==========================================
// 车队收益台账系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod ledger;
pub mod types;

// 重导出核心类型
pub use ledger::{
    ColumnMapping, EntityStub, ImportIssue, ImportSummary, LedgerEntry, ProviderColumn, RowRecord,
};
pub use types::{CanonicalField, DateOrder, EntityId, EntityKind, ImportStep, Severity};
