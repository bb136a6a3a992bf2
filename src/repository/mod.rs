// ==========================================
// 车队收益台账系统 - 数据仓储层
// ==========================================
// 职责: 提供持久化网关接口与 SQLite 实现
// 红线: 网关不含业务逻辑；所有查询参数化，防止 SQL 注入
// ==========================================

pub mod error;
pub mod persistence_gateway;
pub mod sqlite_gateway;

// 重导出核心类型
pub use error::{GatewayError, GatewayResult};
pub use persistence_gateway::PersistenceGateway;
pub use sqlite_gateway::SqliteGateway;
