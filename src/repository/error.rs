// ==========================================
// 车队收益台账系统 - 持久化网关错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 持久化网关错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    TransactionError(String),

    #[error("数据库查询失败: {0}")]
    QueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据错误 =====
    #[error("字段序列化失败 (field={field}): {message}")]
    SerializationError { field: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    GatewayError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    GatewayError::ForeignKeyViolation(msg)
                } else {
                    GatewayError::QueryError(msg)
                }
            }
            _ => GatewayError::QueryError(err.to_string()),
        }
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::SerializationError {
            field: "earnings".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type GatewayResult<T> = Result<T, GatewayError>;
