// ==========================================
// 车队收益台账系统 - SQLite 持久化网关实现
// ==========================================
// 职责: PersistenceGateway 的生产实现
// 存储: entity 表（司机/车辆统一） + ledger_entry 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::ledger::LedgerEntry;
use crate::domain::types::{EntityId, EntityKind};
use crate::repository::error::{GatewayError, GatewayResult};
use crate::repository::persistence_gateway::PersistenceGateway;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// SqliteGateway
// ==========================================
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// 打开数据库文件并初始化 schema
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> GatewayResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试用）
    pub fn new_in_memory() -> GatewayResult<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::configure_sqlite_connection(&conn)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 初始化 schema（幂等）
    ///
    /// 说明:
    /// - entity.name 使用 COLLATE NOCASE，配合 UNIQUE(kind, name)
    ///   保证"大小写不同的同名实体"不会重复建档
    fn init_schema(conn: &Connection) -> GatewayResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entity (
                entity_id  TEXT PRIMARY KEY,
                kind       TEXT NOT NULL,
                name       TEXT NOT NULL COLLATE NOCASE,
                created_at TEXT NOT NULL,
                UNIQUE(kind, name)
            );

            CREATE TABLE IF NOT EXISTS ledger_entry (
                entry_id       TEXT PRIMARY KEY,
                entry_date     TEXT NOT NULL,
                driver_id      TEXT NOT NULL REFERENCES entity(entity_id),
                vehicle_id     TEXT NOT NULL REFERENCES entity(entity_id),
                earnings_json  TEXT NOT NULL,
                total_earnings REAL NOT NULL,
                notes          TEXT NOT NULL DEFAULT '',
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_entry_date
                ON ledger_entry(entry_date);
            CREATE INDEX IF NOT EXISTS idx_ledger_entry_driver
                ON ledger_entry(driver_id);
            "#,
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> GatewayResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::LockError(e.to_string()))
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn find_entity_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> GatewayResult<Option<EntityId>> {
        let conn = self.lock_conn()?;

        // name 列为 NOCASE，等值比较即大小写不敏感
        let id: Option<String> = conn
            .query_row(
                "SELECT entity_id FROM entity WHERE kind = ?1 AND name = ?2",
                params![kind.as_str(), name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id.map(EntityId))
    }

    async fn create_entity(&self, kind: EntityKind, name: &str) -> GatewayResult<EntityId> {
        let conn = self.lock_conn()?;
        let entity_id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
            INSERT INTO entity (entity_id, kind, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![entity_id, kind.as_str(), name, Utc::now()],
        )?;

        Ok(EntityId(entity_id))
    }

    async fn save_entry(&self, entry: &LedgerEntry) -> GatewayResult<()> {
        let earnings_json = serde_json::to_string(&entry.earnings)?;
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO ledger_entry (
                entry_id, entry_date, driver_id, vehicle_id,
                earnings_json, total_earnings, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.entry_id,
                entry.entry_date,
                entry.driver_id.0,
                entry.vehicle_id.0,
                earnings_json,
                entry.total_earnings,
                entry.notes,
                entry.created_at,
                entry.updated_at,
            ],
        )?;

        Ok(())
    }
}
