// ==========================================
// 车队收益台账系统 - 持久化网关 Trait
// ==========================================
// 职责: 定义导入管道消费的最小读写契约（不包含实现）
// 红线: 网关不含业务规则，只做数据存取
// ==========================================

use crate::domain::ledger::LedgerEntry;
use crate::domain::types::{EntityId, EntityKind};
use crate::repository::error::GatewayResult;
use async_trait::async_trait;

// ==========================================
// PersistenceGateway Trait
// ==========================================
// 用途: 实体查找/创建 + 台账条目写入
// 实现者: SqliteGateway（生产）、测试内 Mock
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// 按名查找实体（大小写不敏感的精确匹配）
    ///
    /// # 参数
    /// - kind: 实体种类
    /// - name: 实体名
    ///
    /// # 返回
    /// - Ok(Some(id)): 已存在
    /// - Ok(None): 不存在
    async fn find_entity_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> GatewayResult<Option<EntityId>>;

    /// 创建实体并返回新 id
    ///
    /// # 参数
    /// - kind: 实体种类
    /// - name: 实体名（保留调用方给定的写法）
    async fn create_entity(&self, kind: EntityKind, name: &str) -> GatewayResult<EntityId>;

    /// 写入一条台账条目
    ///
    /// # 参数
    /// - entry: 待落库条目（业务日期与审计时间均已填好）
    async fn save_entry(&self, entry: &LedgerEntry) -> GatewayResult<()>;
}
