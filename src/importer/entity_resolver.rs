// ==========================================
// 车队收益台账系统 - 实体解析器实现
// ==========================================
// 职责: 阶段 RESOLVING - 解析/自动建档被引用的司机与车辆
// 红线: 名称按大小写不敏感去重，一次运行内同名只建档一次；
//       单个实体建档失败只降级相关行，绝不中止整个文件
// ==========================================

use crate::domain::ledger::{EntityStub, RowRecord};
use crate::domain::types::{EntityId, EntityKind};
use crate::importer::error::ImportResult;
use crate::importer::import_pipeline_trait::EntityResolver as EntityResolverTrait;
use crate::repository::persistence_gateway::PersistenceGateway;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

// ==========================================
// NameResolution - 单个名称的解析结果
// ==========================================
#[derive(Debug, Clone)]
pub enum NameResolution {
    Resolved(EntityId),
    // 查找或建档失败；引用此名称的行由上层降级为 ERROR
    Failed(String),
}

// ==========================================
// EntityResolutionPlan - 解析计划
// ==========================================
// 确定性: 同一大小写不敏感键在一次运行内恒得同一结果
#[derive(Debug, Default)]
pub struct EntityResolutionPlan {
    resolutions: HashMap<(EntityKind, String), NameResolution>,
    created_counts: BTreeMap<EntityKind, usize>,
}

impl EntityResolutionPlan {
    /// 查询某名称的解析结果（键为小写）
    pub fn lookup(&self, kind: EntityKind, name: &str) -> Option<&NameResolution> {
        self.resolutions.get(&(kind, name.to_lowercase()))
    }

    /// 本次运行新建档的实体数（按种类）
    pub fn created_counts(&self) -> &BTreeMap<EntityKind, usize> {
        &self.created_counts
    }
}

// ==========================================
// EntityResolver
// ==========================================
pub struct EntityResolver;

impl EntityResolver {
    /// 按首次出现顺序收集去重后的名称占位
    fn collect_stubs(records: &[RowRecord]) -> Vec<EntityStub> {
        let mut seen: HashSet<(EntityKind, String)> = HashSet::new();
        let mut stubs = Vec::new();

        for record in records {
            let referenced = [
                (EntityKind::Driver, &record.driver_name),
                (EntityKind::Vehicle, &record.vehicle_name),
            ];
            for (kind, name) in referenced {
                if seen.insert((kind, name.to_lowercase())) {
                    stubs.push(EntityStub {
                        kind,
                        name: name.clone(), // 建档用首次出现的写法
                        resolved_id: None,
                    });
                }
            }
        }

        stubs
    }
}

#[async_trait]
impl EntityResolverTrait for EntityResolver {
    async fn resolve(
        &self,
        records: &[RowRecord],
        gateway: &dyn PersistenceGateway,
    ) -> ImportResult<EntityResolutionPlan> {
        let mut plan = EntityResolutionPlan::default();
        let stubs = Self::collect_stubs(records);

        info!(distinct_names = stubs.len(), "实体解析开始");

        for mut stub in stubs {
            let key = (stub.kind, stub.name.to_lowercase());

            let resolution = match gateway.find_entity_by_name(stub.kind, &stub.name).await {
                Ok(Some(id)) => NameResolution::Resolved(id),
                Ok(None) => match gateway.create_entity(stub.kind, &stub.name).await {
                    Ok(id) => {
                        info!(kind = %stub.kind, name = %stub.name, id = %id, "实体自动建档");
                        *plan.created_counts.entry(stub.kind).or_insert(0) += 1;
                        NameResolution::Resolved(id)
                    }
                    Err(e) => {
                        warn!(kind = %stub.kind, name = %stub.name, error = %e, "实体建档失败");
                        NameResolution::Failed(e.to_string())
                    }
                },
                // 查找失败与建档失败同策略: 只降级引用行
                Err(e) => {
                    warn!(kind = %stub.kind, name = %stub.name, error = %e, "实体查找失败");
                    NameResolution::Failed(e.to_string())
                }
            };

            if let NameResolution::Resolved(id) = &resolution {
                stub.resolved_id = Some(id.clone());
            }
            plan.resolutions.insert(key, resolution);
        }

        Ok(plan)
    }
}
