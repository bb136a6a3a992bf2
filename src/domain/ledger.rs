// ==========================================
// 车队收益台账系统 - 台账领域模型
// ==========================================
// 职责: 导入管道的中间产物与落库实体
// 红线: RowRecord 仅存在于解析与落库之间，绝不部分落库
// ==========================================

use crate::domain::types::{EntityId, EntityKind, ImportStep, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ColumnMapping - 规范字段 → 列号映射
// ==========================================
// 用途: 表头识别结果，整个文件构建一次，此后不可变
// 不变式: DATE 必须存在；其余字段均可缺失
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: usize,                   // 必需
    pub driver: Option<usize>,
    pub vehicle: Option<usize>,
    pub notes: Option<usize>,
    pub providers: Vec<ProviderColumn>, // 仅含匹配到列的平台
}

impl ColumnMapping {
    /// 指定平台匹配到的列号
    pub fn provider_column(&self, name: &str) -> Option<usize> {
        self.providers
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderColumn {
    pub name: String, // 配置中的平台名
    pub column: usize,
}

// ==========================================
// RowRecord - 导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（行解析 → 实体解析 → 落库转换）
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRecord {
    pub row_number: usize,              // 数据行号（1 起算，不含表头）
    pub date: DateTime<Utc>,            // 业务日期（UTC 当日零点）
    pub driver_name: String,            // 司机名（缺失时为占位值）
    pub vehicle_name: String,           // 车辆名（缺失时为占位值）
    pub earnings: BTreeMap<String, f64>, // 平台 → 非负收益，默认 0.0
    pub notes: String,                  // 备注（无备注列时为空串）
}

impl RowRecord {
    /// 当行全部平台收益之和
    pub fn total_earnings(&self) -> f64 {
        self.earnings.values().sum()
    }
}

// ==========================================
// ImportIssue - 导入问题记录
// ==========================================
// 用途: 按行归因的缺陷记录（排序后进入 ImportSummary）
// 约定: row_number = 0 表示会话级问题（如可选列未匹配）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportIssue {
    pub row_number: usize,
    pub severity: Severity,
    pub field: Option<String>, // 出问题的规范字段（可定位到列）
    pub message: String,       // 面向用户的英文消息，含原始文本
}

impl ImportIssue {
    pub fn error(row_number: usize, field: Option<String>, message: impl Into<String>) -> Self {
        Self {
            row_number,
            severity: Severity::Error,
            field,
            message: message.into(),
        }
    }

    pub fn warning(row_number: usize, field: Option<String>, message: impl Into<String>) -> Self {
        Self {
            row_number,
            severity: Severity::Warning,
            field,
            message: message.into(),
        }
    }
}

// ==========================================
// EntityStub - 实体解析占位
// ==========================================
// 生命周期: 仅在 RESOLVING 阶段内
#[derive(Debug, Clone)]
pub struct EntityStub {
    pub kind: EntityKind,
    pub name: String,                // 首次出现时的原始写法
    pub resolved_id: Option<EntityId>, // 解析完成前为 None
}

// ==========================================
// LedgerEntry - 落库台账条目
// ==========================================
// 用途: PERSISTING 阶段由 RowRecord + 实体 id 转换而来
// 约定: entry_date 为行内业务日期; created_at/updated_at 为导入时刻的系统时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: String,               // UUID
    pub entry_date: DateTime<Utc>,      // 业务日期（UTC 零点，按日聚合口径）
    pub driver_id: EntityId,
    pub vehicle_id: EntityId,
    pub earnings: BTreeMap<String, f64>,
    pub total_earnings: f64,            // 派生: 各平台之和
    pub notes: String,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
// 用途: run() 的同步返回值，不落库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,                          // 批次 ID（UUID）
    pub total_rows: usize,                         // 数据行总数（不含表头）
    pub succeeded_rows: usize,                     // 成功落库行数（含带警告行）
    pub failed_rows: usize,                        // 被排除行数
    pub warning_rows: usize,                       // 带警告落库的行数
    pub issues: Vec<ImportIssue>,                  // 按 row_number 升序
    pub created_entities: BTreeMap<EntityKind, usize>, // 本次新建实体数（按种类）
    pub final_step: ImportStep,                    // COMPLETE 或 ABORTED
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    /// 指定种类的新建实体数
    pub fn created_count(&self, kind: EntityKind) -> usize {
        self.created_entities.get(&kind).copied().unwrap_or(0)
    }

    /// 指定级别的问题数
    pub fn issue_count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}
