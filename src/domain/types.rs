// ==========================================
// 车队收益台账系统 - 基础类型定义
// ==========================================
// 职责: 导入管道公用的枚举与标识类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Severity - 导入问题级别
// ==========================================
// Error: 整行排除，不落库
// Warning: 以占位值/默认值落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

// ==========================================
// DateOrder - 日期字段顺序约定
// ==========================================
// 红线: 整个导入会话固定一种约定，绝不逐行推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

// ==========================================
// EntityKind - 被引用实体种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Driver,
    Vehicle,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// CanonicalField - 规范语义字段
// ==========================================
// 表头模糊匹配的目标；匹配优先级: DATE → DRIVER → VEHICLE
// → 各平台（按配置顺序）→ NOTES
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalField {
    Date,
    Driver,
    Vehicle,
    Provider(String),
    Notes,
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalField::Date => f.write_str("DATE"),
            CanonicalField::Driver => f.write_str("DRIVER"),
            CanonicalField::Vehicle => f.write_str("VEHICLE"),
            CanonicalField::Provider(name) => f.write_str(name),
            CanonicalField::Notes => f.write_str("NOTES"),
        }
    }
}

// ==========================================
// EntityId - 实体标识
// ==========================================
// 由持久化网关分配（SQLite 实现使用 UUID 字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

// ==========================================
// ImportStep - 导入状态机
// ==========================================
// IDLE → READING → MAPPING → PARSING → RESOLVING → PERSISTING → COMPLETE
// ABORTED 仅可由 MAPPING 进入（缺失必需日期列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStep {
    Idle,
    Reading,
    Mapping,
    Parsing,
    Resolving,
    Persisting,
    Complete,
    Aborted,
}

impl ImportStep {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStep::Complete | ImportStep::Aborted)
    }

    /// 阶段完成后的基准进度百分比（PERSISTING 在 70-95 区间内按行插值）
    pub fn base_percent(&self) -> u8 {
        match self {
            ImportStep::Idle => 0,
            ImportStep::Reading => 10,
            ImportStep::Mapping => 20,
            ImportStep::Parsing => 55,
            ImportStep::Resolving => 70,
            ImportStep::Persisting => 95,
            ImportStep::Complete => 100,
            ImportStep::Aborted => 100,
        }
    }
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStep::Idle => "IDLE",
            ImportStep::Reading => "READING",
            ImportStep::Mapping => "MAPPING",
            ImportStep::Parsing => "PARSING",
            ImportStep::Resolving => "RESOLVING",
            ImportStep::Persisting => "PERSISTING",
            ImportStep::Complete => "COMPLETE",
            ImportStep::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}
