// ==========================================
// 车队收益台账系统 - 导入会话配置
// ==========================================
// 职责: 单次导入的全部会话参数（日期顺序、平台别名表、取消信号、进度粒度）
// 红线: 配置随调用显式传入并贯穿各阶段，绝不使用进程级全局状态
// ==========================================

use crate::domain::types::DateOrder;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 落库阶段默认每多少行上报一次进度
pub const DEFAULT_PROGRESS_ROW_INTERVAL: usize = 25;

// ==========================================
// ProviderConfig - 收益平台配置
// ==========================================
// 每个平台一条，别名用于表头模糊匹配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub aliases: Vec<String>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// 仅以平台名自身作为别名
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            aliases: vec![name.clone()],
            name,
        }
    }
}

// ==========================================
// AliasTable - 规范字段别名表
// ==========================================
// 静态数据驱动（非内联条件分支），新增语言/同义词只改数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasTable {
    pub date: Vec<String>,
    pub driver: Vec<String>,
    pub vehicle: Vec<String>,
    pub notes: Vec<String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            date: owned(&["date", "day", "fecha", "datum", "data", "trip date", "日期"]),
            driver: owned(&[
                "driver",
                "name",
                "fullname",
                "full name",
                "conductor",
                "chofer",
                "fahrer",
                "司机",
            ]),
            vehicle: owned(&[
                "vehicle", "car", "auto", "coche", "fahrzeug", "plate", "车辆",
            ]),
            notes: owned(&["notes", "note", "comment", "remarks", "observaciones", "备注"]),
        }
    }
}

// ==========================================
// CancelFlag - 取消信号
// ==========================================
// 仅在阶段边界与落库行间检查；已落库的行不回滚
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==========================================
// SessionConfig - 导入会话配置
// ==========================================
// 每次 run() 固定一份，中途不可变
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub date_order: DateOrder,
    pub providers: Vec<ProviderConfig>,
    pub aliases: AliasTable,
    pub progress_row_interval: usize,
    pub cancel: CancelFlag,
}

impl SessionConfig {
    pub fn new(date_order: DateOrder, providers: Vec<ProviderConfig>) -> Self {
        Self {
            date_order,
            providers,
            aliases: AliasTable::default(),
            progress_row_interval: DEFAULT_PROGRESS_ROW_INTERVAL,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_progress_row_interval(mut self, interval: usize) -> Self {
        // 0 视为 1，避免取模为零
        self.progress_row_interval = interval.max(1);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name.clone()).collect()
    }
}
