// ==========================================
// 车队收益台账系统 - 列映射器实现
// ==========================================
// 职责: 阶段 MAPPING - 表头 → 规范字段映射
// 算法: 归一化 → 精确匹配 → 双向子串匹配，按字段优先级
// 红线: 已匹配的列不可被第二个字段复用；映射构建后不可变
// ==========================================

use crate::config::session::SessionConfig;
use crate::domain::ledger::{ColumnMapping, ImportIssue, ProviderColumn};
use crate::domain::types::CanonicalField;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_pipeline_trait::ColumnMapper as ColumnMapperTrait;
use crate::importer::row_parser::{UNKNOWN_DRIVER, UNKNOWN_VEHICLE};
use std::collections::HashSet;
use tracing::debug;

pub struct ColumnMapper {
    // 按匹配优先级排列的 (字段, 归一化别名表)
    fields: Vec<(CanonicalField, Vec<String>)>,
}

impl ColumnMapper {
    /// 从会话配置构建别名表
    ///
    /// 优先级: DATE → DRIVER → VEHICLE → 各平台（配置顺序）→ NOTES
    pub fn new(config: &SessionConfig) -> Self {
        let mut fields = Vec::new();

        fields.push((
            CanonicalField::Date,
            normalize_aliases(&config.aliases.date),
        ));
        fields.push((
            CanonicalField::Driver,
            normalize_aliases(&config.aliases.driver),
        ));
        fields.push((
            CanonicalField::Vehicle,
            normalize_aliases(&config.aliases.vehicle),
        ));

        for provider in &config.providers {
            // 平台名本身始终可作为别名
            let mut aliases = vec![provider.name.clone()];
            aliases.extend(provider.aliases.iter().cloned());
            fields.push((
                CanonicalField::Provider(provider.name.clone()),
                normalize_aliases(&aliases),
            ));
        }

        fields.push((
            CanonicalField::Notes,
            normalize_aliases(&config.aliases.notes),
        ));

        Self { fields }
    }

    /// 在未被占用的列中为一个字段找列号
    ///
    /// 两趟: 先精确匹配，再双向子串匹配；同趟内取最左列
    fn find_column(
        &self,
        normalized_header: &[String],
        aliases: &[String],
        claimed: &HashSet<usize>,
    ) -> Option<usize> {
        // 第一趟: 精确匹配
        for (idx, cell) in normalized_header.iter().enumerate() {
            if cell.is_empty() || claimed.contains(&idx) {
                continue;
            }
            if aliases.iter().any(|a| a == cell) {
                return Some(idx);
            }
        }

        // 第二趟: 双向子串（表头含别名，或别名含表头）
        for (idx, cell) in normalized_header.iter().enumerate() {
            if cell.is_empty() || claimed.contains(&idx) {
                continue;
            }
            if aliases
                .iter()
                .any(|a| cell.contains(a.as_str()) || a.contains(cell.as_str()))
            {
                return Some(idx);
            }
        }

        None
    }
}

impl ColumnMapperTrait for ColumnMapper {
    fn map_columns(&self, header: &[String]) -> ImportResult<(ColumnMapping, Vec<ImportIssue>)> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();

        let mut claimed: HashSet<usize> = HashSet::new();
        let mut date = None;
        let mut driver = None;
        let mut vehicle = None;
        let mut notes = None;
        let mut providers = Vec::new();
        let mut warnings = Vec::new();

        for (field, aliases) in &self.fields {
            let column = self.find_column(&normalized, aliases, &claimed);

            if let Some(idx) = column {
                claimed.insert(idx);
                debug!(field = %field, column = idx, header = %header[idx], "列匹配成功");
            }

            match field {
                CanonicalField::Date => date = column,
                CanonicalField::Driver => {
                    driver = column;
                    if column.is_none() {
                        warnings.push(ImportIssue::warning(
                            0,
                            Some("DRIVER".to_string()),
                            format!(
                                "no column matched field DRIVER; rows will use placeholder \"{UNKNOWN_DRIVER}\""
                            ),
                        ));
                    }
                }
                CanonicalField::Vehicle => {
                    vehicle = column;
                    if column.is_none() {
                        warnings.push(ImportIssue::warning(
                            0,
                            Some("VEHICLE".to_string()),
                            format!(
                                "no column matched field VEHICLE; rows will use placeholder \"{UNKNOWN_VEHICLE}\""
                            ),
                        ));
                    }
                }
                CanonicalField::Provider(name) => match column {
                    Some(idx) => providers.push(ProviderColumn {
                        name: name.clone(),
                        column: idx,
                    }),
                    None => warnings.push(ImportIssue::warning(
                        0,
                        Some(name.clone()),
                        format!("no column matched provider {name}; earnings default to 0"),
                    )),
                },
                // 备注列缺失属常态，不告警
                CanonicalField::Notes => notes = column,
            }
        }

        let date = date.ok_or(ImportError::MissingRequiredColumn {
            field: "DATE".to_string(),
        })?;

        Ok((
            ColumnMapping {
                date,
                driver,
                vehicle,
                notes,
                providers,
            },
            warnings,
        ))
    }
}

/// 表头单元格归一化: 去空白、转小写、剥除首尾标点
fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

fn normalize_aliases(aliases: &[String]) -> Vec<String> {
    aliases.iter().map(|a| normalize_header(a)).collect()
}
