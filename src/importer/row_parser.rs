// ==========================================
// 车队收益台账系统 - 行解析器实现
// ==========================================
// 职责: 阶段 PARSING - 单个数据行 → 已校验 RowRecord
// 策略: 宁可带占位值收录，不静默丢行；仅日期失败才整行排除
// ==========================================

use crate::config::session::SessionConfig;
use crate::domain::ledger::{ColumnMapping, ImportIssue, RowRecord};
use crate::importer::date_parser::DateParser;
use crate::importer::import_pipeline_trait::RowParser as RowParserTrait;
use std::collections::BTreeMap;

/// 司机列缺失/空白时的占位名
pub const UNKNOWN_DRIVER: &str = "Unknown Driver";
/// 车辆列缺失/空白时的占位名
pub const UNKNOWN_VEHICLE: &str = "Unknown Vehicle";

pub struct RowParser {
    date_parser: DateParser,
    provider_names: Vec<String>,
}

impl RowParser {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            date_parser: DateParser::new(config.date_order),
            provider_names: config.provider_names(),
        }
    }

    /// 提取单元格（列未映射、行过短、空白均视为缺失）
    fn cell<'a>(raw: &'a [String], column: Option<usize>) -> Option<&'a str> {
        let value = raw.get(column?)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

impl RowParserTrait for RowParser {
    fn parse_row(
        &self,
        raw: &[String],
        mapping: &ColumnMapping,
        row_number: usize,
    ) -> Result<(RowRecord, Vec<ImportIssue>), ImportIssue> {
        // 日期为必填: 解析失败整行排除，解析就此停止
        let raw_date = Self::cell(raw, Some(mapping.date)).unwrap_or("");
        let date = self.date_parser.parse(raw_date, row_number)?;

        let mut warnings = Vec::new();

        let driver_name = match Self::cell(raw, mapping.driver) {
            Some(name) => name.to_string(),
            None => {
                warnings.push(ImportIssue::warning(
                    row_number,
                    Some("DRIVER".to_string()),
                    format!("missing driver name, substituted placeholder \"{UNKNOWN_DRIVER}\""),
                ));
                UNKNOWN_DRIVER.to_string()
            }
        };

        let vehicle_name = match Self::cell(raw, mapping.vehicle) {
            Some(name) => name.to_string(),
            None => {
                warnings.push(ImportIssue::warning(
                    row_number,
                    Some("VEHICLE".to_string()),
                    format!("missing vehicle name, substituted placeholder \"{UNKNOWN_VEHICLE}\""),
                ));
                UNKNOWN_VEHICLE.to_string()
            }
        };

        // 未匹配到列的平台全部默认 0.0
        let mut earnings: BTreeMap<String, f64> = self
            .provider_names
            .iter()
            .map(|name| (name.clone(), 0.0))
            .collect();

        for provider in &mapping.providers {
            // 空白单元格静默记 0: 某平台当日无收益是常态，不是异常
            let Some(raw_amount) = Self::cell(raw, Some(provider.column)) else {
                continue;
            };

            let amount = match raw_amount.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v,
                Ok(v) if v < 0.0 => {
                    warnings.push(ImportIssue::warning(
                        row_number,
                        Some(provider.name.clone()),
                        format!(
                            "negative earnings for {}: {raw_amount}, defaulted to 0",
                            provider.name
                        ),
                    ));
                    0.0
                }
                _ => {
                    warnings.push(ImportIssue::warning(
                        row_number,
                        Some(provider.name.clone()),
                        format!(
                            "invalid earnings for {}: \"{raw_amount}\", defaulted to 0",
                            provider.name
                        ),
                    ));
                    0.0
                }
            };

            earnings.insert(provider.name.clone(), amount);
        }

        let notes = Self::cell(raw, mapping.notes).unwrap_or("").to_string();

        Ok((
            RowRecord {
                row_number,
                date,
                driver_name,
                vehicle_name,
                earnings,
                notes,
            },
            warnings,
        ))
    }
}
