// ==========================================
// 车队收益台账系统 - 日期解析器实现
// ==========================================
// 职责: 单元格文本 → UTC 当日零点时刻
// 约定: 日期顺序（日先/月先）整个会话固定，绝不逐行推断
// 红线: 严格解析，无日历进位（2月30日、32日一律拒绝）
// ==========================================

use crate::domain::ledger::ImportIssue;
use crate::domain::types::DateOrder;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

// ==========================================
// DatePattern - 候选日期格式
// ==========================================
struct DatePattern {
    fmt: &'static str,
    two_digit_year: bool,
}

// 日先: 斜杠/横杠 × 两位/四位年份；chrono 对 %d/%m 同时接受一位和两位数字。
// 两位年份格式必须排在前面: %y 至多读两位，四位年份自然落空；
// 反过来 %Y 会把 "49" 当作公元 49 年吞掉。
const DAY_FIRST_PATTERNS: &[DatePattern] = &[
    DatePattern { fmt: "%d/%m/%y", two_digit_year: true },
    DatePattern { fmt: "%d-%m-%y", two_digit_year: true },
    DatePattern { fmt: "%d/%m/%Y", two_digit_year: false },
    DatePattern { fmt: "%d-%m-%Y", two_digit_year: false },
    // ISO 形式无歧义，作为兜底兼容
    DatePattern { fmt: "%Y-%m-%d", two_digit_year: false },
    DatePattern { fmt: "%Y/%m/%d", two_digit_year: false },
];

const MONTH_FIRST_PATTERNS: &[DatePattern] = &[
    DatePattern { fmt: "%m/%d/%y", two_digit_year: true },
    DatePattern { fmt: "%m-%d-%y", two_digit_year: true },
    DatePattern { fmt: "%m/%d/%Y", two_digit_year: false },
    DatePattern { fmt: "%m-%d-%Y", two_digit_year: false },
    DatePattern { fmt: "%Y-%m-%d", two_digit_year: false },
    DatePattern { fmt: "%Y/%m/%d", two_digit_year: false },
];

// ==========================================
// DateParser
// ==========================================
pub struct DateParser {
    patterns: &'static [DatePattern],
}

impl DateParser {
    pub fn new(date_order: DateOrder) -> Self {
        let patterns = match date_order {
            DateOrder::DayFirst => DAY_FIRST_PATTERNS,
            DateOrder::MonthFirst => MONTH_FIRST_PATTERNS,
        };
        Self { patterns }
    }

    /// 解析一个日期单元格
    ///
    /// # 参数
    /// - raw: 原始文本（调用方已 trim）
    /// - row_number: 数据行号（用于问题归因）
    ///
    /// # 返回
    /// - Ok(instant): 对应日历日的 UTC 零点（与设备时区无关，
    ///   下游按日聚合的口径要求）
    /// - Err(issue): 所有候选格式均失败，ERROR 级
    pub fn parse(&self, raw: &str, row_number: usize) -> Result<DateTime<Utc>, ImportIssue> {
        for pattern in self.patterns {
            if let Ok(date) = NaiveDate::parse_from_str(raw, pattern.fmt) {
                let date = if pattern.two_digit_year {
                    resolve_two_digit_year(date)
                } else {
                    date
                };
                // 首个解析成功的格式胜出
                let midnight = date.and_time(chrono::NaiveTime::MIN);
                return Ok(Utc.from_utc_datetime(&midnight));
            }
        }

        Err(ImportIssue::error(
            row_number,
            Some("DATE".to_string()),
            format!("unparseable date: {raw}"),
        ))
    }
}

/// 两位年份以 50 为轴: <50 → 2000 年代，≥50 → 1900 年代
///
/// chrono 的 %y 以 69 为轴（00-68 → 20xx），50-68 需回拨一个世纪
fn resolve_two_digit_year(date: NaiveDate) -> NaiveDate {
    if date.year() >= 2050 {
        // 2050-2068 回拨后仍是合法日期（闰年性质按 mod 4 不变）
        date.with_year(date.year() - 100).unwrap_or(date)
    } else {
        date
    }
}
