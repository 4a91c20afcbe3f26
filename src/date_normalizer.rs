use crate::error::Skip;
use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// 输出格式
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// 日期解析策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// 带时间的格式，只保留日期部分
    DateTime(&'static str),
    /// 纯日期格式
    Date(&'static str),
    /// 从文本中提取 "<日> <月份单词> <年>"
    MonthWord,
}

/// 按顺序尝试，第一个成功的结果生效
pub const STRATEGIES: &[DateStrategy] = &[
    DateStrategy::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    DateStrategy::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    DateStrategy::Date("%Y-%m-%d"),
    DateStrategy::Date("%d %B %Y"),
    DateStrategy::Date("%d %b %Y"),
    DateStrategy::Date("%d/%m/%Y"),
    DateStrategy::Date("%d-%m-%Y"),
    DateStrategy::MonthWord,
];

/// 英文与印尼文月份前三个字母
const MONTH_PREFIXES: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("mei", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("agu", 8),
    ("ags", 8),
    ("sep", 9),
    ("oct", 10),
    ("okt", 10),
    ("nov", 11),
    ("nop", 11),
    ("dec", 12),
    ("des", 12),
];

impl DateStrategy {
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        match self {
            DateStrategy::DateTime(format) => NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|dt| dt.date()),
            DateStrategy::Date(format) => NaiveDate::parse_from_str(text, format).ok(),
            DateStrategy::MonthWord => parse_month_word(text),
        }
    }
}

/// 将单元格转换为 YYYY-MM-DD
///
/// 原生日期直接格式化；其余类型先转成文本再依次尝试 [`STRATEGIES`]。
pub fn normalize_cell(cell: &Data) -> Result<String, Skip> {
    match cell {
        Data::Empty | Data::Error(_) => Err(Skip::Blank),
        // 时长或纯时间不是日期
        Data::DateTime(dt) if dt.is_duration() => Err(Skip::Unparseable(dt.as_f64().to_string())),
        // as_datetime 会处理 1904 日期系统与 1900 闰年问题，时间部分舍去
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|datetime| format_date(datetime.date()))
            .ok_or_else(|| Skip::Unparseable(dt.as_f64().to_string())),
        other => normalize_text(&other.to_string()),
    }
}

/// 标准化日期文本为 YYYY-MM-DD
pub fn normalize_text(raw: &str) -> Result<String, Skip> {
    let text = raw.trim();
    if is_blank(text) {
        return Err(Skip::Blank);
    }

    STRATEGIES
        .iter()
        .find_map(|strategy| strategy.parse(text))
        .map(format_date)
        .ok_or_else(|| Skip::Unparseable(text.to_string()))
}

/// 空字符串、nan、none 视为空值
pub fn is_blank(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case("nan") || text.eq_ignore_ascii_case("none")
}

fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

fn month_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{1,2})\s+([a-zA-Z]+)\s+(\d{4})").expect("month-word pattern is valid")
    })
}

fn month_from_word(word: &str) -> Option<u32> {
    let lower = word.to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    MONTH_PREFIXES
        .iter()
        .find(|(key, _)| *key == prefix)
        .map(|(_, month)| *month)
}

fn parse_month_word(text: &str) -> Option<NaiveDate> {
    let caps = month_word_pattern().captures(text)?;
    let day = caps[1].parse::<u32>().ok()?;
    let month = month_from_word(&caps[2])?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
