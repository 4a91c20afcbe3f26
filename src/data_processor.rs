use crate::date_normalizer::normalize_cell;
use crate::excel_parser::ResolvedSheet;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// 报告中展示的映射条数
pub const SAMPLE_LIMIT: usize = 10;

/// 写入冲突时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// 主工作表：直接覆盖
    Overwrite,
    /// 备用工作表：已有的站点保持不变
    KeepExisting,
}

/// 站点名称标准化：去空白、转小写
pub fn normalize_site_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 下划线和空格统一为连字符，用于模糊匹配
pub fn fuzzy_key(name: &str) -> String {
    name.replace(['_', ' '], "-")
}

/// 构建中的 站点 -> 日期 映射
#[derive(Debug, Default)]
pub struct TalisMapBuilder {
    entries: BTreeMap<String, String>,
    /// 站点首次插入的顺序
    order: Vec<String>,
    samples: Vec<(String, String)>,
}

impl TalisMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 最先插入的若干条映射
    pub fn samples(&self) -> &[(String, String)] {
        &self.samples
    }

    /// 插入或覆盖，返回是否为新站点
    pub fn insert(&mut self, name: &str, date: String) -> bool {
        let key = normalize_site_name(name);
        let is_new = !self.entries.contains_key(&key);
        if is_new {
            if self.samples.len() < SAMPLE_LIMIT {
                self.samples.push((key.clone(), date.clone()));
            }
            self.order.push(key.clone());
        }
        self.entries.insert(key, date);
        is_new
    }

    /// 仅在站点不存在时插入
    pub fn insert_if_absent(&mut self, name: &str, date: String) -> bool {
        if self.entries.contains_key(&normalize_site_name(name)) {
            return false;
        }
        self.insert(name, date)
    }

    pub fn freeze(self) -> TalisLookup {
        TalisLookup::new(self.entries, &self.order)
    }
}

/// 只读的查找表
#[derive(Debug, Clone)]
pub struct TalisLookup {
    entries: BTreeMap<String, String>,
    fuzzy: HashMap<String, String>,
}

impl TalisLookup {
    fn new(entries: BTreeMap<String, String>, order: &[String]) -> Self {
        let mut fuzzy = HashMap::new();
        // 多个站点模糊后相同时，取最先插入的站点
        for key in order {
            fuzzy.entry(fuzzy_key(key)).or_insert_with(|| key.clone());
        }
        Self { entries, fuzzy }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 先精确匹配，再按连字符模糊匹配
    pub fn find(&self, site_name: &str) -> Option<&str> {
        let key = normalize_site_name(site_name);
        if let Some(date) = self.entries.get(&key) {
            return Some(date);
        }
        self.fuzzy
            .get(&fuzzy_key(&key))
            .and_then(|original| self.entries.get(original))
            .map(String::as_str)
    }
}

/// 单张工作表的处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetStats {
    pub inserted: usize,
    pub skipped: usize,
}

/// 将一张工作表的 站点/日期 写入映射
pub fn fold_sheet(
    builder: &mut TalisMapBuilder,
    sheet: &ResolvedSheet,
    precedence: Precedence,
) -> SheetStats {
    let mut stats = SheetStats::default();

    for (row, name, cell) in sheet.table.site_rows(&sheet.roles) {
        let parsed = name.and_then(|name| normalize_cell(cell).map(|date| (name, date)));
        let (name, date) = match parsed {
            Ok(pair) => pair,
            Err(reason) => {
                debug!("{} 第 {} 行跳过: {}", sheet.table.name, row + 1, reason);
                stats.skipped += 1;
                continue;
            }
        };

        let inserted = match precedence {
            Precedence::Overwrite => {
                builder.insert(&name, date);
                true
            }
            Precedence::KeepExisting => builder.insert_if_absent(&name, date),
        };
        if inserted {
            stats.inserted += 1;
        }
    }

    stats
}

/// 合并结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub updated: usize,
    pub unmatched: Vec<String>,
}

/// 将查找表中的日期写入 JSON 记录
pub fn merge_records(
    records: &mut [Value],
    lookup: &TalisLookup,
    name_field: &str,
    date_field: &str,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (idx, record) in records.iter_mut().enumerate() {
        let Some(object) = record.as_object_mut() else {
            warn!("第 {} 条记录不是对象，已跳过", idx);
            continue;
        };

        let site_name = normalize_site_name(
            object
                .get(name_field)
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );

        match lookup.find(&site_name) {
            Some(date) => {
                object.insert(date_field.to_string(), Value::String(date.to_string()));
                outcome.updated += 1;
            }
            None => outcome.unmatched.push(site_name),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel_parser::{locate_columns, SheetTable};
    use calamine::Data;
    use serde_json::json;

    fn sheet(name: &str, rows: Vec<(Data, Data)>) -> ResolvedSheet {
        let headers = vec!["Nama Site".to_string(), "Done Instal Talis".to_string()];
        let roles = locate_columns(&headers).unwrap();
        let table = SheetTable {
            name: name.to_string(),
            header_row: 1,
            first_column: 0,
            headers,
            rows: rows.into_iter().map(|(a, b)| vec![a, b]).collect(),
        };
        ResolvedSheet { table, roles }
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_primary_sheet_wins() {
        let primary = sheet("SLA", vec![(text("Site-A"), text("06/10/2025"))]);
        let secondary = sheet(
            "Talis Full",
            vec![
                (text("site-a "), text("01/01/2024")),
                (text("site-b"), text("2 Jan 2024")),
            ],
        );

        let mut builder = TalisMapBuilder::new();
        let stats = fold_sheet(&mut builder, &primary, Precedence::Overwrite);
        assert_eq!(stats.inserted, 1);
        let stats = fold_sheet(&mut builder, &secondary, Precedence::KeepExisting);
        assert_eq!(stats, SheetStats { inserted: 1, skipped: 0 });

        let lookup = builder.freeze();
        assert_eq!(lookup.find("site-a"), Some("2025-10-06"));
        assert_eq!(lookup.find("SITE-B"), Some("2024-01-02"));
    }

    #[test]
    fn test_earlier_secondary_wins() {
        let mut builder = TalisMapBuilder::new();
        let full = sheet("Talis Full", vec![(text("x"), text("2024-03-01"))]);
        let mix = sheet("Talis Mix", vec![(text("X"), text("2024-04-01"))]);
        fold_sheet(&mut builder, &full, Precedence::KeepExisting);
        fold_sheet(&mut builder, &mix, Precedence::KeepExisting);
        assert_eq!(builder.freeze().find("x"), Some("2024-03-01"));
    }

    #[test]
    fn test_primary_later_row_overwrites() {
        let primary = sheet(
            "SLA",
            vec![
                (text("site-a"), text("2024-01-01")),
                (text("Site-A"), text("2024-02-01")),
            ],
        );
        let mut builder = TalisMapBuilder::new();
        fold_sheet(&mut builder, &primary, Precedence::Overwrite);
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.freeze().find("site-a"), Some("2024-02-01"));
    }

    #[test]
    fn test_unusable_rows_are_skipped() {
        let primary = sheet(
            "SLA",
            vec![
                (Data::Empty, text("2024-01-01")),
                (text("   "), text("2024-01-01")),
                (text("site-c"), text("nan")),
                (text("site-d"), text("belum")),
                (text("site-e"), text("6 sept 2025")),
            ],
        );
        let mut builder = TalisMapBuilder::new();
        let stats = fold_sheet(&mut builder, &primary, Precedence::Overwrite);
        assert_eq!(stats, SheetStats { inserted: 1, skipped: 4 });
        assert_eq!(builder.samples(), &[("site-e".to_string(), "2025-09-06".to_string())]);
    }

    #[test]
    fn test_samples_are_capped() {
        let mut builder = TalisMapBuilder::new();
        for i in 0..15 {
            builder.insert(&format!("site-{i:02}"), "2024-01-01".to_string());
        }
        assert_eq!(builder.len(), 15);
        assert_eq!(builder.samples().len(), SAMPLE_LIMIT);
        assert_eq!(builder.samples()[0].0, "site-00");
    }

    #[test]
    fn test_fuzzy_match() {
        let mut builder = TalisMapBuilder::new();
        builder.insert("site-alpha-1", "2025-01-15".to_string());
        builder.insert("BDG Tower 2", "2025-02-01".to_string());
        let lookup = builder.freeze();

        assert_eq!(lookup.find("Site_Alpha-1"), Some("2025-01-15"));
        assert_eq!(lookup.find("bdg_tower_2"), Some("2025-02-01"));
        assert_eq!(lookup.find("site alpha 2"), None);
    }

    #[test]
    fn test_fuzzy_tie_break_prefers_first_inserted() {
        let mut builder = TalisMapBuilder::new();
        builder.insert("site_a", "2025-01-02".to_string());
        builder.insert("site a", "2025-01-01".to_string());
        // 覆盖不改变插入顺序
        builder.insert("site_a", "2025-01-03".to_string());
        let lookup = builder.freeze();
        assert_eq!(lookup.find("site-a"), Some("2025-01-03"));
        assert_eq!(lookup.find("site a"), Some("2025-01-01"));
    }

    #[test]
    fn test_fuzzy_tie_break_primary_sheet_first() {
        let primary = sheet("SLA", vec![(text("Site_B"), text("2025-02-01"))]);
        let secondary = sheet("Talis Full", vec![(text("site b"), text("2025-03-01"))]);
        let mut builder = TalisMapBuilder::new();
        fold_sheet(&mut builder, &primary, Precedence::Overwrite);
        fold_sheet(&mut builder, &secondary, Precedence::KeepExisting);
        // "site b" 字典序更小，但主工作表的 "site_b" 先插入
        assert_eq!(builder.freeze().find("site-b"), Some("2025-02-01"));
    }

    #[test]
    fn test_merge_records() {
        let mut builder = TalisMapBuilder::new();
        builder.insert("site-alpha-1", "2025-01-15".to_string());
        builder.insert("jkt-001", "2024-12-12".to_string());
        let lookup = builder.freeze();

        let mut records = vec![
            json!({ "site_name": "Site_Alpha-1", "region": "Jawa" }),
            json!({ "site_name": " JKT-001 ", "talis_installed": "2020-01-01" }),
            json!({ "site_name": "Unknown Site", "talis_installed": "2023-05-05" }),
            json!({ "region": "Bali" }),
            json!("not an object"),
        ];

        let outcome = merge_records(&mut records, &lookup, "site_name", "talis_installed");
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.unmatched, vec!["unknown site".to_string(), String::new()]);

        assert_eq!(records[0]["talis_installed"], "2025-01-15");
        assert_eq!(records[1]["talis_installed"], "2024-12-12");
        assert_eq!(records[2]["talis_installed"], "2023-05-05");
        assert!(records[3].get("talis_installed").is_none());
        assert_eq!(records[4], json!("not an object"));
    }

    #[test]
    fn test_merge_preserves_field_order() {
        let mut builder = TalisMapBuilder::new();
        builder.insert("b", "2024-01-01".to_string());
        let lookup = builder.freeze();

        let mut records = vec![json!({ "z": 1, "site_name": "b", "a": 2 })];
        merge_records(&mut records, &lookup, "site_name", "talis_installed");
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "site_name", "a", "talis_installed"]);
    }
}
