use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 候选工作表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSource {
    /// 工作表名称
    pub name: String,
    /// 表头所在的物理行 (从 0 开始)
    pub header_row: usize,
}

impl SheetSource {
    pub fn new(name: &str, header_row: usize) -> Self {
        Self {
            name: name.to_string(),
            header_row,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SLA 报表工作簿
    pub excel_file: PathBuf,
    /// 站点 JSON 数据 (读取后原地覆盖)
    pub json_file: PathBuf,
    /// 主工作表
    pub primary_sheet: SheetSource,
    /// 备用工作表，按顺序尝试
    pub fallback_sheets: Vec<SheetSource>,
    /// 记录中的站点名称字段
    pub site_name_field: String,
    /// 写入日期的目标字段
    pub date_field: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            excel_file: PathBuf::from("SLA DES 2025.xlsx"),
            json_file: PathBuf::from("newDatas.json"),
            primary_sheet: SheetSource::new("SLA", 2),
            fallback_sheets: vec![
                SheetSource::new("Talis Full", 1),
                SheetSource::new("Talis Mix", 1),
            ],
            site_name_field: "site_name".to_string(),
            date_field: "talis_installed".to_string(),
        }
    }
}

impl AppConfig {
    /// 主工作表在前，备用工作表在后
    pub fn candidate_sheets(&self) -> Vec<&SheetSource> {
        std::iter::once(&self.primary_sheet)
            .chain(self.fallback_sheets.iter())
            .collect()
    }
}

/// 已识别的列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// 在表格行内的列序号
    pub index: usize,
    /// 原始表头文本
    pub header: String,
}

/// 一张工作表中两种列角色的识别结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub site_name: ColumnRef,
    pub install_date: ColumnRef,
}

/// 同步结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSummary {
    /// 映射表条目数
    pub mappings: usize,
    /// 已更新的记录数
    pub updated: usize,
    /// 未匹配的站点名称 (小写)
    pub unmatched: Vec<String>,
}
