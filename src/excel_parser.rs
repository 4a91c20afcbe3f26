use crate::error::{Skip, SyncError};
use crate::models::{ColumnRef, ColumnRoles, SheetSource};
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// 列角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// 站点名称
    SiteName,
    /// Talis 安装完成日期
    InstallDate,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 2] = [ColumnRole::SiteName, ColumnRole::InstallDate];

    /// 判断已标准化的表头是否属于该角色
    pub fn matches(&self, header: &str) -> bool {
        match self {
            ColumnRole::SiteName => {
                header.contains("nama site") || (header.contains("site") && header.contains("name"))
            }
            ColumnRole::InstallDate => header.contains("done instal") && header.contains("talis"),
        }
    }
}

/// 表头转小写，换行与连续空白合并为单个空格
pub fn normalize_header(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 从表头中识别站点名称列和安装日期列
///
/// 同一角色匹配到多列时取最右边的一列；两种角色都找到才返回结果。
pub fn locate_columns<S: AsRef<str>>(headers: &[S]) -> Option<ColumnRoles> {
    let mut site_name = None;
    let mut install_date = None;

    for (index, header) in headers.iter().enumerate() {
        let header = header.as_ref();
        let normalized = normalize_header(header);
        for role in ColumnRole::ALL {
            if !role.matches(&normalized) {
                continue;
            }
            let column = ColumnRef {
                index,
                header: header.to_string(),
            };
            match role {
                ColumnRole::SiteName => site_name = Some(column),
                ColumnRole::InstallDate => install_date = Some(column),
            }
        }
    }

    Some(ColumnRoles {
        site_name: site_name?,
        install_date: install_date?,
    })
}

/// 一张工作表的表头与表头以下的数据行
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    /// 表头所在的物理行
    pub header_row: usize,
    /// 第一列的物理列号
    pub first_column: usize,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl SheetTable {
    /// calamine 的 Range 从第一个非空单元格开始，这里按物理行号定位表头
    pub fn from_range(source: &SheetSource, range: &Range<Data>) -> Self {
        let (start_row, start_col) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        let mut headers = Vec::new();
        let mut rows = Vec::new();

        if let Some(offset) = source.header_row.checked_sub(start_row) {
            let mut iter = range.rows().skip(offset);
            if let Some(header) = iter.next() {
                headers = header.iter().map(|c| c.to_string()).collect();
                rows = iter.map(|row| row.to_vec()).collect();
            }
        }

        Self {
            name: source.name.clone(),
            header_row: source.header_row,
            first_column: start_col,
            headers,
            rows,
        }
    }

    /// 逐行取出 (站点名称, 日期单元格)
    pub fn site_rows<'a>(
        &'a self,
        roles: &'a ColumnRoles,
    ) -> impl Iterator<Item = (usize, Result<String, Skip>, &'a Data)> + 'a {
        const EMPTY: &Data = &Data::Empty;
        self.rows.iter().enumerate().map(move |(idx, row)| {
            let physical_row = self.header_row + 1 + idx;
            let name = site_name_from_cell(row.get(roles.site_name.index).unwrap_or(EMPTY));
            let date = row.get(roles.install_date.index).unwrap_or(EMPTY);
            (physical_row, name, date)
        })
    }
}

/// 已识别出两种列的工作表
#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    pub table: SheetTable,
    pub roles: ColumnRoles,
}

/// 打开工作簿
pub fn open_workbook(path: &Path) -> Result<Sheets<BufReader<File>>> {
    let workbook = open_workbook_auto(path).map_err(|source| SyncError::OpenWorkbook {
        path: path.display().to_string(),
        source,
    })?;
    Ok(workbook)
}

/// 读取一张工作表
pub fn read_sheet<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    source: &SheetSource,
) -> Result<SheetTable> {
    let range = workbook
        .worksheet_range(&source.name)
        .with_context(|| format!("无法读取工作表: {}", source.name))?;

    Ok(SheetTable::from_range(source, &range))
}

fn site_name_from_cell(cell: &Data) -> Result<String, Skip> {
    match cell {
        Data::Empty | Data::Error(_) => Err(Skip::Blank),
        other => {
            let name = other.to_string().trim().to_string();
            if name.is_empty() {
                Err(Skip::Blank)
            } else {
                Ok(name)
            }
        }
    }
}
