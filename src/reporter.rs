use crate::excel_parser::SheetTable;
use crate::models::{ColumnRef, ColumnRoles, MergeSummary};
use std::io::{self, Stdout, Write};
use std::path::Path;

/// 报告中列出的未匹配站点数
pub const UNMATCHED_LIMIT: usize = 20;

/// 同步过程的文字报告，写入失败不影响同步
pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// 工作表的表头及识别结果
    pub fn sheet_columns(&mut self, table: &SheetTable, roles: Option<&ColumnRoles>) {
        let _ = writeln!(self.out, "工作表 {} 的列: {:?}", table.name, table.headers);
        match roles {
            Some(roles) => {
                let _ = writeln!(
                    self.out,
                    "  站点名称列: {}",
                    describe_column(table, &roles.site_name)
                );
                let _ = writeln!(
                    self.out,
                    "  Talis 安装日期列: {}",
                    describe_column(table, &roles.install_date)
                );
            }
            None => {
                let _ = writeln!(self.out, "  未找到站点名称列或 Talis 安装日期列");
            }
        }
    }

    pub fn sheet_unavailable(&mut self, sheet: &str, error: &anyhow::Error) {
        let _ = writeln!(self.out, "工作表 {} 不可用: {:#}", sheet, error);
    }

    pub fn using_sheet(&mut self, table: &SheetTable, roles: &ColumnRoles) {
        let _ = writeln!(
            self.out,
            "\n使用工作表 {}: {} -> {}",
            table.name,
            roles.site_name.header.replace('\n', " "),
            roles.install_date.header.replace('\n', " ")
        );
    }

    /// 最先创建的映射
    pub fn mapping_samples(&mut self, samples: &[(String, String)]) {
        for (site, date) in samples {
            let _ = writeln!(self.out, "  {} -> {}", site, date);
        }
    }

    /// 每个阶段后的映射总数
    pub fn mapping_total(&mut self, sheet: &str, total: usize) {
        let _ = writeln!(self.out, "处理 {} 后共 {} 条映射", sheet, total);
    }

    pub fn columns_missing(&mut self) {
        let _ = writeln!(self.out, "\n错误: 工作簿中找不到所需的列，请检查 Excel 文件结构");
    }

    pub fn merge_result(&mut self, summary: &MergeSummary) {
        let _ = writeln!(self.out, "\n已更新 {} 条记录", summary.updated);
        if summary.unmatched.is_empty() {
            return;
        }
        let shown: Vec<&String> = summary.unmatched.iter().take(UNMATCHED_LIMIT).collect();
        let _ = writeln!(
            self.out,
            "Excel 中未找到的站点 (前 {} 个): {:?}",
            UNMATCHED_LIMIT, shown
        );
        let _ = writeln!(self.out, "未找到总数: {}", summary.unmatched.len());
    }

    pub fn written(&mut self, path: &Path) {
        let _ = writeln!(self.out, "\n已写入 {}", path.display());
    }
}

/// 列字母加表头，例如 `C "Nama Site"`
fn describe_column(table: &SheetTable, column: &ColumnRef) -> String {
    format!(
        "{} {:?}",
        column_letter(table.first_column + column.index),
        column.header
    )
}

/// 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
