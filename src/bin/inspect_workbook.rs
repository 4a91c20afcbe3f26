// 调试工具 - 查看工作簿结构与列识别结果
use anyhow::Result;
use calamine::Reader;
use talis_sync_lib::date_normalizer::normalize_cell;
use talis_sync_lib::excel_parser::{locate_columns, open_workbook, read_sheet};
use talis_sync_lib::load_config;
use talis_sync_lib::reporter::column_letter;

/// 每张表预览的数据行数
const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    let config = load_config();
    let mut workbook = open_workbook(&config.excel_file)?;

    println!("工作表列表: {:?}", workbook.sheet_names());

    for source in config.candidate_sheets() {
        println!("\n== {} (表头在第 {} 行)", source.name, source.header_row + 1);

        let table = match read_sheet(&mut workbook, source) {
            Ok(table) => table,
            Err(e) => {
                println!("无法读取: {:#}", e);
                continue;
            }
        };

        for (idx, header) in table.headers.iter().enumerate() {
            println!(
                "  {}: {:?}",
                column_letter(table.first_column + idx),
                header
            );
        }

        let Some(roles) = locate_columns(&table.headers) else {
            println!("未找到站点名称列或 Talis 安装日期列");
            continue;
        };

        println!(
            "\n前 {} 行数据 ({} / {}):",
            PREVIEW_ROWS,
            column_letter(table.first_column + roles.site_name.index),
            column_letter(table.first_column + roles.install_date.index)
        );
        for (row, name, cell) in table.site_rows(&roles).take(PREVIEW_ROWS) {
            let name = name.unwrap_or_else(|skip| format!("<{}>", skip));
            let date = normalize_cell(cell).unwrap_or_else(|skip| format!("<{}>", skip));
            println!("  行 {}: {} | {:?} -> {}", row + 1, name, cell, date);
        }
    }

    Ok(())
}
