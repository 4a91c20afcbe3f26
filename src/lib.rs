pub mod data_processor;
pub mod date_normalizer;
pub mod error;
pub mod excel_parser;
pub mod models;
pub mod reporter;

use anyhow::{Context, Result};
use calamine::Sheets;
use data_processor::{fold_sheet, merge_records, Precedence, TalisMapBuilder};
use error::SyncError;
use excel_parser::{locate_columns, open_workbook, read_sheet, ResolvedSheet};
use models::{AppConfig, MergeSummary, SheetSource};
use reporter::Reporter;
use serde_json::Value;
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("talis-sync")
        .join(CONFIG_FILE)
}

/// 加载配置，没有配置文件时使用默认值
pub fn load_config() -> AppConfig {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> AppConfig {
    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => return config,
                Err(e) => warn!("配置文件 {:?} 格式错误，使用默认配置: {}", config_path, e),
            },
            Err(e) => warn!("无法读取配置文件 {:?}: {}", config_path, e),
        }
    }
    AppConfig::default()
}

/// 按配置执行一次同步，报告输出到标准输出
pub fn run() -> Result<MergeSummary> {
    let config = load_config();
    info!(
        "工作簿: {:?}, 数据文件: {:?}",
        config.excel_file, config.json_file
    );
    let mut reporter = Reporter::stdout();
    sync_talis_dates(&config, &mut reporter)
}

/// 从工作簿读取 Talis 安装日期并写回 JSON 文件
pub fn sync_talis_dates<W: Write>(
    config: &AppConfig,
    reporter: &mut Reporter<W>,
) -> Result<MergeSummary> {
    let mut workbook = open_workbook(&config.excel_file)?;
    sync_from_workbook(&mut workbook, config, reporter)
}

/// 同步流程: 定位列 -> 构建映射 -> 合并记录 -> 写回文件
///
/// JSON 文件只在全部合并完成后写入一次；找不到所需列时不会触碰该文件。
pub fn sync_from_workbook<RS: Read + Seek, W: Write>(
    workbook: &mut Sheets<RS>,
    config: &AppConfig,
    reporter: &mut Reporter<W>,
) -> Result<MergeSummary> {
    // 1. 定位主工作表
    let primary = locate_primary_sheet(workbook, config, reporter)?;
    reporter.using_sheet(&primary.table, &primary.roles);

    // 2. 构建映射，主工作表优先
    let mut builder = TalisMapBuilder::new();
    let stats = fold_sheet(&mut builder, &primary, Precedence::Overwrite);
    info!(
        "{}: 新增 {} 条, 跳过 {} 行",
        primary.table.name, stats.inserted, stats.skipped
    );
    reporter.mapping_samples(builder.samples());
    reporter.mapping_total(&primary.table.name, builder.len());

    for source in &config.fallback_sheets {
        if source.name == primary.table.name {
            continue;
        }
        if let Some(sheet) = resolve_secondary(workbook, source, reporter) {
            let stats = fold_sheet(&mut builder, &sheet, Precedence::KeepExisting);
            info!(
                "{}: 新增 {} 条, 跳过 {} 行",
                source.name, stats.inserted, stats.skipped
            );
        }
        reporter.mapping_total(&source.name, builder.len());
    }

    let lookup = builder.freeze();

    // 3. 合并到 JSON 记录
    let content = fs::read_to_string(&config.json_file)
        .with_context(|| format!("无法读取数据文件: {:?}", config.json_file))?;
    let mut data: Value = serde_json::from_str(&content)
        .with_context(|| format!("无法解析数据文件: {:?}", config.json_file))?;
    let records = data
        .as_array_mut()
        .ok_or_else(|| SyncError::InvalidDataset("顶层必须是数组".to_string()))?;

    let outcome = merge_records(
        records,
        &lookup,
        &config.site_name_field,
        &config.date_field,
    );
    let summary = MergeSummary {
        mappings: lookup.len(),
        updated: outcome.updated,
        unmatched: outcome.unmatched,
    };
    reporter.merge_result(&summary);

    // 4. 写回
    let output = serde_json::to_string_pretty(&data).context("序列化数据失败")?;
    fs::write(&config.json_file, output)
        .with_context(|| format!("保存数据文件失败: {:?}", config.json_file))?;
    reporter.written(&config.json_file);

    Ok(summary)
}

/// 依次尝试主工作表和备用工作表，返回第一张两种列都能识别的表
fn locate_primary_sheet<RS: Read + Seek, W: Write>(
    workbook: &mut Sheets<RS>,
    config: &AppConfig,
    reporter: &mut Reporter<W>,
) -> Result<ResolvedSheet> {
    let candidates = config.candidate_sheets();

    for source in &candidates {
        match read_sheet(workbook, source) {
            Ok(table) => {
                let roles = locate_columns(&table.headers);
                reporter.sheet_columns(&table, roles.as_ref());
                if let Some(roles) = roles {
                    return Ok(ResolvedSheet { table, roles });
                }
            }
            Err(e) => {
                warn!("{:#}", e);
                reporter.sheet_unavailable(&source.name, &e);
            }
        }
    }

    reporter.columns_missing();
    Err(SyncError::ColumnsNotFound {
        sheets: candidates.iter().map(|s| s.name.clone()).collect(),
    }
    .into())
}

/// 备用工作表读取失败或缺列时不提供数据
fn resolve_secondary<RS: Read + Seek, W: Write>(
    workbook: &mut Sheets<RS>,
    source: &SheetSource,
    reporter: &mut Reporter<W>,
) -> Option<ResolvedSheet> {
    let table = match read_sheet(workbook, source) {
        Ok(table) => table,
        Err(e) => {
            warn!("跳过工作表 {}: {:#}", source.name, e);
            return None;
        }
    };

    let roles = locate_columns(&table.headers);
    reporter.sheet_columns(&table, roles.as_ref());
    match roles {
        Some(roles) => Some(ResolvedSheet { table, roles }),
        None => {
            warn!("跳过工作表 {}: 找不到所需的列", source.name);
            None
        }
    }
}
