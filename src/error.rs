use thiserror::Error;

/// 终止整次同步的错误
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("在任何候选工作表中都找不到站点名称列和 Talis 安装日期列 (已尝试: {})", sheets.join(", "))]
    ColumnsNotFound { sheets: Vec<String> },

    #[error("无法打开工作簿: {path}")]
    OpenWorkbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("JSON 数据格式不正确: {0}")]
    InvalidDataset(String),
}

/// 单元格或行级别的跳过原因，不会中断同步
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// 空单元格、nan、none
    Blank,
    /// 无法识别的日期文本
    Unparseable(String),
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::Blank => write!(f, "空值"),
            Skip::Unparseable(text) => write!(f, "无法解析的日期: {}", text),
        }
    }
}
