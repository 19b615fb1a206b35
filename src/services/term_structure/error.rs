//! 期限结构错误分类

use chrono::NaiveDate;
use thiserror::Error;

/// 导致整次期限结构请求失败的错误
///
/// 单个合约日K线拉取失败不在此列，见 [`SymbolFetchFailure`](crate::models::SymbolFetchFailure)
#[derive(Debug, Error)]
pub enum TermStructureError {
    #[error("获取品种 {commodity} 合约列表失败: {reason}")]
    DataUnavailable { commodity: String, reason: String },

    #[error("品种 {commodity} 没有可用的非连续合约")]
    NoActiveContracts { commodity: String },

    #[error("品种 {commodity} 在 {start} 至 {end} 期间没有可绘制的行情数据")]
    EmptyResult {
        commodity: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("绘制品种 {commodity} 期限结构图失败: {reason}")]
    Render { commodity: String, reason: String },
}

impl TermStructureError {
    pub fn commodity(&self) -> &str {
        match self {
            TermStructureError::DataUnavailable { commodity, .. }
            | TermStructureError::NoActiveContracts { commodity }
            | TermStructureError::EmptyResult { commodity, .. }
            | TermStructureError::Render { commodity, .. } => commodity,
        }
    }
}
