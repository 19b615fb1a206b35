//! 期货数据模型
//!
//! 定义从行情数据源获取的期货数据结构，包括：
//! - 品种映射信息
//! - 合约日线收盘价

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 期货品种映射信息
///
/// 用于将品种名称映射到新浪 API 的 node 参数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FuturesSymbolMark {
    /// 交易所名称（中文）
    pub exchange: String,
    /// 品种名称（如 PTA、铜）
    pub symbol: String,
    /// 新浪 API 的 node 参数（如 pta_qh、tong_qh）
    pub mark: String,
}

/// 合约单日收盘价
///
/// 日K线中期限结构只关心日期和收盘价，日期已去掉时分秒
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DailyClose {
    /// 交易日
    pub date: NaiveDate,
    /// 收盘价
    pub close: f64,
}

impl DailyClose {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}
