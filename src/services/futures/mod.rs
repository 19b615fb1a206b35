//! 期货数据服务
//!
//! 提供期货数据的获取和处理逻辑
//!
//! ## 数据来源
//! - 新浪财经：品种映射、合约列表、日K线数据
//!
//! ## 主要功能
//! - 品种名称/代码到新浪 node 的映射
//! - 品种下所有在市合约的查询
//! - 单个合约日线收盘价

mod common;
mod kline;
mod provider;
mod sina;

pub use common::{get_beijing_time, get_beijing_today};
pub use provider::MarketDataProvider;
pub use sina::SinaProvider;
