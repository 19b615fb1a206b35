//! 行情数据源抽象
//!
//! 期限结构只依赖两类上游能力：按品种查询在市合约、按合约查询日线收盘价。
//! 新浪实现见 [`SinaProvider`](super::SinaProvider)，测试中可替换为内存数据源。

use anyhow::Result;
use async_trait::async_trait;

use crate::models::DailyClose;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 查询品种当前有报价的全部合约代码（可能包含连续合约）
    async fn lookup_symbols(&self, commodity: &str) -> Result<Vec<String>>;

    /// 查询合约的全部日线收盘价，由调用方按日期区间过滤
    async fn fetch_daily_history(&self, symbol: &str) -> Result<Vec<DailyClose>>;
}
