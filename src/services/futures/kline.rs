//! 日K线数据相关函数

use anyhow::{anyhow, Result};
use reqwest::Client;
use url::Url;

use crate::models::DailyClose;

use super::common::{parse_trade_date, SINA_FUTURES_DAILY_API, SINA_REFERER, USER_AGENT};

/// 获取期货合约的全部日线收盘价
pub async fn get_futures_daily_closes(client: &Client, symbol: &str) -> Result<Vec<DailyClose>> {
    let full_url = Url::parse_with_params(SINA_FUTURES_DAILY_API, &[("symbol", symbol)])?;
    log::debug!("📡 请求日K线数据 URL: {}", full_url);

    let response = client
        .get(SINA_FUTURES_DAILY_API)
        .query(&[("symbol", symbol)])
        .header("Referer", SINA_REFERER)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("获取 {} 日K线失败: {}", symbol, response.status()));
    }

    let text = response.text().await?;
    parse_sina_daily_closes(&text, symbol)
}

/// 解析新浪期货日K线 JSONP 数据中的日期和收盘价
///
/// 数据行既可能是 `{"d": .., "c": ..}` 对象，也可能是 `[d, o, h, l, c, ...]` 数组；
/// 日期或收盘价无法解析的行会被跳过
fn parse_sina_daily_closes(data: &str, symbol: &str) -> Result<Vec<DailyClose>> {
    let (start, end) = match (data.find("(["), data.rfind("])")) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            // 没有交易记录的合约新浪返回 null
            if data.contains("(null)") {
                return Ok(Vec::new());
            }
            return Err(anyhow!("{} 日K线数据格式无效", symbol));
        }
    };

    let json_str = &data[start + 1..end + 1];
    let json_data: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| anyhow!("解析 {} 日K线JSON失败: {}", symbol, e))?;

    let arr = json_data
        .as_array()
        .ok_or_else(|| anyhow!("{} 日K线数据格式无效", symbol))?;

    let mut closes = Vec::with_capacity(arr.len());
    let mut skipped = 0usize;

    for item in arr {
        let (date, close) = if item.is_object() {
            (&item["d"], &item["c"])
        } else if let Some(fields) = item.as_array().filter(|f| f.len() >= 5) {
            (&fields[0], &fields[4])
        } else {
            skipped += 1;
            continue;
        };

        let date = date.as_str().and_then(parse_trade_date);
        let close = close
            .as_str()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .or_else(|| close.as_f64())
            .filter(|c| c.is_finite());

        match (date, close) {
            (Some(date), Some(close)) => closes.push(DailyClose::new(date, close)),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("{} 日K线跳过 {} 条无效记录", symbol, skipped);
    }
    log::debug!("📈 {} 解析到 {} 条日K线", symbol, closes.len());

    Ok(closes)
}
