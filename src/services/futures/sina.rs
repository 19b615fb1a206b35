//! 新浪期货数据源
//!
//! 封装品种映射、合约列表和日K线的获取逻辑

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::models::{DailyClose, FuturesSymbolMark};

use super::common::{
    chinese_to_english, english_to_code, SINA_FUTURES_LIST_API, SINA_FUTURES_SYMBOL_URL,
    USER_AGENT,
};
use super::kline::get_futures_daily_closes;
use super::provider::MarketDataProvider;

/// 新浪品种映射中覆盖的交易所
const SINA_EXCHANGES: [(&str, &str); 5] = [
    ("czce", "郑州商品交易所"),
    ("dce", "大连商品交易所"),
    ("shfe", "上海期货交易所"),
    ("cffex", "中国金融期货交易所"),
    ("gfex", "广州期货交易所"),
];

/// 用户输入中可能带有的交易所前缀
const EXCHANGE_PREFIXES: [&str; 6] = ["SHFE", "DCE", "CZCE", "INE", "CFFEX", "GFEX"];

/// 新浪期货数据源
///
/// ## 功能
/// - 品种映射：获取期货品种名称和新浪 node 的映射关系
/// - 合约列表：获取品种下所有在市合约代码
/// - 日K线：获取单个合约的日线收盘价
pub struct SinaProvider {
    /// HTTP 客户端
    client: Client,
}

impl SinaProvider {
    /// 创建新的数据源实例
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// 使用已配置超时的客户端创建实例
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // ==================== 品种映射相关 ====================

    /// 获取期货品种和代码映射表
    pub async fn get_symbol_mark(&self) -> Result<Vec<FuturesSymbolMark>> {
        log::info!("📡 请求品种映射数据 URL: {}", SINA_FUTURES_SYMBOL_URL);

        let response = self
            .client
            .get(SINA_FUTURES_SYMBOL_URL)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("获取品种映射失败: {}", response.status()));
        }

        let bytes = response.bytes().await?;
        let text = encoding_rs::GBK.decode(&bytes).0.to_string();

        parse_symbol_mark_js(&text)
    }

    /// 根据品种名称或代码获取对应的node参数
    pub async fn get_symbol_node(&self, commodity: &str) -> Result<String> {
        let marks = self.get_symbol_mark().await?;

        resolve_symbol_node(&marks, commodity)
            .map(|mark| mark.mark.clone())
            .ok_or_else(|| {
                anyhow!(
                    "未找到品种 {} 的映射，请使用 /futures/symbols 查看可用品种",
                    commodity
                )
            })
    }

    // ==================== 合约列表相关 ====================

    /// 通过node参数获取该品种下所有合约代码
    pub async fn get_node_symbols(&self, node: &str) -> Result<Vec<String>> {
        let query = [
            ("page", "1"),
            ("sort", "position"),
            ("asc", "0"),
            ("node", node),
            ("base", "futures"),
        ];
        let full_url = Url::parse_with_params(SINA_FUTURES_LIST_API, &query)?;
        log::info!("📡 请求期货列表 URL: {}", full_url);

        let response = self
            .client
            .get(SINA_FUTURES_LIST_API)
            .query(&query)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("获取期货列表失败: {}", response.status()));
        }

        let text = response.text().await?;
        let preview: String = text.chars().take(300).collect();
        log::debug!("📥 原始响应数据: {}", preview);

        parse_node_symbols(&text)
    }
}

impl Default for SinaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for SinaProvider {
    async fn lookup_symbols(&self, commodity: &str) -> Result<Vec<String>> {
        let node = self.get_symbol_node(commodity).await?;
        log::info!("品种 {} 对应 node: {}", commodity, node);

        self.get_node_symbols(&node)
            .await
            .with_context(|| format!("获取品种 {} 合约列表失败", commodity))
    }

    async fn fetch_daily_history(&self, symbol: &str) -> Result<Vec<DailyClose>> {
        get_futures_daily_closes(&self.client, symbol).await
    }
}

/// 解析新浪 JS 文件中的品种映射数据
fn parse_symbol_mark_js(js_text: &str) -> Result<Vec<FuturesSymbolMark>> {
    let mut symbols = Vec::new();

    let start = js_text
        .find("ARRFUTURESNODES = {")
        .ok_or_else(|| anyhow!("无法解析品种映射JS数据"))?;
    let end = js_text[start..]
        .find("};")
        .map(|pos| start + pos)
        .ok_or_else(|| anyhow!("无法解析品种映射JS数据"))?;

    let content = &js_text[start..end + 2];
    let item_re = Regex::new(r"\['([^']+)',\s*'([^']+)',\s*'[^']*'")?;

    for (exchange_code, exchange_name) in SINA_EXCHANGES {
        let section_re = Regex::new(&format!(r"{}\s*:\s*\[", exchange_code))?;

        let Some(m) = section_re.find(content) else {
            continue;
        };

        // 每个交易所的条目截止到下一个交易所段落
        let remaining = &content[m.end()..];
        let section_end = SINA_EXCHANGES
            .iter()
            .filter_map(|(code, _)| {
                Regex::new(&format!(r"\b{}\s*:\s*\[", code))
                    .ok()
                    .and_then(|re| re.find(remaining))
                    .map(|next| next.start())
            })
            .min()
            .unwrap_or(remaining.len());

        for cap in item_re.captures_iter(&remaining[..section_end]) {
            let symbol_name = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let mark = cap.get(2).map(|m| m.as_str()).unwrap_or("");

            if !symbol_name.is_empty() && mark.ends_with("_qh") {
                symbols.push(FuturesSymbolMark {
                    exchange: exchange_name.to_string(),
                    symbol: symbol_name.to_string(),
                    mark: mark.to_string(),
                });
            }
        }
    }

    log::debug!("📊 解析到 {} 个品种映射", symbols.len());
    Ok(symbols)
}

/// 在品种映射中查找用户输入对应的品种
///
/// 匹配顺序：名称完全相同 → 名称包含输入 → 品种代码（CU、SHFE Copper） → 输入包含名称
fn resolve_symbol_node<'a>(
    marks: &'a [FuturesSymbolMark],
    commodity: &str,
) -> Option<&'a FuturesSymbolMark> {
    let commodity = commodity.trim();
    if commodity.is_empty() {
        return None;
    }

    if let Some(mark) = marks.iter().find(|m| m.symbol == commodity) {
        return Some(mark);
    }

    if let Some(mark) = marks.iter().find(|m| m.symbol.contains(commodity)) {
        return Some(mark);
    }

    if let Some(code) = commodity_code(commodity) {
        if let Some(mark) = marks
            .iter()
            .find(|m| chinese_to_english(&m.symbol) == Some(code.as_str()))
        {
            return Some(mark);
        }
    }

    marks
        .iter()
        .filter(|m| commodity.contains(m.symbol.as_str()))
        .max_by_key(|m| m.symbol.chars().count())
}

/// 将英文输入归一化为品种代码，如 "SHFE Copper" → "CU"、"cu" → "CU"
fn commodity_code(commodity: &str) -> Option<String> {
    let words: Vec<&str> = commodity
        .split_whitespace()
        .filter(|w| !EXCHANGE_PREFIXES.contains(&w.to_uppercase().as_str()))
        .collect();

    if words.is_empty() || !words.iter().all(|w| w.is_ascii()) {
        return None;
    }

    let joined = words.join(" ");
    if let Some(code) = english_to_code(&joined) {
        return Some(code.to_string());
    }

    if words.len() == 1 && words[0].chars().all(|c| c.is_ascii_alphabetic()) && words[0].len() <= 2
    {
        return Some(words[0].to_uppercase());
    }

    None
}

/// 解析新浪期货列表中的合约代码
fn parse_node_symbols(text: &str) -> Result<Vec<String>> {
    let json_data: serde_json::Value =
        serde_json::from_str(text.trim()).map_err(|e| anyhow!("解析JSON失败: {}", e))?;

    // 未知 node 时新浪返回 null
    if json_data.is_null() {
        return Ok(Vec::new());
    }

    let data_array = json_data
        .as_array()
        .ok_or_else(|| anyhow!("期货列表格式错误: 期望数组"))?;

    Ok(data_array
        .iter()
        .filter_map(|item| item["symbol"].as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_JS: &str = r#"
        var ARRFUTURESNODES = {
            czce: ['郑州商品交易所', ['PTA', 'pta_qh', '16'], ['菜油', 'czy_qh', '16'], ['白糖', 'bt_qh', '16']],
            dce: ['大连商品交易所', ['豆粕', 'dp_qh', '16'], ['铁矿石', 'tks_qh', '16']],
            shfe: ['上海期货交易所', ['铜', 'tong_qh', '16'], ['国际铜', 'gjt_qh', '16'], ['螺纹钢', 'lwg_qh', '16']],
            cffex: ['中国金融期货交易所', ['沪深300', 'qz_qh', '16']],
            gfex: ['广州期货交易所', ['工业硅', 'gy_qh', '16']]
        };
        var other = {};
    "#;

    fn mock_marks() -> Vec<FuturesSymbolMark> {
        parse_symbol_mark_js(MOCK_JS).unwrap()
    }

    /// 测试解析品种映射JS
    #[test]
    fn test_parse_symbol_mark_js() {
        println!("\n========== 测试解析品种映射JS ==========");
        let marks = mock_marks();

        for m in &marks {
            println!("    【{}】{} -> {}", m.exchange, m.symbol, m.mark);
        }

        assert_eq!(marks.len(), 10);
        let copper = marks.iter().find(|m| m.symbol == "铜").unwrap();
        assert_eq!(copper.mark, "tong_qh");
        assert_eq!(copper.exchange, "上海期货交易所");

        let pta = marks.iter().find(|m| m.symbol == "PTA").unwrap();
        assert_eq!(pta.exchange, "郑州商品交易所");
        println!("✅ 品种映射解析测试通过！");
    }

    #[test]
    fn test_parse_symbol_mark_js_invalid() {
        assert!(parse_symbol_mark_js("var x = 1;").is_err());
    }

    /// 测试品种名称解析
    #[test]
    fn test_resolve_symbol_node() {
        println!("\n========== 测试品种名称解析 ==========");
        let marks = mock_marks();

        let cases = vec![
            ("铜", "tong_qh"),
            ("国际铜", "gjt_qh"),
            ("螺纹", "lwg_qh"),
            ("CU", "tong_qh"),
            ("cu", "tong_qh"),
            ("SHFE Copper", "tong_qh"),
            ("沪铜", "tong_qh"),
            ("OI", "czy_qh"),
            ("沪深300", "qz_qh"),
        ];

        for (input, expected) in &cases {
            let result = resolve_symbol_node(&marks, input).map(|m| m.mark.as_str());
            println!("  {} -> {:?} (期望: {})", input, result, expected);
            assert_eq!(result, Some(*expected));
        }

        assert!(resolve_symbol_node(&marks, "").is_none());
        assert!(resolve_symbol_node(&marks, "Unobtainium").is_none());
        println!("✅ 品种名称解析测试通过！");
    }

    /// 测试解析合约列表
    #[test]
    fn test_parse_node_symbols() {
        let text = r#"[
            {"symbol": "CU0", "name": "沪铜连续", "trade": "75150"},
            {"symbol": "CU2410", "name": "沪铜2410", "trade": "75100"},
            {"symbol": "CU2412", "name": "沪铜2412", "trade": "75300"},
            {"name": "缺少代码"}
        ]"#;

        let symbols = parse_node_symbols(text).unwrap();
        assert_eq!(symbols, vec!["CU0", "CU2410", "CU2412"]);

        assert!(parse_node_symbols("null").unwrap().is_empty());
        assert!(parse_node_symbols("<html>").is_err());
        assert!(parse_node_symbols(r#"{"symbol": "CU2410"}"#).is_err());
    }

    // ==================== 异步集成测试 ====================

    /// 测试动态获取品种映射
    #[tokio::test]
    async fn test_get_symbol_mark() {
        println!("\n========== 测试动态获取品种映射 ==========");
        let provider = SinaProvider::new();

        match provider.get_symbol_mark().await {
            Ok(symbols) => {
                println!("✅ 获取成功！共 {} 个品种", symbols.len());
                for s in symbols.iter().take(10) {
                    println!("    【{}】{} -> {}", s.exchange, s.symbol, s.mark);
                }
            }
            Err(e) => {
                println!("❌ 获取失败: {}", e);
            }
        }
    }

    /// 测试获取品种合约列表
    #[tokio::test]
    async fn test_lookup_symbols() {
        println!("\n========== 测试获取品种合约列表 ==========");
        let provider = SinaProvider::new();

        match provider.lookup_symbols("铜").await {
            Ok(symbols) => {
                println!("✅ 获取成功！共 {} 个合约: {:?}", symbols.len(), symbols);
            }
            Err(e) => {
                println!("❌ 获取失败: {}", e);
            }
        }
    }
}
