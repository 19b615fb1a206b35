//! 公共常量和辅助函数

use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;

// ==================== 新浪期货 API 常量 ====================

/// 新浪期货列表 API
pub const SINA_FUTURES_LIST_API: &str = "https://vip.stock.finance.sina.com.cn/quotes_service/api/json_v2.php/Market_Center.getHQFuturesData";
/// 新浪期货品种映射 JS 文件
pub const SINA_FUTURES_SYMBOL_URL: &str =
    "https://vip.stock.finance.sina.com.cn/quotes_service/view/js/qihuohangqing.js";
/// 新浪期货日K线 API
pub const SINA_FUTURES_DAILY_API: &str = "https://stock2.finance.sina.com.cn/futures/api/jsonp.php/var%20_temp=/InnerFuturesNewService.getDailyKLine";

/// 新浪接口要求的请求头
pub const SINA_REFERER: &str = "https://finance.sina.com.cn/";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 获取北京时间字符串（ISO 8601 格式，带+08:00时区）
pub fn get_beijing_time() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 获取北京时间的当前日期（国内期货交易日历以北京时间为准）
pub fn get_beijing_today() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

/// 解析日期字符串，忽略时分秒部分
///
/// 支持 "2024-09-02"、"2024-09-02 00:00:00"、"20240902"
pub fn parse_trade_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.split([' ', 'T']).next().unwrap_or(s);

    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y/%m/%d"))
        .ok()
}

/// 中文品种名称到英文代码的映射
pub fn chinese_to_english(name: &str) -> Option<&'static str> {
    let result = match name {
        // 上海期货交易所
        "铜" => Some("CU"),
        "螺纹钢" => Some("RB"),
        "锌" => Some("ZN"),
        "铝" => Some("AL"),
        "黄金" => Some("AU"),
        "线材" => Some("WR"),
        "天然橡胶" | "橡胶" => Some("RU"),
        "铅" => Some("PB"),
        "白银" => Some("AG"),
        "沥青" | "石油沥青" => Some("BU"),
        "热轧卷板" | "热卷" => Some("HC"),
        "镍" => Some("NI"),
        "锡" => Some("SN"),
        "燃料油" | "燃油" => Some("FU"),
        "不锈钢" => Some("SS"),
        "纸浆" => Some("SP"),
        "氧化铝" => Some("AO"),
        "丁二烯橡胶" => Some("BR"),
        // 大连商品交易所
        "豆一" => Some("A"),
        "豆二" => Some("B"),
        "豆粕" => Some("M"),
        "豆油" => Some("Y"),
        "玉米" => Some("C"),
        "玉米淀粉" => Some("CS"),
        "棕榈油" | "棕榈" => Some("P"),
        "鸡蛋" => Some("JD"),
        "聚乙烯" | "LLDPE" => Some("L"),
        "聚氯乙烯" | "PVC" => Some("V"),
        "聚丙烯" | "PP" => Some("PP"),
        "焦炭" => Some("J"),
        "焦煤" => Some("JM"),
        "铁矿石" => Some("I"),
        "乙二醇" => Some("EG"),
        "苯乙烯" => Some("EB"),
        "液化石油气" | "LPG" => Some("PG"),
        "生猪" => Some("LH"),
        "纤维板" => Some("FB"),
        "胶合板" => Some("BB"),
        "粳米" => Some("RR"),
        // 郑州商品交易所
        "白糖" => Some("SR"),
        "棉花" => Some("CF"),
        "PTA" => Some("TA"),
        "菜籽油" | "菜油" => Some("OI"),
        "菜籽粕" | "菜粕" => Some("RM"),
        "甲醇" => Some("MA"),
        "玻璃" => Some("FG"),
        "动力煤" => Some("ZC"),
        "硅铁" => Some("SF"),
        "锰硅" => Some("SM"),
        "苹果" => Some("AP"),
        "红枣" => Some("CJ"),
        "尿素" => Some("UR"),
        "纯碱" => Some("SA"),
        "短纤" | "涤纶短纤" => Some("PF"),
        "花生" => Some("PK"),
        "菜籽" => Some("RS"),
        "棉纱" => Some("CY"),
        "粳稻" => Some("JR"),
        "晚籼稻" => Some("LR"),
        "早籼稻" => Some("RI"),
        "强麦" => Some("WH"),
        "普麦" => Some("PM"),
        "烧碱" => Some("SH"),
        "对二甲苯" | "PX" => Some("PX"),
        // 上海国际能源交易中心
        "原油" => Some("SC"),
        "20号胶" => Some("NR"),
        "低硫燃料油" => Some("LU"),
        "国际铜" => Some("BC"),
        "集运指数" | "集运欧线" => Some("EC"),
        // 广州期货交易所
        "工业硅" => Some("SI"),
        "碳酸锂" => Some("LC"),
        // 中国金融期货交易所
        "沪深300" => Some("IF"),
        "上证50" => Some("IH"),
        "中证500" => Some("IC"),
        "中证1000" => Some("IM"),
        "2年期国债" => Some("TS"),
        "5年期国债" => Some("TF"),
        "10年期国债" => Some("T"),
        "30年期国债" => Some("TL"),
        _ => None,
    };

    if result.is_some() {
        return result;
    }

    // 模糊匹配
    if name.contains("菜籽油") {
        return Some("OI");
    }
    if name.contains("甲醇") {
        return Some("MA");
    }
    if name.contains("强麦") {
        return Some("WH");
    }
    if name.contains("棉纱") {
        return Some("CY");
    }

    None
}

/// 英文品种名称到代码的映射，兼容 "SHFE Copper" 这类输入
pub fn english_to_code(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "copper" => Some("CU"),
        "aluminium" | "aluminum" => Some("AL"),
        "zinc" => Some("ZN"),
        "lead" => Some("PB"),
        "nickel" => Some("NI"),
        "tin" => Some("SN"),
        "gold" => Some("AU"),
        "silver" => Some("AG"),
        "rebar" => Some("RB"),
        "hot rolled coil" => Some("HC"),
        "stainless steel" => Some("SS"),
        "iron ore" => Some("I"),
        "coke" => Some("J"),
        "coking coal" => Some("JM"),
        "crude oil" => Some("SC"),
        "fuel oil" => Some("FU"),
        "bitumen" => Some("BU"),
        "natural rubber" | "rubber" => Some("RU"),
        "soybean meal" => Some("M"),
        "soybean oil" => Some("Y"),
        "palm oil" => Some("P"),
        "corn" => Some("C"),
        "sugar" => Some("SR"),
        "cotton" => Some("CF"),
        "methanol" => Some("MA"),
        "glass" => Some("FG"),
        "soda ash" => Some("SA"),
        "industrial silicon" => Some("SI"),
        "lithium carbonate" => Some("LC"),
        _ => None,
    }
}
