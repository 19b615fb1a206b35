//! 期限结构接口模型
//!
//! 定义期限结构接口的查询参数和响应结构

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 期限结构查询参数
#[derive(Debug, Deserialize)]
pub struct TermStructureQuery {
    /// 品种名称或代码（如 铜、沪铜、CU）
    pub commodity: String,
    /// 回看天数（1-30，默认30）
    pub days: Option<u32>,
}

/// 单个合约拉取失败的记录
///
/// 不影响整体结果，随响应一起返回
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SymbolFetchFailure {
    /// 合约代码
    pub symbol: String,
    /// 失败原因
    pub reason: String,
}

/// 期限结构表中的一个单元格
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TermStructureRow {
    /// 交易日
    pub date: NaiveDate,
    /// 合约代码
    pub symbol: String,
    /// 收盘价
    pub close: f64,
}

/// 子图网格布局
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// 行数
    pub rows: usize,
    /// 列数（固定为3）
    pub cols: usize,
    /// 已绘制的子图数
    pub used: usize,
    /// 末尾留白的格子数
    pub blank: usize,
}

/// 期限结构接口响应
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TermStructureReport {
    /// 查询的品种
    pub commodity: String,
    /// 区间开始日期
    pub start_date: NaiveDate,
    /// 区间结束日期
    pub end_date: NaiveDate,
    /// 参与绘图的合约（按代码排序）
    pub symbols: Vec<String>,
    /// 有数据的交易日（升序）
    pub dates: Vec<NaiveDate>,
    /// 表格数据（按日期、合约排序）
    pub rows: Vec<TermStructureRow>,
    /// 拉取失败的合约
    pub warnings: Vec<SymbolFetchFailure>,
    /// 子图网格
    pub grid: GridLayout,
    /// 图片路径
    pub image_path: String,
}
