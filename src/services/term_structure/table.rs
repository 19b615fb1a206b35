//! 期限结构表
//!
//! 稀疏的 `日期 → (合约 → 收盘价)` 结构，按日期对各合约序列做外连接，
//! 某合约当日无报价时对应单元格直接缺失。

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::{DailyClose, TermStructureRow};

use super::window::DateWindow;

/// 单个合约在回看区间内的收盘价
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub closes: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// 按区间过滤日线，同一日期出现多次时以最后一条为准
    pub fn from_history(symbol: impl Into<String>, history: &[DailyClose], window: &DateWindow) -> Self {
        let closes = history
            .iter()
            .filter(|row| window.contains(row.date))
            .map(|row| (row.date, row.close))
            .collect();

        Self {
            symbol: symbol.into(),
            closes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermStructureTable {
    cells: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
    symbols: BTreeSet<String>,
}

impl TermStructureTable {
    /// 按日期外连接所有合约序列，结果与序列顺序无关
    pub fn align<I>(series: I) -> Self
    where
        I: IntoIterator<Item = PriceSeries>,
    {
        let mut table = Self::default();

        for s in series {
            if s.is_empty() {
                continue;
            }
            for (date, close) in s.closes {
                table
                    .cells
                    .entry(date)
                    .or_default()
                    .insert(s.symbol.clone(), close);
            }
            table.symbols.insert(s.symbol);
        }

        table
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 有数据的交易日，升序
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells.keys().copied()
    }

    pub fn date_count(&self) -> usize {
        self.cells.len()
    }

    /// 表头合约，按代码排序
    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.symbols.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub fn get(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        self.cells.get(&date).and_then(|row| row.get(symbol)).copied()
    }

    /// 某一交易日的期限结构曲线，只包含当天有报价的合约
    pub fn curve(&self, date: NaiveDate) -> Vec<(&str, f64)> {
        self.cells
            .get(&date)
            .map(|row| row.iter().map(|(s, c)| (s.as_str(), *c)).collect())
            .unwrap_or_default()
    }

    /// 展开为 (日期, 合约, 收盘价) 行
    pub fn rows(&self) -> Vec<TermStructureRow> {
        self.cells
            .iter()
            .flat_map(|(date, row)| {
                row.iter().map(move |(symbol, close)| TermStructureRow {
                    date: *date,
                    symbol: symbol.clone(),
                    close: *close,
                })
            })
            .collect()
    }
}
