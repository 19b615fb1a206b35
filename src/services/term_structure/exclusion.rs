//! 连续合约排除列表
//!
//! 新浪合约列表中会混入 `CU0` 这类连续合约，它们是换月拼接的序列，
//! 不对应具体交割月份，需要从期限结构中剔除。

use std::collections::{BTreeSet, HashSet};

/// 内置的连续合约代码
pub const DEFAULT_CONTINUOUS_CONTRACTS: [&str; 75] = [
    "V0", "P0", "B0", "M0", "I0", "JD0", "L0", "PP0", "FB0", "BB0", "Y0",
    "C0", "A0", "J0", "JM0", "CS0", "EG0", "RR0", "EB0", "PG0", "LH0",
    "TA0", "OI0", "RS0", "RM0", "WH0", "JR0", "SR0", "CF0", "RI0", "MA0",
    "FG0", "LR0", "SF0", "SM0", "CY0", "AP0", "CJ0", "UR0", "SA0", "PF0",
    "PK0", "SH0", "PX0", "FU0", "SC0", "AL0", "RU0", "ZN0", "CU0", "AU0",
    "RB0", "WR0", "PB0", "AG0", "BU0", "HC0", "SN0", "NI0", "SP0", "NR0",
    "SS0", "LU0", "BC0", "AO0", "BR0", "EC0", "IF0", "TF0", "IH0", "IC0",
    "TS0", "IM0", "SI0", "LC0",
];

/// 连续合约集合（区分大小写的精确匹配）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuousContracts {
    codes: HashSet<String>,
}

impl ContinuousContracts {
    /// 使用自定义代码集合，测试和配置覆盖时使用
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.codes.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// 剔除连续合约，去重后按代码排序
    pub fn active_symbols<I, S>(&self, symbols: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        symbols
            .into_iter()
            .filter(|s| !self.contains(s.as_ref()))
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for ContinuousContracts {
    fn default() -> Self {
        Self::from_codes(DEFAULT_CONTINUOUS_CONTRACTS)
    }
}
