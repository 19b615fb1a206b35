//! 回看日期区间

use chrono::{Days, NaiveDate};

/// 闭区间 `[start, end]`，`start = end - lookback_days`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn lookback(end: NaiveDate, lookback_days: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
