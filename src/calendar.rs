use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{DailyGoal, DailyLog, MacroTotals};

/// Every date of a month, or nothing for an invalid year/month.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect()
}

/// What the calendar shows for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub goal: Option<DailyGoal>,
    pub consumed: MacroTotals,
}

impl DayOverview {
    pub fn new(date: NaiveDate, log: DailyLog) -> Self {
        Self {
            date,
            goal: log.goal,
            consumed: log.consumed,
        }
    }

    /// A day counts as logged once anything with calories was eaten.
    pub fn is_logged(&self) -> bool {
        self.consumed.kcal > 0
    }

    /// Calories left against the goal; negative when over.
    pub fn remaining_kcal(&self) -> Option<i64> {
        self.goal.map(|goal| goal.kcal.saturating_sub(self.consumed.kcal))
    }
}
