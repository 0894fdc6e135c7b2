//! Trading calendar.
//!
//! An ordered, deduplicated set of trading dates for one market. Read-only
//! after construction and safe to share across worker threads.

use crate::types::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of a target date a nearest-day search resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nearest {
    /// The target itself is a trading day
    Exact(NaiveDate),
    /// Closest trading day before the target
    Backward(NaiveDate),
    /// Closest trading day after the target
    Forward(NaiveDate),
}

impl Nearest {
    /// The resolved trading date.
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Exact(d) | Self::Backward(d) | Self::Forward(d) => *d,
        }
    }
}

/// Ordered set of valid trading dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl From<Vec<NaiveDate>> for TradingCalendar {
    fn from(dates: Vec<NaiveDate>) -> Self {
        Self::new(dates)
    }
}

impl From<TradingCalendar> for Vec<NaiveDate> {
    fn from(calendar: TradingCalendar) -> Self {
        calendar.dates
    }
}

impl FromIterator<NaiveDate> for TradingCalendar {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl TradingCalendar {
    /// Build a calendar from unordered, possibly duplicated dates.
    pub fn new(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    /// All trading dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the calendar has no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First trading date.
    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last trading date.
    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Whether `date` is a trading day.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Position of `date` in the calendar, if it is a trading day.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Trading date at position `index`.
    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// First trading day on or after `date`.
    pub fn next_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < date);
        self.dates.get(idx).copied()
    }

    /// Last trading day on or before `date`.
    pub fn prev_on_or_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d <= date);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// The trading day `n` sessions after the trading day `date`.
    ///
    /// Returns `None` when `date` is not a trading day or the offset runs past
    /// the end of the calendar.
    pub fn offset(&self, date: NaiveDate, n: usize) -> Option<NaiveDate> {
        let idx = self.index_of(date)?;
        self.dates.get(idx + n).copied()
    }

    /// Trading dates inside an inclusive range.
    pub fn between(&self, range: DateRange) -> &[NaiveDate] {
        let lo = self.dates.partition_point(|d| *d < range.start);
        let hi = self.dates.partition_point(|d| *d <= range.end);
        &self.dates[lo..hi]
    }

    /// Nearest trading day to `target` within `window_days` calendar days.
    ///
    /// Ties between an earlier and a later candidate resolve to the earlier one.
    pub fn nearest(&self, target: NaiveDate, window_days: u32) -> Option<Nearest> {
        if self.contains(target) {
            return Some(Nearest::Exact(target));
        }
        let window = i64::from(window_days);
        let backward = self
            .prev_on_or_before(target)
            .filter(|d| (target - *d).num_days() <= window);
        let forward = self
            .next_on_or_after(target)
            .filter(|d| (*d - target).num_days() <= window);

        match (backward, forward) {
            (Some(b), Some(f)) => {
                if (target - b).num_days() <= (f - target).num_days() {
                    Some(Nearest::Backward(b))
                } else {
                    Some(Nearest::Forward(f))
                }
            }
            (Some(b), None) => Some(Nearest::Backward(b)),
            (None, Some(f)) => Some(Nearest::Forward(f)),
            (None, None) => None,
        }
    }
}
