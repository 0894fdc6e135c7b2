//! Rebalance date scheduling.
//!
//! Anchors are generated from the frequency (every trading day, every Friday,
//! every calendar month end) and then placed on the trading calendar by the
//! policy. Under [`SchedulePolicy::NearestTradingDay`] the closest trading day
//! wins and an equal distance resolves to the earlier date. Anchors that
//! cannot be placed are returned as skipped, never silently moved further.

use crate::error::ScheduleError;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use fremantle_data::{DateRange, TradingCalendar};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How often the portfolio is rebalanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every trading day
    Daily,
    /// Every Friday
    Weekly,
    /// Every calendar month end
    Monthly,
}

/// How an anchor is mapped onto the trading calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// The anchor itself must be a trading day
    CalendarExact,
    /// Closest trading day within the search window, ties go backward
    NearestTradingDay,
}

/// Scheduler parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Rebalance frequency
    pub frequency: Frequency,
    /// Anchor placement policy
    pub policy: SchedulePolicy,
    /// Maximum distance in calendar days searched on either side
    pub max_search_days: u32,
}

/// Output of [`RebalanceScheduler::schedule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Rebalance dates, ascending and unique
    pub dates: Vec<NaiveDate>,
    /// Anchors that had no trading day
    pub skipped: Vec<ScheduleError>,
}

/// Pure function of configuration, range and calendar.
#[derive(Debug, Clone)]
pub struct RebalanceScheduler {
    config: ScheduleConfig,
}

impl RebalanceScheduler {
    /// Create a scheduler.
    pub const fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Rebalance dates for anchors inside `range`.
    pub fn schedule(&self, range: DateRange, calendar: &TradingCalendar) -> Schedule {
        let mut schedule = Schedule::default();
        for target in self.anchors(range, calendar) {
            match self.resolve(target, calendar) {
                Ok(date) => schedule.dates.push(date),
                Err(err) => {
                    warn!(%target, "{err}; rebalance skipped");
                    schedule.skipped.push(err);
                }
            }
        }
        // two anchors can land on the same trading day
        schedule.dates.sort_unstable();
        schedule.dates.dedup();
        debug!(
            dates = schedule.dates.len(),
            skipped = schedule.skipped.len(),
            frequency = ?self.config.frequency,
            "built rebalance schedule"
        );
        schedule
    }

    /// Place a single anchor on the calendar.
    pub fn resolve(
        &self,
        target: NaiveDate,
        calendar: &TradingCalendar,
    ) -> Result<NaiveDate, ScheduleError> {
        let found = match self.config.policy {
            SchedulePolicy::CalendarExact => calendar.contains(target).then_some(target),
            SchedulePolicy::NearestTradingDay => calendar
                .nearest(target, self.config.max_search_days)
                .map(|n| n.date()),
        };
        found.ok_or(ScheduleError::NoTradingDay {
            target,
            window_days: match self.config.policy {
                SchedulePolicy::CalendarExact => 0,
                SchedulePolicy::NearestTradingDay => self.config.max_search_days,
            },
        })
    }

    fn anchors(&self, range: DateRange, calendar: &TradingCalendar) -> Vec<NaiveDate> {
        match self.config.frequency {
            Frequency::Daily => calendar.between(range).to_vec(),
            Frequency::Weekly => weekly_anchors(range),
            Frequency::Monthly => monthly_anchors(range),
        }
    }
}

fn weekly_anchors(range: DateRange) -> Vec<NaiveDate> {
    let offset = (Weekday::Fri.num_days_from_monday() + 7
        - range.start.weekday().num_days_from_monday())
        % 7;
    let mut anchors = Vec::new();
    let mut day = range.start.checked_add_days(Days::new(u64::from(offset)));
    while let Some(d) = day.filter(|d| *d <= range.end) {
        anchors.push(d);
        day = d.checked_add_days(Days::new(7));
    }
    anchors
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn monthly_anchors(range: DateRange) -> Vec<NaiveDate> {
    let mut anchors = Vec::new();
    let mut end = month_end(range.start);
    while let Some(e) = end.filter(|e| *e <= range.end) {
        anchors.push(e);
        end = e.succ_opt().and_then(month_end);
    }
    anchors
}
