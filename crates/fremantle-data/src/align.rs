//! Point-in-time alignment of fundamentals onto the trading calendar.
//!
//! For each instrument and field, the value attached to a trading date is the
//! most recent record whose announcement date is on or before that date.
//! Fields with no prior announcement stay `None`. Dates without a price bar
//! produce no observation.

use crate::calendar::TradingCalendar;
use crate::error::{DataError, Result};
use crate::observation::{DailyObservation, FundamentalValue, ObservationPanel};
use crate::types::{FundamentalRecord, PriceBar, Symbol};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Announcements for one (symbol, field), sorted by announcement date.
type Timeline<'a> = Vec<&'a FundamentalRecord>;

/// Merges low-frequency fundamentals with daily prices without look-ahead.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointInTimeAligner;

impl PointInTimeAligner {
    /// Create an aligner.
    pub const fn new() -> Self {
        Self
    }

    /// Align fundamentals and prices onto `calendar`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DataIntegrity`] when two records share
    /// `(symbol, field, announcement_date, report_period_end)` or a record is
    /// announced before its period ended; duplicates must be resolved
    /// upstream before alignment.
    ///
    /// Several periods announced on one day (an annual report published with
    /// the next first quarter) are valid; the latest period wins.
    pub fn align(
        &self,
        fundamentals: &[FundamentalRecord],
        prices: &[PriceBar],
        calendar: &TradingCalendar,
    ) -> Result<ObservationPanel> {
        let timelines = build_timelines(fundamentals)?;
        let fields: BTreeSet<&str> = fundamentals.iter().map(|r| r.field.as_str()).collect();

        let mut bars_by_symbol: BTreeMap<&Symbol, Vec<&PriceBar>> = BTreeMap::new();
        for bar in prices {
            if calendar.contains(bar.date) {
                bars_by_symbol.entry(&bar.symbol).or_default().push(bar);
            }
        }

        let mut observations = Vec::with_capacity(prices.len());
        for (symbol, mut bars) in bars_by_symbol {
            bars.sort_by_key(|b| b.date);
            if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
                return Err(DataError::integrity(
                    symbol.as_str(),
                    "price",
                    pair[0].date,
                    "duplicate price bar",
                ));
            }

            // One cursor per field; dates are visited in ascending order so
            // each cursor only moves forward.
            let mut cursors: BTreeMap<&str, (usize, Option<&Timeline<'_>>)> = fields
                .iter()
                .map(|f| (*f, (0, timelines.get(&(symbol, *f)))))
                .collect();

            for bar in bars {
                let mut values = BTreeMap::new();
                for (field, (cursor, timeline)) in cursors.iter_mut() {
                    let value = (*timeline).and_then(|t| advance_cursor(t, cursor, bar.date));
                    values.insert((*field).to_string(), value);
                }
                observations.push(DailyObservation {
                    symbol: symbol.clone(),
                    date: bar.date,
                    bar: bar.clone(),
                    fundamentals: values,
                });
            }
        }

        let panel = ObservationPanel::from_observations(observations);
        info!(
            observations = panel.len(),
            dates = panel.dates().len(),
            fields = fields.len(),
            "aligned fundamentals onto trading calendar"
        );
        Ok(panel)
    }
}

/// Group records into per-(symbol, field) timelines and reject duplicates.
fn build_timelines(
    fundamentals: &[FundamentalRecord],
) -> Result<HashMap<(&Symbol, &str), Timeline<'_>>> {
    let mut timelines: HashMap<(&Symbol, &str), Timeline<'_>> = HashMap::new();
    for record in fundamentals {
        if record.announcement_date < record.report_period_end {
            return Err(DataError::integrity(
                record.symbol.as_str(),
                record.field.as_str(),
                record.announcement_date,
                "announced before the fiscal period ended",
            ));
        }
        timelines
            .entry((&record.symbol, record.field.as_str()))
            .or_default()
            .push(record);
    }

    for ((symbol, field), timeline) in timelines.iter_mut() {
        timeline.sort_by_key(|r| (r.announcement_date, r.report_period_end));
        if let Some(pair) = timeline.windows(2).find(|w| {
            w[0].announcement_date == w[1].announcement_date
                && w[0].report_period_end == w[1].report_period_end
        }) {
            let reason = if pair[0].value == pair[1].value {
                "duplicate announcement"
            } else {
                "contradictory values announced on the same date"
            };
            return Err(DataError::integrity(
                symbol.as_str(),
                *field,
                pair[0].announcement_date,
                reason,
            ));
        }
        debug!(symbol = %symbol, field, records = timeline.len(), "built announcement timeline");
    }
    Ok(timelines)
}

/// Move `cursor` past every record announced on or before `date` and return
/// the latest one.
fn advance_cursor(
    timeline: &Timeline<'_>,
    cursor: &mut usize,
    date: NaiveDate,
) -> Option<FundamentalValue> {
    while *cursor < timeline.len() && timeline[*cursor].announcement_date <= date {
        *cursor += 1;
    }
    cursor.checked_sub(1).map(|i| {
        let record = timeline[i];
        FundamentalValue {
            value: record.value,
            announced: record.announcement_date,
            period_end: record.report_period_end,
        }
    })
}
