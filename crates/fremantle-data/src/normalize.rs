//! Cumulative-to-discrete fiscal period conversion.
//!
//! Flow items are disclosed cumulatively from the start of the fiscal year:
//! Q1, H1, Q1-Q3 and the annual report. A single-quarter value is the
//! difference between a disclosure and the immediately preceding one in the
//! same fiscal year. If that preceding disclosure is missing the conversion
//! fails instead of differencing non-adjacent periods.

use crate::error::{DataError, Result};
use crate::types::{FundamentalRecord, Symbol};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Cumulative reporting period identified from the period-end month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// First quarter (Jan-Mar)
    Q1,
    /// First half (Jan-Jun)
    H1,
    /// First three quarters (Jan-Sep)
    NineMonths,
    /// Full fiscal year
    Annual,
}

impl FiscalPeriod {
    /// Classify a period-end date. Only quarter-end months are valid.
    pub fn from_period_end(date: NaiveDate) -> Option<Self> {
        match date.month() {
            3 => Some(Self::Q1),
            6 => Some(Self::H1),
            9 => Some(Self::NineMonths),
            12 => Some(Self::Annual),
            _ => None,
        }
    }

    /// The last quarter (1-4) the cumulative figure covers.
    pub const fn quarter(&self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::H1 => 2,
            Self::NineMonths => 3,
            Self::Annual => 4,
        }
    }
}

/// A single-quarter value derived from cumulative disclosures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicValue {
    /// Instrument symbol
    pub symbol: Symbol,
    /// Source field name
    pub field: String,
    /// Fiscal year
    pub fiscal_year: i32,
    /// Quarter within the fiscal year (1-4)
    pub quarter: u8,
    /// End date of the quarter
    pub period_end: NaiveDate,
    /// Date on which every input to this value was public
    pub announcement_date: NaiveDate,
    /// Discrete value for the quarter; negative values are valid
    pub value: f64,
}

impl PeriodicValue {
    /// Convert back into a record named `<field>_<suffix>` so it can be aligned.
    pub fn to_record(&self, suffix: &str) -> FundamentalRecord {
        FundamentalRecord {
            symbol: self.symbol.clone(),
            report_period_end: self.period_end,
            announcement_date: self.announcement_date,
            field: format!("{}_{}", self.field, suffix),
            value: self.value,
        }
    }

    /// `(fiscal_year, quarter)` of the quarter that follows this one.
    const fn next_quarter(&self) -> (i32, u8) {
        if self.quarter == 4 {
            (self.fiscal_year + 1, 1)
        } else {
            (self.fiscal_year, self.quarter + 1)
        }
    }
}

/// Converts cumulative fiscal figures into discrete quarters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodNormalizer;

impl PeriodNormalizer {
    /// Create a normalizer.
    pub const fn new() -> Self {
        Self
    }

    /// Convert cumulative records into single-quarter values.
    ///
    /// Records are grouped by `(symbol, field, fiscal_year)` and processed in
    /// period order. Output is sorted by symbol, field, year and quarter.
    ///
    /// # Errors
    ///
    /// - [`DataError::DataIntegrity`] when a period end is not a quarter end,
    ///   or a fiscal period is disclosed more than once.
    /// - [`DataError::MissingPeriod`] when the preceding cumulative period of
    ///   the same fiscal year is absent.
    pub fn normalize(&self, records: &[FundamentalRecord]) -> Result<Vec<PeriodicValue>> {
        let mut groups: BTreeMap<(&Symbol, &str, i32), Vec<(FiscalPeriod, &FundamentalRecord)>> =
            BTreeMap::new();

        for record in records {
            let period = FiscalPeriod::from_period_end(record.report_period_end).ok_or_else(|| {
                DataError::integrity(
                    record.symbol.as_str(),
                    record.field.as_str(),
                    record.report_period_end,
                    "period end is not a fiscal quarter end",
                )
            })?;
            groups
                .entry((
                    &record.symbol,
                    record.field.as_str(),
                    record.report_period_end.year(),
                ))
                .or_default()
                .push((period, record));
        }

        let mut out = Vec::with_capacity(records.len());
        for ((symbol, field, fiscal_year), mut disclosures) in groups {
            disclosures.sort_by_key(|(period, _)| *period);

            let mut previous: Option<(FiscalPeriod, &FundamentalRecord)> = None;
            for (period, record) in disclosures {
                let expected = previous.map_or(1, |(p, _)| p.quarter() + 1);
                if period.quarter() < expected {
                    return Err(DataError::integrity(
                        symbol.as_str(),
                        field,
                        record.report_period_end,
                        "fiscal period disclosed more than once",
                    ));
                }
                if period.quarter() != expected {
                    return Err(DataError::MissingPeriod {
                        symbol: symbol.to_string(),
                        field: field.to_string(),
                        fiscal_year,
                        expected_quarter: expected,
                        found_quarter: period.quarter(),
                    });
                }

                let (value, announcement_date) = match previous {
                    None => (record.value, record.announcement_date),
                    Some((_, prev)) => (
                        record.value - prev.value,
                        record.announcement_date.max(prev.announcement_date),
                    ),
                };
                out.push(PeriodicValue {
                    symbol: symbol.clone(),
                    field: field.to_string(),
                    fiscal_year,
                    quarter: period.quarter(),
                    period_end: record.report_period_end,
                    announcement_date,
                    value,
                });
                previous = Some((period, record));
            }
        }

        debug!(
            records = records.len(),
            periodic = out.len(),
            "normalized cumulative disclosures"
        );
        Ok(out)
    }

    /// Trailing-twelve-month sums over four consecutive quarters.
    ///
    /// A value is emitted for a quarter only when it and the three quarters
    /// before it (crossing fiscal years as needed) are all present.
    pub fn trailing_twelve_months(&self, periodic: &[PeriodicValue]) -> Vec<PeriodicValue> {
        let mut series: BTreeMap<(&Symbol, &str), Vec<&PeriodicValue>> = BTreeMap::new();
        for value in periodic {
            series
                .entry((&value.symbol, value.field.as_str()))
                .or_default()
                .push(value);
        }

        let mut out = Vec::new();
        for (_, mut quarters) in series {
            quarters.sort_by_key(|v| (v.fiscal_year, v.quarter));
            for window in quarters.windows(4) {
                let consecutive = window
                    .windows(2)
                    .all(|pair| pair[0].next_quarter() == (pair[1].fiscal_year, pair[1].quarter));
                if !consecutive {
                    continue;
                }
                let last = window[3];
                out.push(PeriodicValue {
                    value: window.iter().map(|v| v.value).sum(),
                    announcement_date: window
                        .iter()
                        .map(|v| v.announcement_date)
                        .max()
                        .unwrap_or(last.announcement_date),
                    ..last.clone()
                });
            }
        }
        out
    }
}
