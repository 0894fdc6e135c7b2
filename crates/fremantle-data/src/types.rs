//! Typed records shared by every stage of the engine.
//!
//! All dates are calendar dates without time-of-day. Missing numeric values
//! are `None`, never zero.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Stable identifier of a tradable security.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from anything string-like.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Borrow the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date in the range
    pub start: NaiveDate,
    /// Last date in the range
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether `date` lies inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A tradable security and its status flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument symbol
    pub symbol: Symbol,
    /// First trading date
    pub listing_date: NaiveDate,
    /// Delisting date, if the instrument has left the market
    #[serde(default)]
    pub delisting_date: Option<NaiveDate>,
    /// Special-treatment / risk-warning flag
    #[serde(default)]
    pub flagged: bool,
    /// Industry classification used for peer grouping
    #[serde(default)]
    pub industry: Option<String>,
}

impl Instrument {
    /// Create an instrument listed on `listing_date` with no flags.
    pub fn new(symbol: impl Into<Symbol>, listing_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            listing_date,
            delisting_date: None,
            flagged: false,
            industry: None,
        }
    }

    /// Attach an industry classification.
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Whether the instrument is listed and not delisted as of `date`.
    pub fn is_listed_on(&self, date: NaiveDate) -> bool {
        self.listing_date <= date && self.delisting_date.is_none_or(|d| date < d)
    }

    /// Number of calendar days since listing, or `None` before listing.
    pub fn listed_days(&self, date: NaiveDate) -> Option<i64> {
        let days = (date - self.listing_date).num_days();
        (days >= 0).then_some(days)
    }
}

/// A single disclosed fundamental figure.
///
/// `value` is cumulative since the start of the fiscal year for flow items
/// (income, revenue) and a point value for stock items (equity, debt).
/// `announcement_date` is the first date the value was publicly knowable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    /// Instrument symbol
    pub symbol: Symbol,
    /// End of the fiscal period covered
    pub report_period_end: NaiveDate,
    /// Publication date
    pub announcement_date: NaiveDate,
    /// Field name, e.g. `net_income`
    pub field: String,
    /// Disclosed value
    pub value: f64,
}

impl FundamentalRecord {
    /// Create a new record.
    pub fn new(
        symbol: impl Into<Symbol>,
        report_period_end: NaiveDate,
        announcement_date: NaiveDate,
        field: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            report_period_end,
            announcement_date,
            field: field.into(),
            value,
        }
    }
}

/// One day of market data for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Instrument symbol
    pub symbol: Symbol,
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Closing price
    pub close: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Traded volume
    pub volume: f64,
    /// Traded value; derived from close and volume when absent
    #[serde(default)]
    pub amount: Option<f64>,
    /// Total market capitalization
    #[serde(default)]
    pub market_cap: Option<f64>,
    /// Trading halted for the whole session
    #[serde(default)]
    pub suspended: bool,
    /// Price locked at the daily limit, no fill possible
    #[serde(default)]
    pub limit_locked: bool,
}

impl PriceBar {
    /// Create a bar where every price equals `close`.
    pub fn flat(symbol: impl Into<Symbol>, date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open: close,
            close,
            high: close,
            low: close,
            volume,
            amount: None,
            market_cap: None,
            suspended: false,
            limit_locked: false,
        }
    }

    /// Whether an order could have been filled on this bar.
    pub fn is_tradable(&self) -> bool {
        !self.suspended && !self.limit_locked && self.volume > 0.0
    }

    /// Traded value, falling back to `close * volume`.
    pub fn traded_value(&self) -> f64 {
        self.amount.unwrap_or(self.close * self.volume)
    }

    /// Look up a price-derived field by name.
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "close" => Some(self.close),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "volume" => Some(self.volume),
            "amount" => Some(self.traded_value()),
            "market_cap" => self.market_cap,
            _ => None,
        }
    }
}

/// Names resolved from [`PriceBar`] rather than from fundamentals.
pub const PRICE_FIELDS: &[&str] = &[
    "open",
    "close",
    "high",
    "low",
    "volume",
    "amount",
    "market_cap",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
    }

    #[test]
    fn test_instrument_listing_window() {
        let mut inst = Instrument::new("600000.SH", date(2020, 1, 10));
        inst.delisting_date = Some(date(2023, 6, 1));
        assert!(!inst.is_listed_on(date(2020, 1, 9)));
        assert!(inst.is_listed_on(date(2020, 1, 10)));
        assert!(!inst.is_listed_on(date(2023, 6, 1)));
        assert_eq!(inst.listed_days(date(2020, 1, 20)), Some(10));
        assert_eq!(inst.listed_days(date(2019, 12, 31)), None);
    }

    #[test]
    fn test_price_bar_tradability() {
        let mut bar = PriceBar::flat("A", date(2024, 1, 2), 10.0, 1000.0);
        assert!(bar.is_tradable());
        assert_eq!(bar.traded_value(), 10_000.0);
        bar.limit_locked = true;
        assert!(!bar.is_tradable());
        bar.limit_locked = false;
        bar.volume = 0.0;
        assert!(!bar.is_tradable());
    }

    #[test]
    fn test_price_field_lookup() {
        let mut bar = PriceBar::flat("A", date(2024, 1, 2), 10.0, 1000.0);
        assert_eq!(bar.field("close"), Some(10.0));
        assert_eq!(bar.field("market_cap"), None);
        bar.market_cap = Some(5e9);
        assert_eq!(bar.field("market_cap"), Some(5e9));
        assert_eq!(bar.field("net_income"), None);
    }
}
