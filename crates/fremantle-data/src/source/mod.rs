//! Data source boundary.
//!
//! The engine loads everything up front through a [`DataSource`] and then
//! works on immutable in-memory structures. Implementations here cover
//! in-memory fixtures, CSV files and polars DataFrames; database access is
//! left to callers implementing the trait.

mod csv;
mod frame;

pub use self::csv::{CsvPaths, CsvSource};
pub use frame::FrameSource;

use crate::calendar::TradingCalendar;
use crate::error::{DataError, Result};
use crate::types::{DateRange, FundamentalRecord, Instrument, PriceBar, Symbol};
use std::collections::BTreeMap;

/// Provider of the raw tables consumed by the engine.
///
/// An empty `symbols` slice means "every instrument the source knows".
pub trait DataSource {
    /// Instrument master data.
    fn fetch_instruments(&self, symbols: &[Symbol]) -> Result<Vec<Instrument>>;

    /// Fundamental records announced on or before `range.end`.
    ///
    /// Earlier announcements are included because forward-filling needs the
    /// latest value known at `range.start`.
    fn fetch_fundamentals(
        &self,
        symbols: &[Symbol],
        range: DateRange,
    ) -> Result<Vec<FundamentalRecord>>;

    /// Daily bars dated inside `range`.
    fn fetch_prices(&self, symbols: &[Symbol], range: DateRange) -> Result<Vec<PriceBar>>;

    /// Trading calendar of `market` restricted to `range`.
    fn fetch_calendar(&self, market: &str, range: DateRange) -> Result<TradingCalendar>;
}

pub(crate) fn wanted(symbols: &[Symbol], symbol: &Symbol) -> bool {
    symbols.is_empty() || symbols.contains(symbol)
}

/// A [`DataSource`] over owned vectors, mostly for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    instruments: Vec<Instrument>,
    fundamentals: Vec<FundamentalRecord>,
    prices: Vec<PriceBar>,
    calendars: BTreeMap<String, TradingCalendar>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add instruments.
    pub fn with_instruments(mut self, instruments: Vec<Instrument>) -> Self {
        self.instruments.extend(instruments);
        self
    }

    /// Add fundamental records.
    pub fn with_fundamentals(mut self, records: Vec<FundamentalRecord>) -> Self {
        self.fundamentals.extend(records);
        self
    }

    /// Add price bars.
    pub fn with_prices(mut self, prices: Vec<PriceBar>) -> Self {
        self.prices.extend(prices);
        self
    }

    /// Register the calendar for `market`.
    pub fn with_calendar(mut self, market: impl Into<String>, calendar: TradingCalendar) -> Self {
        self.calendars.insert(market.into(), calendar);
        self
    }
}

impl DataSource for InMemorySource {
    fn fetch_instruments(&self, symbols: &[Symbol]) -> Result<Vec<Instrument>> {
        Ok(self
            .instruments
            .iter()
            .filter(|i| wanted(symbols, &i.symbol))
            .cloned()
            .collect())
    }

    fn fetch_fundamentals(
        &self,
        symbols: &[Symbol],
        range: DateRange,
    ) -> Result<Vec<FundamentalRecord>> {
        Ok(self
            .fundamentals
            .iter()
            .filter(|r| wanted(symbols, &r.symbol) && r.announcement_date <= range.end)
            .cloned()
            .collect())
    }

    fn fetch_prices(&self, symbols: &[Symbol], range: DateRange) -> Result<Vec<PriceBar>> {
        Ok(self
            .prices
            .iter()
            .filter(|b| wanted(symbols, &b.symbol) && range.contains(b.date))
            .cloned()
            .collect())
    }

    fn fetch_calendar(&self, market: &str, range: DateRange) -> Result<TradingCalendar> {
        let calendar = self
            .calendars
            .get(market)
            .ok_or_else(|| DataError::UnknownMarket(market.to_string()))?;
        Ok(TradingCalendar::new(calendar.between(range).to_vec()))
    }
}
