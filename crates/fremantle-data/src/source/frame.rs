//! Polars DataFrame-backed data source.
//!
//! Column names follow the CSV layout. Columns are validated and converted
//! to typed records once, at the boundary; nothing downstream sees a frame.

use super::{DataSource, wanted};
use crate::calendar::TradingCalendar;
use crate::error::{DataError, Result};
use crate::types::{DateRange, FundamentalRecord, Instrument, PriceBar, Symbol};
use chrono::NaiveDate;
use polars::prelude::*;

/// Typed tables converted from DataFrames.
#[derive(Debug, Clone)]
pub struct FrameSource {
    instruments: Vec<Instrument>,
    fundamentals: Vec<FundamentalRecord>,
    prices: Vec<PriceBar>,
    calendar: TradingCalendar,
    market: String,
}

impl FrameSource {
    /// Convert the four frames into typed records.
    ///
    /// `calendar` needs a `date` column; its dates belong to `market`.
    pub fn from_frames(
        instruments: &DataFrame,
        fundamentals: &DataFrame,
        prices: &DataFrame,
        calendar: &DataFrame,
        market: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            instruments: instruments_from_frame(instruments)?,
            fundamentals: fundamentals_from_frame(fundamentals)?,
            prices: prices_from_frame(prices)?,
            calendar: TradingCalendar::new(required(dates(calendar, "date")?, "date")?),
            market: market.into(),
        })
    }
}

impl DataSource for FrameSource {
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
        if market != self.market {
            return Err(DataError::UnknownMarket(market.to_string()));
        }
        Ok(TradingCalendar::new(self.calendar.between(range).to_vec()))
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.schema().contains(name)
}

fn ensure_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    match names.iter().find(|n| !has_column(df, n)) {
        Some(missing) => Err(DataError::MissingColumn((*missing).to_string())),
        None => Ok(()),
    }
}

fn strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn flags(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    if !has_column(df, name) {
        return Ok(vec![false; df.height()]);
    }
    let column = df.column(name)?.cast(&DataType::Boolean)?;
    Ok(column
        .bool()?
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect())
}

fn optional_floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if has_column(df, name) {
        floats(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

fn dates(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    strings(df, name)?
        .into_iter()
        .map(|v| {
            v.map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| DataError::Parse(format!("{name}: '{s}': {e}")))
            })
            .transpose()
        })
        .collect()
}

fn required<T>(values: Vec<Option<T>>, name: &str) -> Result<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| DataError::Parse(format!("null {name} in row {row}"))))
        .collect()
}

fn instruments_from_frame(df: &DataFrame) -> Result<Vec<Instrument>> {
    ensure_columns(df, &["symbol", "listing_date"])?;
    let symbols = required(strings(df, "symbol")?, "symbol")?;
    let listing = required(dates(df, "listing_date")?, "listing_date")?;
    let delisting = if has_column(df, "delisting_date") {
        dates(df, "delisting_date")?
    } else {
        vec![None; df.height()]
    };
    let flagged = flags(df, "flagged")?;
    let industry = if has_column(df, "industry") {
        strings(df, "industry")?
    } else {
        vec![None; df.height()]
    };

    Ok(symbols
        .into_iter()
        .enumerate()
        .map(|(i, symbol)| Instrument {
            symbol: Symbol::new(symbol),
            listing_date: listing[i],
            delisting_date: delisting[i],
            flagged: flagged[i],
            industry: industry[i].clone(),
        })
        .collect())
}

fn fundamentals_from_frame(df: &DataFrame) -> Result<Vec<FundamentalRecord>> {
    ensure_columns(
        df,
        &["symbol", "report_period_end", "announcement_date", "field", "value"],
    )?;
    let symbols = required(strings(df, "symbol")?, "symbol")?;
    let period_end = required(dates(df, "report_period_end")?, "report_period_end")?;
    let announced = required(dates(df, "announcement_date")?, "announcement_date")?;
    let fields = required(strings(df, "field")?, "field")?;
    let values = floats(df, "value")?;

    // A null value is not a disclosure; skip the row rather than inventing zero.
    Ok(symbols
        .into_iter()
        .enumerate()
        .filter_map(|(i, symbol)| {
            values[i].map(|value| {
                FundamentalRecord::new(symbol, period_end[i], announced[i], fields[i].clone(), value)
            })
        })
        .collect())
}

fn prices_from_frame(df: &DataFrame) -> Result<Vec<PriceBar>> {
    ensure_columns(df, &["symbol", "date", "open", "close", "high", "low", "volume"])?;
    let symbols = required(strings(df, "symbol")?, "symbol")?;
    let trade_dates = required(dates(df, "date")?, "date")?;
    let open = required(floats(df, "open")?, "open")?;
    let close = required(floats(df, "close")?, "close")?;
    let high = required(floats(df, "high")?, "high")?;
    let low = required(floats(df, "low")?, "low")?;
    let volume = required(floats(df, "volume")?, "volume")?;
    let amount = optional_floats(df, "amount")?;
    let market_cap = optional_floats(df, "market_cap")?;
    let suspended = flags(df, "suspended")?;
    let limit_locked = flags(df, "limit_locked")?;

    Ok(symbols
        .into_iter()
        .enumerate()
        .map(|(i, symbol)| PriceBar {
            symbol: Symbol::new(symbol),
            date: trade_dates[i],
            open: open[i],
            close: close[i],
            high: high[i],
            low: low[i],
            volume: volume[i],
            amount: amount[i],
            market_cap: market_cap[i],
            suspended: suspended[i],
            limit_locked: limit_locked[i],
        })
        .collect())
}
