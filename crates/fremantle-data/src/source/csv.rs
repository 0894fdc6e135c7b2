//! CSV-backed data source.

use super::{DataSource, wanted};
use crate::calendar::TradingCalendar;
use crate::error::{DataError, Result};
use crate::types::{DateRange, FundamentalRecord, Instrument, PriceBar, Symbol};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locations of the four input tables.
#[derive(Debug, Clone)]
pub struct CsvPaths {
    /// `symbol,listing_date,delisting_date,flagged,industry`
    pub instruments: PathBuf,
    /// `symbol,report_period_end,announcement_date,field,value`
    pub fundamentals: PathBuf,
    /// `symbol,date,open,close,high,low,volume,amount,market_cap,suspended,limit_locked`
    pub prices: PathBuf,
    /// `date[,market]`
    pub calendar: PathBuf,
}

impl CsvPaths {
    /// Conventional file names inside one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            instruments: dir.join("instruments.csv"),
            fundamentals: dir.join("fundamentals.csv"),
            prices: dir.join("prices.csv"),
            calendar: dir.join("calendar.csv"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    date: NaiveDate,
    #[serde(default)]
    market: Option<String>,
}

/// A fundamentals row; a blank `value` cell is not a disclosure.
#[derive(Debug, Deserialize)]
struct FundamentalRow {
    symbol: Symbol,
    report_period_end: NaiveDate,
    announcement_date: NaiveDate,
    field: String,
    value: Option<f64>,
}

impl FundamentalRow {
    fn into_record(self) -> Option<FundamentalRecord> {
        let value = self.value?;
        Some(FundamentalRecord {
            symbol: self.symbol,
            report_period_end: self.report_period_end,
            announcement_date: self.announcement_date,
            field: self.field,
            value,
        })
    }
}

/// Reads the input tables from CSV files on every fetch.
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: CsvPaths,
}

impl CsvSource {
    /// Create a source over explicit paths.
    pub const fn new(paths: CsvPaths) -> Self {
        Self { paths }
    }

    /// The configured paths.
    pub const fn paths(&self) -> &CsvPaths {
        &self.paths
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }
    let mut reader = ::csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read csv table");
    Ok(rows)
}

impl DataSource for CsvSource {
    fn fetch_instruments(&self, symbols: &[Symbol]) -> Result<Vec<Instrument>> {
        let rows: Vec<Instrument> = read_rows(&self.paths.instruments)?;
        Ok(rows
            .into_iter()
            .filter(|i| wanted(symbols, &i.symbol))
            .collect())
    }

    fn fetch_fundamentals(
        &self,
        symbols: &[Symbol],
        range: DateRange,
    ) -> Result<Vec<FundamentalRecord>> {
        let rows: Vec<FundamentalRow> = read_rows(&self.paths.fundamentals)?;
        let total = rows.len();
        let records: Vec<FundamentalRecord> = rows
            .into_iter()
            .filter_map(FundamentalRow::into_record)
            .collect();
        if records.len() < total {
            debug!(skipped = total - records.len(), "skipped fundamentals without a value");
        }
        Ok(records
            .into_iter()
            .filter(|r| wanted(symbols, &r.symbol) && r.announcement_date <= range.end)
            .collect())
    }

    fn fetch_prices(&self, symbols: &[Symbol], range: DateRange) -> Result<Vec<PriceBar>> {
        let rows: Vec<PriceBar> = read_rows(&self.paths.prices)?;
        Ok(rows
            .into_iter()
            .filter(|b| wanted(symbols, &b.symbol) && range.contains(b.date))
            .collect())
    }

    fn fetch_calendar(&self, market: &str, range: DateRange) -> Result<TradingCalendar> {
        let rows: Vec<CalendarRow> = read_rows(&self.paths.calendar)?;
        let dates: Vec<NaiveDate> = rows
            .into_iter()
            .filter(|r| r.market.as_deref().is_none_or(|m| m == market))
            .map(|r| r.date)
            .filter(|d| range.contains(*d))
            .collect();
        if dates.is_empty() {
            return Err(DataError::UnknownMarket(market.to_string()));
        }
        Ok(TradingCalendar::new(dates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("instruments.csv"),
            "symbol,listing_date,delisting_date,flagged,industry\n\
             A,2010-01-04,,false,Banks\n\
             B,2012-06-01,,true,\n",
        )
        .unwrap();
        fs::write(
            dir.join("fundamentals.csv"),
            "symbol,report_period_end,announcement_date,field,value\n\
             A,2023-09-30,2023-10-28,net_income,12.5\n\
             A,2023-12-31,2024-03-30,net_income,20.0\n\
             B,2023-09-30,2023-10-28,net_income,\n",
        )
        .unwrap();
        fs::write(
            dir.join("prices.csv"),
            "symbol,date,open,close,high,low,volume,amount,market_cap,suspended,limit_locked\n\
             A,2024-01-02,10,10.5,10.6,9.9,1000,,5e9,false,false\n\
             B,2024-01-02,3,3.1,3.2,2.9,0,,,true,false\n",
        )
        .unwrap();
        fs::write(
            dir.join("calendar.csv"),
            "date,market\n2024-01-02,XSHG\n2024-01-03,XSHG\n2024-01-02,XNYS\n",
        )
        .unwrap();
    }

    #[test]
    fn test_reads_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = CsvSource::new(CsvPaths::in_dir(dir.path()));
        let range = DateRange::new(date(1), date(31)).unwrap();

        let instruments = source.fetch_instruments(&[]).unwrap();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].industry.as_deref(), Some("Banks"));
        assert!(instruments[1].flagged);
        assert!(instruments[1].industry.is_none());

        let fundamentals = source.fetch_fundamentals(&[], range).unwrap();
        assert_eq!(fundamentals.len(), 1);

        let prices = source.fetch_prices(&[], range).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].market_cap, Some(5e9));
        assert!(prices[1].suspended);
        assert!(!prices[1].is_tradable());

        let calendar = source.fetch_calendar("XSHG", range).unwrap();
        assert_eq!(calendar.len(), 2);
    }

    #[test]
    fn test_blank_fundamental_value_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = CsvSource::new(CsvPaths::in_dir(dir.path()));
        let range = DateRange::new(date(1), date(31)).unwrap();

        let fundamentals = source.fetch_fundamentals(&[Symbol::new("B")], range).unwrap();
        assert!(fundamentals.is_empty());

        let year_end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let all = source
            .fetch_fundamentals(&[], DateRange::new(date(1), year_end).unwrap())
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.symbol == Symbol::new("A")));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(CsvPaths::in_dir(dir.path()));
        assert!(matches!(
            source.fetch_instruments(&[]),
            Err(DataError::Io(_))
        ));
    }
}
