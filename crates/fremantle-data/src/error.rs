//! Error types for data operations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data preparation.
///
/// Integrity and period errors are structural: they always reach the caller
/// and are never recovered from silently.
#[derive(Debug, Error)]
pub enum DataError {
    /// Duplicate or contradictory source records.
    #[error("Data integrity error for {symbol} ({field}) on {date}: {reason}")]
    DataIntegrity {
        /// Instrument the offending record belongs to
        symbol: String,
        /// Field name of the offending record
        field: String,
        /// Date that identifies the record (announcement or period end)
        date: NaiveDate,
        /// Human readable reason
        reason: String,
    },

    /// A fiscal period is missing, so cumulative values cannot be differenced.
    #[error(
        "Missing fiscal period for {symbol} ({field}) FY{fiscal_year}: expected Q{expected_quarter}, found Q{found_quarter}"
    )]
    MissingPeriod {
        /// Instrument symbol
        symbol: String,
        /// Field name
        field: String,
        /// Fiscal year being normalized
        fiscal_year: i32,
        /// Quarter that had to precede the found one
        expected_quarter: u8,
        /// Quarter that was actually disclosed
        found_quarter: u8,
    },

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },

    /// No calendar is available for the requested market
    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    /// A required input column is absent
    #[error("Missing column '{0}' in input data")]
    MissingColumn(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Build a [`DataError::DataIntegrity`] error.
    pub fn integrity(
        symbol: impl Into<String>,
        field: impl Into<String>,
        date: NaiveDate,
        reason: impl Into<String>,
    ) -> Self {
        Self::DataIntegrity {
            symbol: symbol.into(),
            field: field.into(),
            date,
            reason: reason.into(),
        }
    }

    /// Whether this error signals a structural problem in upstream data.
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::DataIntegrity { .. } | Self::MissingPeriod { .. })
    }
}
