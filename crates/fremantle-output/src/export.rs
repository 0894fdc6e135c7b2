//! CSV and JSON export of performance reports.
//!
//! CSV carries the time series (one row per series and period for returns,
//! one row per rebalance date for IC); JSON carries the whole report.
//! Non-finite numbers are written as `NaN` in CSV and `null` in JSON.

use crate::report::PerformanceReport;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty" | "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// One period of one series, flattened for CSV.
#[derive(Debug, Serialize)]
struct ReturnRow {
    date: NaiveDate,
    series: String,
    net_return: f64,
    nav: f64,
    turnover: f64,
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

impl PerformanceReport {
    /// Bucket and spread returns as CSV, one row per series and period.
    pub fn returns_csv(&self) -> Result<String, ExportError> {
        to_csv(self.series().flat_map(|s| {
            s.periods.iter().map(|p| ReturnRow {
                date: p.date,
                series: s.label.to_string(),
                net_return: p.net_return,
                nav: p.nav,
                turnover: p.turnover,
            })
        }))
    }

    /// IC series as CSV.
    pub fn ic_csv(&self) -> Result<String, ExportError> {
        to_csv(&self.ic)
    }
}

impl Exporter for PerformanceReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.returns_csv(),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Write `report` into `dir`, creating it if needed.
///
/// CSV writes `returns.csv` and `ic.csv`; JSON writes `report.json`. A
/// Markdown `summary.md` is written in every case. Returns the files written.
pub fn write_report(
    report: &PerformanceReport,
    dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    match format {
        ExportFormat::Csv => {
            let returns = dir.join("returns.csv");
            report.export_to_file(&returns, format)?;
            let ic = dir.join("ic.csv");
            fs::write(&ic, report.ic_csv()?)?;
            written.extend([returns, ic]);
        }
        ExportFormat::Json | ExportFormat::PrettyJson => {
            let path = dir.join(format!("report.{}", format.extension()));
            report.export_to_file(&path, format)?;
            written.push(path);
        }
    }
    let md = dir.join("summary.md");
    fs::write(&md, report.to_markdown())?;
    written.push(md);
    info!(dir = %dir.display(), files = written.len(), "wrote report");
    Ok(written)
}
