//! The performance report produced by a backtest.

use chrono::{DateTime, NaiveDate, Utc};
use fremantle_backtest::SkippedEvent;
use fremantle_data::Symbol;
use fremantle_factors::{Direction, InsufficientCrossSection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which return series a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum SeriesLabel {
    /// Bucket by index, 0 is least favoured
    Bucket(usize),
    /// Most favoured bucket minus least favoured
    Spread,
}

impl fmt::Display for SeriesLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(i) => write!(f, "bucket_{i}"),
            Self::Spread => f.write_str("spread"),
        }
    }
}

/// One rebalance period of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    /// Rebalance date
    pub date: NaiveDate,
    /// Net return over the holding period, NaN when nothing resolved
    pub net_return: f64,
    /// NAV after this period
    pub nav: f64,
    /// Membership turnover against the previous period
    pub turnover: f64,
}

/// Summary statistics of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Rebalance periods in the series
    pub periods: usize,
    /// Periods with a NaN return, skipped in compounding
    pub missing_periods: usize,
    /// Compounded return
    pub cumulative_return: f64,
    /// Compound annual growth rate
    pub annualized_return: f64,
    /// Annualized standard deviation of period returns
    pub annualized_volatility: f64,
    /// Excess annualized mean over annualized volatility
    pub sharpe: f64,
    /// Worst peak-to-trough NAV decline, zero or negative
    pub max_drawdown: f64,
    /// Mean turnover over the periods where it is defined
    pub mean_turnover: f64,
}

/// A labelled return series and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    /// Series label
    pub label: SeriesLabel,
    /// Periods in date order
    pub periods: Vec<PeriodReturn>,
    /// Statistics
    pub stats: SeriesStats,
}

impl ReturnSeries {
    /// Period returns in date order.
    pub fn returns(&self) -> Vec<f64> {
        self.periods.iter().map(|p| p.net_return).collect()
    }
}

/// Rank IC of one rebalance date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcPoint {
    /// Rebalance date
    pub date: NaiveDate,
    /// Spearman correlation of score and forward return
    pub ic: f64,
    /// Finite (score, return) pairs used
    pub pairs: usize,
}

/// IC statistics across rebalance dates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// Dates with a defined IC
    pub observations: usize,
    /// Mean IC
    pub mean: f64,
    /// Sample standard deviation of IC
    pub std: f64,
    /// `mean / std`
    pub icir: f64,
    /// Share of defined ICs above zero
    pub hit_rate: f64,
}

/// An instrument that was force-exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedExit {
    /// Rebalance date
    pub rebalance_date: NaiveDate,
    /// Instrument
    pub symbol: Symbol,
    /// Bucket index
    pub bucket: usize,
    /// Target exit date
    pub exit_target: NaiveDate,
    /// Date actually used for the exit price
    pub exit_date: NaiveDate,
}

/// A bucketed instrument that never traded during its holding window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolved {
    /// Rebalance date
    pub rebalance_date: NaiveDate,
    /// Instrument
    pub symbol: Symbol,
    /// Bucket index
    pub bucket: Option<usize>,
}

/// Where the data was thin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    /// Rebalances that produced no event
    pub skipped: Vec<SkippedEvent>,
    /// Trades exited at the last tradable close
    pub forced_exits: Vec<ForcedExit>,
    /// Bucket members left out of the bucket return
    pub unresolved: Vec<Unresolved>,
    /// Cross-sections too small to score
    pub insufficient: Vec<InsufficientCrossSection>,
}

impl AuditTrail {
    /// Whether nothing was recorded.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.forced_exits.is_empty()
            && self.unresolved.is_empty()
            && self.insufficient.is_empty()
    }
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Factor name
    pub factor: String,
    /// Factor direction
    pub direction: Direction,
    /// Number of buckets
    pub n_buckets: usize,
    /// Holding period in trading days
    pub holding_period_days: usize,
    /// Rebalance periods per year used for annualization
    pub periods_per_year: f64,
    /// Annual risk-free rate
    pub risk_free_rate: f64,
    /// First rebalance date
    pub first_date: Option<NaiveDate>,
    /// Last rebalance date
    pub last_date: Option<NaiveDate>,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
}

/// Output of [`crate::PerformanceEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Metadata
    pub meta: ReportMeta,
    /// One series per bucket in index order
    pub buckets: Vec<ReturnSeries>,
    /// Top minus bottom bucket
    pub spread: ReturnSeries,
    /// Rank IC per rebalance date
    pub ic: Vec<IcPoint>,
    /// IC statistics
    pub ic_summary: IcSummary,
    /// Skipped events, forced exits and thin cross-sections
    pub audit: AuditTrail,
}

impl PerformanceReport {
    /// Series of bucket `index`.
    pub fn bucket(&self, index: usize) -> Option<&ReturnSeries> {
        self.buckets.get(index)
    }

    /// Buckets followed by the spread.
    pub fn series(&self) -> impl Iterator<Item = &ReturnSeries> + '_ {
        self.buckets.iter().chain(std::iter::once(&self.spread))
    }

    /// Number of rebalance periods evaluated.
    pub fn periods(&self) -> usize {
        self.ic.len()
    }
}
