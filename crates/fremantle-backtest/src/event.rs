//! Rebalance event lifecycle and the records it produces.

use crate::error::{Result, SimulationError};
use crate::universe::FilterReason;
use chrono::NaiveDate;
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of a rebalance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStage {
    /// Date fixed by the scheduler
    Scheduled,
    /// Base filters applied
    UniverseFiltered,
    /// Universe split into buckets
    Bucketed,
    /// Trades opened
    Held,
    /// Every trade resolved; immutable from here on
    Closed,
}

impl EventStage {
    /// The only stage that may follow this one.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Scheduled => Some(Self::UniverseFiltered),
            Self::UniverseFiltered => Some(Self::Bucketed),
            Self::Bucketed => Some(Self::Held),
            Self::Held => Some(Self::Closed),
            Self::Closed => None,
        }
    }
}

impl fmt::Display for EventStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::UniverseFiltered => "universe_filtered",
            Self::Bucketed => "bucketed",
            Self::Held => "held",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Guard that only moves forward one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    stage: EventStage,
}

impl Lifecycle {
    /// Start at [`EventStage::Scheduled`].
    pub const fn new() -> Self {
        Self {
            stage: EventStage::Scheduled,
        }
    }

    /// Current stage.
    pub const fn stage(&self) -> EventStage {
        self.stage
    }

    /// Move to `to`, which must directly follow the current stage.
    pub fn advance(&mut self, to: EventStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(SimulationError::InvalidTransition {
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Annotation on a resolved trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeFlag {
    /// Entered after the rebalance date because it was untradable
    DelayedEntry,
    /// Exited after the target date within the slippage bound
    DelayedExit,
    /// No tradable exit within the bound; exited at the last tradable close
    ForcedExit,
}

/// One instrument's round trip inside a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument
    pub symbol: Symbol,
    /// Bucket index
    pub bucket: usize,
    /// Score on the rebalance date
    pub score: f64,
    /// Entry date
    pub entry_date: NaiveDate,
    /// Entry price
    pub entry_price: f64,
    /// Exit date
    pub exit_date: NaiveDate,
    /// Exit price
    pub exit_price: f64,
    /// (exit - entry) / entry
    pub gross_return: f64,
    /// Gross return less round-trip cost
    pub net_return: f64,
    /// Weight inside the bucket
    pub weight: f64,
    /// Annotations
    pub flags: Vec<TradeFlag>,
}

impl Trade {
    /// Whether the trade carries `flag`.
    pub fn has(&self, flag: TradeFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Why an instrument on the rebalance date is not in any bucket return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum ExclusionReason {
    /// Removed by the universe filter
    Filtered(FilterReason),
    /// Score missing or NaN
    NoScore,
    /// Bucketed, but no tradable entry day within the holding window
    Unresolved,
}

/// An instrument left out of the bucket returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Instrument
    pub symbol: Symbol,
    /// Bucket it was assigned to, if it got that far
    pub bucket: Option<usize>,
    /// Reason
    pub reason: ExclusionReason,
}

/// Members and realized return of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketOutcome {
    /// Bucket index, 0 is least favoured
    pub index: usize,
    /// Every instrument assigned to the bucket
    pub members: Vec<Symbol>,
    /// Resolved trades
    pub trades: Vec<Trade>,
    /// Weighted mean net return; NaN with no resolved trade
    pub net_return: f64,
}

/// A fully resolved rebalance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedEvent {
    /// Rebalance date
    pub date: NaiveDate,
    /// Target exit date (holding period end)
    pub exit_target: NaiveDate,
    /// Filtered universe with finite scores
    pub universe: Vec<Symbol>,
    /// Buckets in index order
    pub buckets: Vec<BucketOutcome>,
    /// Top bucket return minus bottom bucket return
    pub spread_return: f64,
    /// Instruments not contributing to any bucket return
    pub exclusions: Vec<Exclusion>,
}

impl ClosedEvent {
    /// Resolved trades across all buckets.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> + '_ {
        self.buckets.iter().flat_map(|b| b.trades.iter())
    }

    /// Trades that had to be force-exited.
    pub fn forced_exits(&self) -> impl Iterator<Item = &Trade> + '_ {
        self.trades().filter(|t| t.has(TradeFlag::ForcedExit))
    }

    /// Net return of bucket `index`.
    pub fn bucket_return(&self, index: usize) -> f64 {
        self.buckets.get(index).map_or(f64::NAN, |b| b.net_return)
    }
}

/// Why a scheduled rebalance produced no event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    /// No trading day near the anchor
    NoTradingDay {
        /// Search window in calendar days
        window_days: u32,
    },
    /// The holding period ends beyond the available calendar
    InsufficientHistory,
}

/// A rebalance that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEvent {
    /// Anchor or rebalance date
    pub date: NaiveDate,
    /// Reason
    pub reason: SkipReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_in_order() {
        let mut life = Lifecycle::new();
        for stage in [
            EventStage::UniverseFiltered,
            EventStage::Bucketed,
            EventStage::Held,
            EventStage::Closed,
        ] {
            life.advance(stage).unwrap();
        }
        assert_eq!(life.stage(), EventStage::Closed);
    }

    #[test]
    fn test_closed_is_final() {
        let mut life = Lifecycle::new();
        assert!(matches!(
            life.advance(EventStage::Held),
            Err(SimulationError::InvalidTransition {
                from: EventStage::Scheduled,
                to: EventStage::Held
            })
        ));
        for stage in [
            EventStage::UniverseFiltered,
            EventStage::Bucketed,
            EventStage::Held,
            EventStage::Closed,
        ] {
            life.advance(stage).unwrap();
        }
        assert!(life.advance(EventStage::Closed).is_err());
        assert!(life.advance(EventStage::Scheduled).is_err());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(EventStage::UniverseFiltered.to_string(), "universe_filtered");
    }
}
