//! Error types for scheduling and simulation.

use crate::event::EventStage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// A rebalance anchor that could not be placed on a trading day.
///
/// Scheduling errors abort only the affected event; the run records them as
/// skipped and continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScheduleError {
    /// No trading day within the search window around the anchor
    #[error("No trading day within {window_days} days of {target}")]
    NoTradingDay {
        /// Calendar anchor (week or month end)
        target: NaiveDate,
        /// Search window in calendar days
        window_days: u32,
    },
}

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Invalid simulation parameters
    #[error("Invalid simulation configuration: {0}")]
    InvalidConfig(String),

    /// An event was moved to a stage that does not follow its current one
    #[error("Invalid event transition from {from} to {to}")]
    InvalidTransition {
        /// Current stage
        from: EventStage,
        /// Requested stage
        to: EventStage,
    },

    /// A scheduled date is not in the trading calendar
    #[error("Rebalance date {0} is not a trading day")]
    UnknownRebalanceDate(NaiveDate),
}
