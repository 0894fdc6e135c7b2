//! Error type of the end-to-end pipeline.

use fremantle_backtest::{ScheduleError, SimulationError};
use fremantle_data::DataError;
use fremantle_factors::FactorError;
use fremantle_output::{EvaluationError, ExportError};
use thiserror::Error;

/// Any failure of a backtest run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or inconsistent input data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Factor lookup or scoring failure.
    #[error(transparent)]
    Factor(#[from] FactorError),

    /// A rebalance date could not be placed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Simulation failure.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Evaluation failure.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Report export failure.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Configuration could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is inconsistent.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EngineError>;
