//! Backtest configuration.
//!
//! Every engine parameter is explicit; there are no defaults to fall back
//! on. Configurations are usually read from JSON:
//!
//! ```json
//! {
//!   "schedule": { "frequency": "monthly", "policy": "nearest_trading_day", "max_search_days": 10 },
//!   "scoring": {
//!     "normalization": "z_score",
//!     "clip": { "default_sigma": 3.0, "group_sigma": { "utilities": 2.5 } },
//!     "demean_by_group": false,
//!     "min_cross_section": 5
//!   },
//!   "peer_groups": "industry",
//!   "simulation": { ... },
//!   "evaluation": { "trading_days_per_year": 242.0, "risk_free_rate": 0.02 },
//!   "data": { "market": "SSE", "cumulative_fields": ["net_income"], "ttm_fields": ["net_income"] }
//! }
//! ```

use crate::error::{EngineError, Result};
use fremantle_backtest::{ScheduleConfig, SimulationConfig};
use fremantle_factors::ScorerConfig;
use fremantle_output::EvaluationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How instruments are partitioned for group-relative scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerGrouping {
    /// One cross-section per date
    None,
    /// Instrument industry from the master data
    Industry,
}

/// Data preparation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Market whose trading calendar drives the run
    pub market: String,
    /// Fields disclosed cumulatively since the fiscal year start; each gains a
    /// single-quarter `<field>_q`
    pub cumulative_fields: Vec<String>,
    /// Cumulative fields that also gain a trailing-twelve-month `<field>_ttm`
    pub ttm_fields: Vec<String>,
}

/// Complete configuration of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Rebalance scheduling
    pub schedule: ScheduleConfig,
    /// Cross-sectional scoring
    pub scoring: ScorerConfig,
    /// Peer groups used by clipping, demeaning and normalization
    pub peer_groups: PeerGrouping,
    /// Portfolio simulation
    pub simulation: SimulationConfig,
    /// Performance evaluation
    pub evaluation: EvaluationConfig,
    /// Data preparation
    pub data: DataConfig,
}

impl BacktestConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.simulation.validate()?;
        self.evaluation.validate()?;
        if self.data.market.trim().is_empty() {
            return Err(EngineError::InvalidConfig("data.market is empty".into()));
        }
        if let Some(field) = self
            .data
            .ttm_fields
            .iter()
            .find(|f| !self.data.cumulative_fields.contains(f))
        {
            return Err(EngineError::InvalidConfig(format!(
                "ttm field `{field}` is not listed in cumulative_fields"
            )));
        }
        Ok(())
    }
}
