//! Log Market Capitalization Factor
//!
//! Measures company size using the natural logarithm of market capitalization.
//! The size premium favours smaller companies, so the direction is descending.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the LogMarketCap factor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogMarketCapConfig {
    /// Market caps below this are scored NaN (default: None)
    pub min_market_cap: Option<f64>,
}

/// LogMarketCap computes company size using natural logarithm of market capitalization
#[derive(Debug, Default)]
pub struct LogMarketCapFactor {
    config: LogMarketCapConfig,
}

impl LogMarketCapFactor {
    /// Create the factor with an explicit configuration.
    pub const fn with_config(config: LogMarketCapConfig) -> Self {
        Self { config }
    }
}

impl Factor for LogMarketCapFactor {
    fn name(&self) -> &str {
        "log_market_cap"
    }

    fn description(&self) -> &str {
        "Natural logarithm of market capitalization"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Size
    }

    fn direction(&self) -> Direction {
        Direction::Descending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec!["market_cap"]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        let floor = self.config.min_market_cap.unwrap_or(0.0);
        inputs.map_rows(|row| match row.get("market_cap") {
            Some(cap) if cap > 0.0 && cap >= floor => cap.ln(),
            _ => f64::NAN,
        })
    }
}
