//! Leverage Factor
//!
//! Debt-to-equity ratio. Lower leverage is treated as higher quality, so the
//! factor declares a descending direction.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, ratio};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the Leverage factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageConfig {
    /// Field holding total debt (default: "total_debt")
    pub debt_field: String,
    /// Field holding shareholders' equity (default: "shareholders_equity")
    pub equity_field: String,
}

impl Default for LeverageConfig {
    fn default() -> Self {
        Self {
            debt_field: "total_debt".to_string(),
            equity_field: "shareholders_equity".to_string(),
        }
    }
}

/// Leverage computes total debt over shareholders equity
#[derive(Debug, Default)]
pub struct LeverageFactor {
    config: LeverageConfig,
}

impl LeverageFactor {
    /// Create the factor with an explicit configuration.
    pub const fn with_config(config: LeverageConfig) -> Self {
        Self { config }
    }
}

impl Factor for LeverageFactor {
    fn name(&self) -> &str {
        "leverage"
    }

    fn description(&self) -> &str {
        "Financial leverage - debt-to-equity ratio"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Quality
    }

    fn direction(&self) -> Direction {
        Direction::Descending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec![
            self.config.debt_field.as_str(),
            self.config.equity_field.as_str(),
        ]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        inputs.map_rows(|row| {
            ratio(
                row.get(&self.config.debt_field),
                row.get(&self.config.equity_field),
            )
        })
    }
}
