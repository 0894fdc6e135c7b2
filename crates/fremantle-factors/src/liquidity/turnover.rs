//! Turnover Factor
//!
//! Daily traded value divided by market capitalization. Heavily traded stocks
//! tend to underperform, so the direction is descending.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, ratio};
use fremantle_data::Symbol;
use std::collections::BTreeMap;

/// Turnover computes traded value as a fraction of market capitalization
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnoverFactor;

impl Factor for TurnoverFactor {
    fn name(&self) -> &str {
        "liquidity_turnover"
    }

    fn description(&self) -> &str {
        "Traded value relative to market capitalization"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Liquidity
    }

    fn direction(&self) -> Direction {
        Direction::Descending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec!["amount", "market_cap"]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        inputs.map_rows(|row| ratio(row.get("amount"), row.get("market_cap")))
    }
}
