//! Earnings Yield Factor
//!
//! Trailing earnings divided by market capitalization, the inverse of P/E.
//! Loss-making firms keep their negative yield.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, ratio};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the earnings yield factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsYieldConfig {
    /// Use trailing twelve month earnings; otherwise the latest quarter
    /// annualized (default: true)
    pub use_ttm: bool,
}

impl Default for EarningsYieldConfig {
    fn default() -> Self {
        Self { use_ttm: true }
    }
}

/// Earnings over market capitalization
#[derive(Debug, Default)]
pub struct EarningsYieldFactor {
    config: EarningsYieldConfig,
}

impl EarningsYieldFactor {
    /// Create the factor with an explicit configuration.
    pub const fn with_config(config: EarningsYieldConfig) -> Self {
        Self { config }
    }

    const fn earnings_field(&self) -> &'static str {
        if self.config.use_ttm {
            "net_income_ttm"
        } else {
            "net_income_q"
        }
    }
}

impl Factor for EarningsYieldFactor {
    fn name(&self) -> &str {
        "earnings_yield"
    }

    fn description(&self) -> &str {
        "Earnings to market capitalization ratio (inverse of P/E)"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Value
    }

    fn direction(&self) -> Direction {
        Direction::Ascending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec![self.earnings_field(), "market_cap"]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        let scale = if self.config.use_ttm { 1.0 } else { 4.0 };
        inputs.map_rows(|row| {
            let earnings = row.get(self.earnings_field()).map(|e| e * scale);
            ratio(earnings, row.get("market_cap"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FactorInputs;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_factor_name() {
        assert_eq!(EarningsYieldFactor::default().name(), "earnings_yield");
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(
            EarningsYieldFactor::default().required_fields(),
            vec!["net_income_ttm", "market_cap"]
        );
        let quarterly = EarningsYieldFactor::with_config(EarningsYieldConfig { use_ttm: false });
        assert_eq!(quarterly.required_fields()[0], "net_income_q");
    }

    #[test]
    fn test_quarterly_is_annualized() {
        let factor = EarningsYieldFactor::with_config(EarningsYieldConfig { use_ttm: false });
        let xs = CrossSection::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            vec![
                FactorInputs::new("A", [("net_income_q", Some(2.5)), ("market_cap", Some(100.0))]),
                FactorInputs::new("B", [("net_income_q", Some(-1.0)), ("market_cap", Some(100.0))]),
            ],
        );
        let scores = factor.compute(&xs);
        assert_relative_eq!(scores[&Symbol::new("A")], 0.1);
        assert_relative_eq!(scores[&Symbol::new("B")], -0.04);
    }
}
