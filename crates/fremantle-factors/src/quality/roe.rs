//! Return on Equity (ROE) Factor
//!
//! Measures profitability relative to shareholder equity. Higher ROE indicates
//! more efficient use of equity capital and better fundamental quality.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, ratio};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the Roe factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoeConfig {
    /// Use trailing twelve months (default: true)
    pub use_ttm: bool,
    /// Field holding shareholders' equity (default: "shareholders_equity")
    pub equity_field: String,
}

impl Default for RoeConfig {
    fn default() -> Self {
        Self {
            use_ttm: true,
            equity_field: "shareholders_equity".to_string(),
        }
    }
}

/// Roe computes return on equity as net income divided by shareholders equity
#[derive(Debug, Default)]
pub struct RoeFactor {
    config: RoeConfig,
}

impl RoeFactor {
    /// Create the factor with an explicit configuration.
    pub const fn with_config(config: RoeConfig) -> Self {
        Self { config }
    }

    const fn income_field(&self) -> &'static str {
        if self.config.use_ttm {
            "net_income_ttm"
        } else {
            "net_income_q"
        }
    }
}

impl Factor for RoeFactor {
    fn name(&self) -> &str {
        "roe"
    }

    fn description(&self) -> &str {
        "Return on equity - profitability measure"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Quality
    }

    fn direction(&self) -> Direction {
        Direction::Ascending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec![self.income_field(), self.config.equity_field.as_str()]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        let scale = if self.config.use_ttm { 1.0 } else { 4.0 };
        // Negative equity makes the ratio meaningless, ratio() returns NaN.
        inputs.map_rows(|row| {
            ratio(
                row.get(self.income_field()).map(|v| v * scale),
                row.get(&self.config.equity_field),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FactorInputs;
    use chrono::NaiveDate;

    #[test]
    fn test_factor_name() {
        let factor = RoeFactor::default();
        assert_eq!(factor.name(), "roe");
        assert_eq!(factor.category(), FactorCategory::Quality);
    }

    #[test]
    fn test_required_fields() {
        let factor = RoeFactor::default();
        assert_eq!(
            factor.required_fields(),
            vec!["net_income_ttm", "shareholders_equity"]
        );
    }

    #[test]
    fn test_negative_equity_is_nan() {
        let xs = CrossSection::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            vec![
                FactorInputs::new(
                    "A",
                    [("net_income_ttm", Some(15.0)), ("shareholders_equity", Some(100.0))],
                ),
                FactorInputs::new(
                    "B",
                    [("net_income_ttm", Some(15.0)), ("shareholders_equity", Some(-10.0))],
                ),
            ],
        );
        let scores = RoeFactor::default().compute(&xs);
        assert_eq!(scores[&Symbol::new("A")], 0.15);
        assert!(scores[&Symbol::new("B")].is_nan());
    }
}
