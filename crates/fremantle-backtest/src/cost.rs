//! Transaction cost model.

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};

/// Proportional trading costs, as fractions of traded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Brokerage commission, charged on both buy and sell
    pub commission_rate: f64,
    /// Stamp tax, charged on the sell side only
    pub stamp_tax_rate: f64,
    /// Slippage, charged on both buy and sell
    pub slippage_rate: f64,
}

impl CostModel {
    /// Total cost of buying and later selling, as a return deduction.
    pub fn round_trip(&self) -> f64 {
        2.0 * self.commission_rate + self.stamp_tax_rate + 2.0 * self.slippage_rate
    }

    /// Reject negative or non-finite rates.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("commission_rate", self.commission_rate),
            ("stamp_tax_rate", self.stamp_tax_rate),
            ("slippage_rate", self.slippage_rate),
        ];
        match rates.iter().find(|(_, r)| !(r.is_finite() && *r >= 0.0)) {
            Some((name, rate)) => Err(SimulationError::InvalidConfig(format!(
                "{name} must be a non-negative number, got {rate}"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip() {
        let costs = CostModel {
            commission_rate: 0.0003,
            stamp_tax_rate: 0.001,
            slippage_rate: 0.0005,
        };
        assert_relative_eq!(costs.round_trip(), 0.0026);
        assert!(costs.validate().is_ok());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let costs = CostModel {
            commission_rate: 0.0003,
            stamp_tax_rate: -0.001,
            slippage_rate: 0.0,
        };
        assert!(matches!(costs.validate(), Err(SimulationError::InvalidConfig(_))));
    }
}
