//! Score instruments directly by one input field.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, NullPolicy};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Uses a single named field as the raw score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFieldFactor {
    name: String,
    field: String,
    direction: Direction,
    null_policy: NullPolicy,
}

impl RawFieldFactor {
    /// Score by `field`, favouring the end given by `direction`.
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        let field = field.into();
        Self {
            name: format!("raw:{field}"),
            field,
            direction,
            null_policy: NullPolicy::Propagate,
        }
    }

    /// Replace unknown values with `value` instead of scoring them NaN.
    pub fn with_default(mut self, value: f64) -> Self {
        self.null_policy = NullPolicy::Default(value);
        self
    }

    /// The scored field.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Factor for RawFieldFactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Raw value of a single input field"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Custom
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn required_fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }

    fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        inputs.map_rows(|row| {
            row.get(&self.field)
                .filter(|v| v.is_finite())
                .unwrap_or(f64::NAN)
        })
    }
}
