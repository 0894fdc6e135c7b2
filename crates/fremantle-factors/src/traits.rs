//! Factor plugin contract.
//!
//! A factor sees one trading date at a time. Its inputs are restricted to the
//! fields it declares, resolved from the aligned observations into a
//! [`CrossSection`]; an unknown value stays `None` unless the factor asks for
//! a default through its [`NullPolicy`].

use crate::error::{FactorError, Result};
use crate::registry::FactorCategory;
use chrono::NaiveDate;
use fremantle_data::{DailyObservation, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Version of the input layout handed to [`Factor::compute`].
pub const INPUT_SCHEMA_VERSION: u32 = 1;

/// Which end of the score distribution is favoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger scores are better
    Ascending,
    /// Smaller scores are better
    Descending,
}

impl Direction {
    /// Whether larger scores are better.
    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

/// How a factor wants unknown inputs presented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Unknown inputs stay `None`; the factor yields NaN for that instrument
    Propagate,
    /// Unknown inputs are replaced with the given value before `compute`
    Default(f64),
}

/// The declared inputs of one instrument on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorInputs {
    symbol: Symbol,
    values: BTreeMap<String, Option<f64>>,
}

impl FactorInputs {
    /// Build inputs directly, mostly for tests of factor formulas.
    pub fn new<'a>(
        symbol: impl Into<Symbol>,
        values: impl IntoIterator<Item = (&'a str, Option<f64>)>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            values: values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Instrument the inputs belong to.
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Value of a declared field; `None` when unknown or not declared.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }
}

/// All instruments' declared inputs on one trading date.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    date: NaiveDate,
    schema_version: u32,
    rows: Vec<FactorInputs>,
}

impl CrossSection {
    /// Assemble a cross-section from rows built elsewhere.
    pub const fn new(date: NaiveDate, rows: Vec<FactorInputs>) -> Self {
        Self {
            date,
            schema_version: INPUT_SCHEMA_VERSION,
            rows,
        }
    }

    /// Project one date's observations onto the fields `factor` declares.
    ///
    /// A declared field missing from the observation schema is a
    /// [`FactorError::MissingField`]; a field that exists but has no value
    /// yet is passed as `None` (or the factor's default).
    pub fn for_factor(
        factor: &dyn Factor,
        date: NaiveDate,
        observations: &[DailyObservation],
    ) -> Result<Self> {
        let fields = factor.required_fields();
        let policy = factor.null_policy();
        let mut rows = Vec::with_capacity(observations.len());
        for obs in observations {
            let mut values = BTreeMap::new();
            for field in &fields {
                if !obs.has_field(field) {
                    return Err(FactorError::MissingField {
                        factor: factor.name().to_string(),
                        field: (*field).to_string(),
                    });
                }
                let value = match (obs.value(field), policy) {
                    (Some(v), _) => Some(v),
                    (None, NullPolicy::Default(d)) => Some(d),
                    (None, NullPolicy::Propagate) => None,
                };
                values.insert((*field).to_string(), value);
            }
            rows.push(FactorInputs {
                symbol: obs.symbol.clone(),
                values,
            });
        }
        Ok(Self::new(date, rows))
    }

    /// Trading date of the cross-section.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Input layout version.
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// One row per instrument.
    pub fn rows(&self) -> &[FactorInputs] {
        &self.rows
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the cross-section is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply `f` to every row, collecting one raw score per instrument.
    pub fn map_rows(&self, f: impl Fn(&FactorInputs) -> f64) -> BTreeMap<Symbol, f64> {
        self.rows
            .iter()
            .map(|row| (row.symbol.clone(), f(row)))
            .collect()
    }
}

/// A factor formula evaluated on one date's cross-section.
///
/// Implementations must be pure: the output for a date may depend only on
/// the cross-section passed in. Instruments whose inputs fail a precondition
/// get `f64::NAN`, never zero.
pub trait Factor: Send + Sync + fmt::Debug {
    /// Unique name of the factor.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Broad family the factor belongs to.
    fn category(&self) -> FactorCategory;

    /// Which end of the score distribution is favoured.
    fn direction(&self) -> Direction;

    /// Input fields the factor reads.
    fn required_fields(&self) -> Vec<&str>;

    /// Treatment of unknown inputs.
    fn null_policy(&self) -> NullPolicy {
        NullPolicy::Propagate
    }

    /// Raw score per instrument.
    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64>;
}

/// `numerator / denominator`, NaN unless both are known and the denominator
/// is strictly positive.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 && n.is_finite() && d.is_finite() => n / d,
        _ => f64::NAN,
    }
}
