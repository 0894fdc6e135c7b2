//! Factor Registry
//!
//! Central registry for all available factors. Allows dynamic factor lookup
//! by name. Names of the form `raw:<field>` or `raw:<field>:desc` resolve to a
//! [`RawFieldFactor`] without registration.

use crate::error::{FactorError, Result};
use crate::liquidity::TurnoverFactor;
use crate::quality::{LeverageFactor, RoeFactor};
use crate::raw::RawFieldFactor;
use crate::size::LogMarketCapFactor;
use crate::traits::{Direction, Factor};
use crate::value::{BookToPriceFactor, EarningsYieldFactor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    /// Value factors (book-to-price, earnings yield)
    Value,
    /// Size factors (market capitalization)
    Size,
    /// Quality factors (ROE, leverage)
    Quality,
    /// Liquidity factors (turnover)
    Liquidity,
    /// User supplied or raw-field factors
    Custom,
}

impl fmt::Display for FactorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value => "value",
            Self::Size => "size",
            Self::Quality => "quality",
            Self::Liquidity => "liquidity",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Factor metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorInfo {
    /// Factor name (unique identifier)
    pub name: String,
    /// Factor category
    pub category: FactorCategory,
    /// Brief description of what the factor measures
    pub description: String,
    /// Favoured end of the score distribution
    pub direction: Direction,
    /// Input fields the factor reads
    pub required_fields: Vec<String>,
}

impl FactorInfo {
    /// Describe a factor instance.
    pub fn of(factor: &dyn Factor) -> Self {
        Self {
            name: factor.name().to_string(),
            category: factor.category(),
            description: factor.description().to_string(),
            direction: factor.direction(),
            required_fields: factor
                .required_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Name-indexed collection of factors.
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    factors: BTreeMap<String, Arc<dyn Factor>>,
}

impl FactorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in factor with its default configuration.
    pub fn with_builtins() -> Self {
        let builtins: [Arc<dyn Factor>; 6] = [
            Arc::new(BookToPriceFactor::default()),
            Arc::new(EarningsYieldFactor::default()),
            Arc::new(RoeFactor::default()),
            Arc::new(LeverageFactor::default()),
            Arc::new(LogMarketCapFactor::default()),
            Arc::new(TurnoverFactor),
        ];
        Self {
            factors: builtins
                .into_iter()
                .map(|f| (f.name().to_string(), f))
                .collect(),
        }
    }

    /// Add a factor; names must be unique.
    pub fn register(&mut self, factor: Arc<dyn Factor>) -> Result<()> {
        let name = factor.name().to_string();
        if self.factors.contains_key(&name) {
            return Err(FactorError::InvalidConfig(format!(
                "factor '{name}' is already registered"
            )));
        }
        self.factors.insert(name, factor);
        Ok(())
    }

    /// Look up a factor by name, resolving `raw:` names on the fly.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Factor>> {
        if let Some(factor) = self.factors.get(name) {
            return Ok(Arc::clone(factor));
        }
        if let Some(descriptor) = name.strip_prefix("raw:") {
            return parse_raw(descriptor).map(|f| Arc::new(f) as Arc<dyn Factor>);
        }
        Err(FactorError::UnknownFactor(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factors.keys().map(String::as_str).collect()
    }

    /// Metadata of every registered factor.
    pub fn infos(&self) -> Vec<FactorInfo> {
        self.factors.values().map(|f| FactorInfo::of(f.as_ref())).collect()
    }

    /// Metadata of the registered factors in one category.
    pub fn by_category(&self, category: FactorCategory) -> Vec<FactorInfo> {
        self.infos()
            .into_iter()
            .filter(|f| f.category == category)
            .collect()
    }

    /// Number of registered factors per category.
    pub fn count_by_category(&self) -> BTreeMap<FactorCategory, usize> {
        let mut counts = BTreeMap::new();
        for factor in self.factors.values() {
            *counts.entry(factor.category()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of registered factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

fn parse_raw(descriptor: &str) -> Result<RawFieldFactor> {
    let (field, direction) = match descriptor.rsplit_once(':') {
        Some((field, "asc")) => (field, Direction::Ascending),
        Some((field, "desc")) => (field, Direction::Descending),
        Some((_, other)) => {
            return Err(FactorError::InvalidConfig(format!(
                "unknown direction '{other}' in raw factor, expected asc or desc"
            )));
        }
        None => (descriptor, Direction::Ascending),
    };
    if field.is_empty() {
        return Err(FactorError::InvalidConfig(
            "raw factor needs a field name".to_string(),
        ));
    }
    Ok(RawFieldFactor::new(field, direction))
}

/// Get all built-in factor info
pub fn available_factors() -> Vec<FactorInfo> {
    FactorRegistry::with_builtins().infos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_factors() {
        let factors = available_factors();
        assert_eq!(factors.len(), 6);
        assert!(factors.iter().any(|f| f.name == "book_to_price"));
    }

    #[test]
    fn test_factor_names_unique() {
        let registry = FactorRegistry::with_builtins();
        let mut names = registry.names();
        names.dedup();
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = FactorRegistry::with_builtins();
        let err = registry.register(Arc::new(RoeFactor::default()));
        assert!(matches!(err, Err(FactorError::InvalidConfig(_))));
        registry
            .register(Arc::new(RawFieldFactor::new("signal", Direction::Ascending)))
            .unwrap();
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_by_category() {
        let registry = FactorRegistry::with_builtins();
        let quality = registry.by_category(FactorCategory::Quality);
        assert_eq!(quality.len(), 2);
        assert!(quality.iter().all(|f| f.category == FactorCategory::Quality));

        let counts = registry.count_by_category();
        assert_eq!(counts[&FactorCategory::Value], 2);
        assert_eq!(counts[&FactorCategory::Size], 1);
        assert!(!counts.contains_key(&FactorCategory::Custom));
    }

    #[test]
    fn test_get() {
        let registry = FactorRegistry::with_builtins();
        assert_eq!(registry.get("leverage").unwrap().direction(), Direction::Descending);
        assert!(matches!(
            registry.get("momentum"),
            Err(FactorError::UnknownFactor(_))
        ));
    }

    #[test]
    fn test_raw_names() {
        let registry = FactorRegistry::new();
        let f = registry.get("raw:pe_ttm:desc").unwrap();
        assert_eq!(f.required_fields(), vec!["pe_ttm"]);
        assert_eq!(f.direction(), Direction::Descending);

        assert_eq!(registry.get("raw:close").unwrap().direction(), Direction::Ascending);
        assert!(registry.get("raw:close:sideways").is_err());
        assert!(registry.get("raw:").is_err());
    }

    #[test]
    fn test_info_serializes() {
        let info = FactorInfo::of(&LeverageFactor::default());
        assert_eq!(info.direction, Direction::Descending);
        assert_eq!(info.category.to_string(), "quality");
        assert_eq!(info.required_fields, vec!["total_debt", "shareholders_equity"]);
    }
}
