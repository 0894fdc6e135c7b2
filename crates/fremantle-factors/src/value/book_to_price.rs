//! Book-to-Price Factor
//!
//! Book value of equity divided by market capitalization. Higher values
//! indicate a cheaper stock relative to its accounting net worth.

use crate::registry::FactorCategory;
use crate::traits::{CrossSection, Direction, Factor, ratio};
use fremantle_data::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for the book-to-price factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookToPriceConfig {
    /// Field holding book value of equity (default: "book_value")
    pub book_field: String,
    /// Score negative book value as NaN instead of a negative ratio (default: true)
    pub exclude_negative_book: bool,
}

impl Default for BookToPriceConfig {
    fn default() -> Self {
        Self {
            book_field: "book_value".to_string(),
            exclude_negative_book: true,
        }
    }
}

/// Book value over market capitalization
#[derive(Debug, Default)]
pub struct BookToPriceFactor {
    config: BookToPriceConfig,
}

impl BookToPriceFactor {
    /// Create the factor with an explicit configuration.
    pub const fn with_config(config: BookToPriceConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &BookToPriceConfig {
        &self.config
    }
}

impl Factor for BookToPriceFactor {
    fn name(&self) -> &str {
        "book_to_price"
    }

    fn description(&self) -> &str {
        "Book value to market capitalization ratio"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Value
    }

    fn direction(&self) -> Direction {
        Direction::Ascending
    }

    fn required_fields(&self) -> Vec<&str> {
        vec![self.config.book_field.as_str(), "market_cap"]
    }

    fn compute(&self, inputs: &CrossSection) -> BTreeMap<Symbol, f64> {
        inputs.map_rows(|row| {
            let book = row.get(&self.config.book_field);
            if self.config.exclude_negative_book && book.is_some_and(|b| b < 0.0) {
                return f64::NAN;
            }
            ratio(book, row.get("market_cap"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FactorInputs;
    use chrono::NaiveDate;

    fn section(rows: Vec<FactorInputs>) -> CrossSection {
        CrossSection::new(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(), rows)
    }

    #[test]
    fn test_factor_name() {
        let factor = BookToPriceFactor::default();
        assert_eq!(factor.name(), "book_to_price");
        assert_eq!(factor.direction(), Direction::Ascending);
    }

    #[test]
    fn test_required_fields() {
        let factor = BookToPriceFactor::default();
        assert_eq!(factor.required_fields(), vec!["book_value", "market_cap"]);
    }

    #[test]
    fn test_compute() {
        let xs = section(vec![
            FactorInputs::new("A", [("book_value", Some(50.0)), ("market_cap", Some(100.0))]),
            FactorInputs::new("B", [("book_value", Some(-5.0)), ("market_cap", Some(100.0))]),
            FactorInputs::new("C", [("book_value", None), ("market_cap", Some(100.0))]),
            FactorInputs::new("D", [("book_value", Some(5.0)), ("market_cap", Some(0.0))]),
        ]);
        let scores = BookToPriceFactor::default().compute(&xs);
        assert_eq!(scores[&Symbol::new("A")], 0.5);
        assert!(scores[&Symbol::new("B")].is_nan());
        assert!(scores[&Symbol::new("C")].is_nan());
        assert!(scores[&Symbol::new("D")].is_nan());
    }

    #[test]
    fn test_negative_book_allowed() {
        let factor = BookToPriceFactor::with_config(BookToPriceConfig {
            exclude_negative_book: false,
            ..Default::default()
        });
        let xs = section(vec![FactorInputs::new(
            "B",
            [("book_value", Some(-5.0)), ("market_cap", Some(100.0))],
        )]);
        assert_eq!(factor.compute(&xs)[&Symbol::new("B")], -0.05);
    }
}
