//! Daily observations and the flat panel that indexes them.

use crate::types::{PRICE_FIELDS, PriceBar, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// A forward-filled fundamental value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalValue {
    /// The value
    pub value: f64,
    /// Announcement date of the record the value came from
    pub announced: NaiveDate,
    /// Fiscal period end of that record
    pub period_end: NaiveDate,
}

/// Everything known about one instrument on one trading date.
///
/// A fundamental field mapped to `None` was not yet announced on `date`;
/// that is "unknown", which is distinct from a disclosed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    /// Instrument symbol
    pub symbol: Symbol,
    /// Trading date
    pub date: NaiveDate,
    /// Market data for the date
    pub bar: PriceBar,
    /// Point-in-time fundamentals keyed by field name
    pub fundamentals: BTreeMap<String, Option<FundamentalValue>>,
}

impl DailyObservation {
    /// Resolve a named input, looking at price fields first, then fundamentals.
    pub fn value(&self, name: &str) -> Option<f64> {
        if PRICE_FIELDS.contains(&name) {
            return self.bar.field(name);
        }
        self.fundamental(name).map(|f| f.value)
    }

    /// The fundamental entry for `name`, if announced.
    pub fn fundamental(&self, name: &str) -> Option<&FundamentalValue> {
        self.fundamentals.get(name).and_then(Option::as_ref)
    }

    /// Whether the field exists in the schema for this observation.
    pub fn has_field(&self, name: &str) -> bool {
        PRICE_FIELDS.contains(&name) || self.fundamentals.contains_key(name)
    }
}

/// Flat, immutable store of observations indexed by date.
///
/// Observations are sorted by `(date, symbol)`; each date owns a contiguous
/// slice, so a cross-section is a borrow rather than a copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationPanel {
    observations: Vec<DailyObservation>,
    dates: Vec<NaiveDate>,
    ranges: Vec<Range<usize>>,
}

impl ObservationPanel {
    /// Build a panel from observations in any order.
    pub fn from_observations(mut observations: Vec<DailyObservation>) -> Self {
        observations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));

        let mut dates = Vec::new();
        let mut ranges: Vec<Range<usize>> = Vec::new();
        for (i, obs) in observations.iter().enumerate() {
            if dates.last() == Some(&obs.date) {
                if let Some(range) = ranges.last_mut() {
                    range.end = i + 1;
                }
            } else {
                dates.push(obs.date);
                ranges.push(i..i + 1);
            }
        }

        Self {
            observations,
            dates,
            ranges,
        }
    }

    /// Every observation, sorted by date then symbol.
    pub fn observations(&self) -> &[DailyObservation] {
        &self.observations
    }

    /// Dates that have at least one observation.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the panel is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// All observations on `date`.
    pub fn cross_section(&self, date: NaiveDate) -> &[DailyObservation] {
        match self.dates.binary_search(&date) {
            Ok(i) => &self.observations[self.ranges[i].clone()],
            Err(_) => &[],
        }
    }

    /// Iterate `(date, cross_section)` pairs in date order.
    pub fn cross_sections(&self) -> impl Iterator<Item = (NaiveDate, &[DailyObservation])> + '_ {
        self.dates
            .iter()
            .zip(&self.ranges)
            .map(|(d, r)| (*d, &self.observations[r.clone()]))
    }

    /// The observation for `symbol` on `date`.
    pub fn get(&self, symbol: &Symbol, date: NaiveDate) -> Option<&DailyObservation> {
        let xs = self.cross_section(date);
        xs.binary_search_by(|o| o.symbol.cmp(symbol))
            .ok()
            .map(|i| &xs[i])
    }

    /// A new panel restricted to the given dates.
    pub fn restrict_to(&self, keep: &[NaiveDate]) -> Self {
        let observations = self
            .observations
            .iter()
            .filter(|o| keep.contains(&o.date))
            .cloned()
            .collect();
        Self::from_observations(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn obs(symbol: &str, d: u32, close: f64) -> DailyObservation {
        DailyObservation {
            symbol: Symbol::new(symbol),
            date: date(d),
            bar: PriceBar::flat(symbol, date(d), close, 100.0),
            fundamentals: BTreeMap::from([(
                "net_income".to_string(),
                Some(FundamentalValue {
                    value: 5.0,
                    announced: date(1),
                    period_end: date(1),
                }),
            )]),
        }
    }

    #[test]
    fn test_panel_indexes_by_date() {
        let panel = ObservationPanel::from_observations(vec![
            obs("B", 5, 2.0),
            obs("A", 4, 1.0),
            obs("A", 5, 1.5),
        ]);
        assert_eq!(panel.dates(), &[date(4), date(5)]);
        assert_eq!(panel.cross_section(date(5)).len(), 2);
        assert_eq!(panel.cross_section(date(5))[0].symbol.as_str(), "A");
        assert!(panel.cross_section(date(6)).is_empty());
        assert_eq!(panel.get(&Symbol::new("B"), date(5)).unwrap().bar.close, 2.0);
        assert!(panel.get(&Symbol::new("B"), date(4)).is_none());
    }

    #[test]
    fn test_value_resolution() {
        let o = obs("A", 4, 1.0);
        assert_eq!(o.value("close"), Some(1.0));
        assert_eq!(o.value("net_income"), Some(5.0));
        assert_eq!(o.value("revenue"), None);
        assert!(o.has_field("net_income"));
        assert!(!o.has_field("revenue"));
    }

    #[test]
    fn test_restrict_to() {
        let panel = ObservationPanel::from_observations(vec![obs("A", 4, 1.0), obs("A", 5, 1.5)]);
        let only = panel.restrict_to(&[date(5)]);
        assert_eq!(only.len(), 1);
        assert_eq!(only.dates(), &[date(5)]);
    }
}
