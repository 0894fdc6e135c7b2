//! Base universe filters applied on each rebalance date.

use chrono::NaiveDate;
use fremantle_data::{DailyObservation, Instrument, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Thresholds of the universe filter. `None` disables a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseFilterConfig {
    /// Minimum market capitalization on the rebalance date
    pub min_market_cap: Option<f64>,
    /// Minimum traded value on the rebalance date
    pub min_traded_value: Option<f64>,
    /// Minimum calendar days since listing
    pub min_listed_days: Option<i64>,
    /// Drop instruments under special treatment
    pub exclude_flagged: bool,
    /// Drop instruments suspended on the rebalance date
    pub exclude_suspended: bool,
}

/// Why an instrument was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    /// Market cap below the minimum, or unknown while a minimum is set
    MarketCap,
    /// Traded value below the minimum
    TradedValue,
    /// Listed too recently
    ListingAge,
    /// Special treatment flag
    Flagged,
    /// Suspended on the rebalance date
    Suspended,
    /// Not listed on the rebalance date
    NotListed,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MarketCap => "market_cap",
            Self::TradedValue => "traded_value",
            Self::ListingAge => "listing_age",
            Self::Flagged => "flagged",
            Self::Suspended => "suspended",
            Self::NotListed => "not_listed",
        };
        f.write_str(s)
    }
}

/// Applies [`UniverseFilterConfig`] to one date's observations.
#[derive(Debug, Clone)]
pub struct UniverseFilter {
    config: UniverseFilterConfig,
    instruments: BTreeMap<Symbol, Instrument>,
}

impl UniverseFilter {
    /// Create a filter; instrument master data feeds the listing and flag checks.
    pub fn new(config: UniverseFilterConfig, instruments: &[Instrument]) -> Self {
        Self {
            config,
            instruments: instruments
                .iter()
                .map(|i| (i.symbol.clone(), i.clone()))
                .collect(),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &UniverseFilterConfig {
        &self.config
    }

    /// First failing check for `obs` on `date`, `None` when it passes.
    ///
    /// Instruments without master data skip the listing and flag checks.
    pub fn check(&self, date: NaiveDate, obs: &DailyObservation) -> Option<FilterReason> {
        let cfg = &self.config;
        if let Some(inst) = self.instruments.get(&obs.symbol) {
            if !inst.is_listed_on(date) {
                return Some(FilterReason::NotListed);
            }
            if cfg.exclude_flagged && inst.flagged {
                return Some(FilterReason::Flagged);
            }
            if let Some(min) = cfg.min_listed_days {
                if inst.listed_days(date).is_none_or(|days| days < min) {
                    return Some(FilterReason::ListingAge);
                }
            }
        }
        if cfg.exclude_suspended && obs.bar.suspended {
            return Some(FilterReason::Suspended);
        }
        if let Some(min) = cfg.min_market_cap {
            if obs.bar.market_cap.is_none_or(|cap| cap < min) {
                return Some(FilterReason::MarketCap);
            }
        }
        if let Some(min) = cfg.min_traded_value {
            if obs.bar.traded_value() < min {
                return Some(FilterReason::TradedValue);
            }
        }
        None
    }

    /// Split `observations` into the retained universe and the removed
    /// instruments with their reasons.
    pub fn apply(
        &self,
        date: NaiveDate,
        observations: &[DailyObservation],
    ) -> (Vec<Symbol>, Vec<(Symbol, FilterReason)>) {
        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for obs in observations {
            match self.check(date, obs) {
                None => kept.push(obs.symbol.clone()),
                Some(reason) => removed.push((obs.symbol.clone(), reason)),
            }
        }
        (kept, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fremantle_data::PriceBar;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(symbol: &str, cap: Option<f64>, volume: f64, suspended: bool) -> DailyObservation {
        let date = day(2024, 6, 28);
        let mut bar = PriceBar::flat(symbol, date, 10.0, volume);
        bar.market_cap = cap;
        bar.suspended = suspended;
        DailyObservation {
            symbol: Symbol::new(symbol),
            date,
            bar,
            fundamentals: BTreeMap::new(),
        }
    }

    fn config() -> UniverseFilterConfig {
        UniverseFilterConfig {
            min_market_cap: Some(1e9),
            min_traded_value: Some(1e4),
            min_listed_days: Some(365),
            exclude_flagged: true,
            exclude_suspended: true,
        }
    }

    #[test]
    fn test_every_removal_has_a_reason() {
        let mut flagged = Instrument::new("F", day(2010, 1, 4));
        flagged.flagged = true;
        let mut delisted = Instrument::new("X", day(2010, 1, 4));
        delisted.delisting_date = Some(day(2024, 1, 2));
        let instruments = vec![
            Instrument::new("A", day(2010, 1, 4)),
            Instrument::new("N", day(2024, 3, 1)),
            flagged,
            delisted,
        ];
        let filter = UniverseFilter::new(config(), &instruments);
        let observations = vec![
            obs("A", Some(5e9), 10_000.0, false),
            obs("C", Some(1e8), 10_000.0, false),
            obs("F", Some(5e9), 10_000.0, false),
            obs("N", Some(5e9), 10_000.0, false),
            obs("S", Some(5e9), 10_000.0, true),
            obs("T", Some(5e9), 10.0, false),
            obs("U", None, 10_000.0, false),
            obs("X", Some(5e9), 10_000.0, false),
        ];
        let (kept, removed) = filter.apply(day(2024, 6, 28), &observations);

        assert_eq!(kept, vec![Symbol::new("A")]);
        let reasons: BTreeMap<_, _> = removed.into_iter().collect();
        assert_eq!(reasons[&Symbol::new("C")], FilterReason::MarketCap);
        assert_eq!(reasons[&Symbol::new("F")], FilterReason::Flagged);
        assert_eq!(reasons[&Symbol::new("N")], FilterReason::ListingAge);
        assert_eq!(reasons[&Symbol::new("S")], FilterReason::Suspended);
        assert_eq!(reasons[&Symbol::new("T")], FilterReason::TradedValue);
        assert_eq!(reasons[&Symbol::new("U")], FilterReason::MarketCap);
        assert_eq!(reasons[&Symbol::new("X")], FilterReason::NotListed);
        assert_eq!(kept.len() + reasons.len(), observations.len());
    }

    #[test]
    fn test_disabled_thresholds_keep_everything() {
        let filter = UniverseFilter::new(
            UniverseFilterConfig {
                min_market_cap: None,
                min_traded_value: None,
                min_listed_days: None,
                exclude_flagged: false,
                exclude_suspended: false,
            },
            &[],
        );
        let observations = vec![obs("S", None, 0.0, true)];
        let (kept, removed) = filter.apply(day(2024, 6, 28), &observations);
        assert_eq!(kept.len(), 1);
        assert!(removed.is_empty());
    }
}
