//! Cross-sectional scoring.
//!
//! Each trading date is scored on its own: raw factor values, then per-group
//! outlier clipping, optional group demeaning and optional normalization.
//! Nothing computed for one date reads another date's observations, so dates
//! are processed in parallel.

use crate::error::{FactorError, Result};
use crate::traits::{CrossSection, Direction, Factor};
use crate::xsection;
use chrono::NaiveDate;
use fremantle_data::{DailyObservation, Instrument, ObservationPanel, Symbol};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Normalization applied after clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Keep clipped raw values
    None,
    /// Zero mean, unit standard deviation
    ZScore,
    /// Percentile rank in (0, 1]
    Rank,
}

/// Outlier clipping bounds, in standard deviations of each peer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Sigma multiple for groups without an override
    pub default_sigma: f64,
    /// Per-group sigma multiples keyed by group name
    #[serde(default)]
    pub group_sigma: BTreeMap<String, f64>,
}

impl ClipConfig {
    /// Sigma multiple for `group`.
    pub fn sigma_for(&self, group: Option<&str>) -> f64 {
        group
            .and_then(|g| self.group_sigma.get(g))
            .copied()
            .unwrap_or(self.default_sigma)
    }
}

/// Parameters of the [`CrossSectionalScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Normalization mode
    pub normalization: Normalization,
    /// Outlier clipping; `None` disables it
    pub clip: Option<ClipConfig>,
    /// Subtract each peer group's mean
    pub demean_by_group: bool,
    /// Minimum finite raw values a date (and a group, for group-relative
    /// steps) needs before it is scored
    pub min_cross_section: usize,
}

impl ScorerConfig {
    /// Reject settings that cannot produce scores.
    pub fn validate(&self) -> Result<()> {
        if self.min_cross_section == 0 {
            return Err(FactorError::InvalidConfig(
                "min_cross_section must be at least 1".to_string(),
            ));
        }
        if let Some(clip) = &self.clip {
            let bad = std::iter::once(clip.default_sigma)
                .chain(clip.group_sigma.values().copied())
                .find(|k| !(k.is_finite() && *k > 0.0));
            if let Some(k) = bad {
                return Err(FactorError::InvalidConfig(format!(
                    "clip sigma must be positive, got {k}"
                )));
            }
        }
        Ok(())
    }
}

/// Partition of instruments into peer groups (industries, sectors, ...).
pub trait PeerGroups: Sync {
    /// Group of `symbol`; `None` puts it with the other ungrouped instruments.
    fn group_of(&self, symbol: &Symbol) -> Option<String>;
}

impl<F> PeerGroups for F
where
    F: Fn(&Symbol) -> Option<String> + Sync,
{
    fn group_of(&self, symbol: &Symbol) -> Option<String> {
        self(symbol)
    }
}

/// Peer groups read from [`Instrument::industry`].
#[derive(Debug, Clone, Default)]
pub struct IndustryMap {
    industries: BTreeMap<Symbol, String>,
}

impl IndustryMap {
    /// Collect the industries of `instruments`.
    pub fn from_instruments(instruments: &[Instrument]) -> Self {
        Self {
            industries: instruments
                .iter()
                .filter_map(|i| Some((i.symbol.clone(), i.industry.clone()?)))
                .collect(),
        }
    }

    /// Number of instruments with a known industry.
    pub fn len(&self) -> usize {
        self.industries.len()
    }

    /// Whether no industry is known.
    pub fn is_empty(&self) -> bool {
        self.industries.is_empty()
    }
}

impl PeerGroups for IndustryMap {
    fn group_of(&self, symbol: &Symbol) -> Option<String> {
        self.industries.get(symbol).cloned()
    }
}

/// What happened to a cross-section that was too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insufficiency {
    /// Clipping skipped; values passed through unchanged
    ClipSkipped,
    /// Values set to NaN
    ScoredNan,
}

/// A date or peer group with too few finite raw values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientCrossSection {
    /// Trading date
    pub date: NaiveDate,
    /// Peer group, `None` for the whole date or ungrouped instruments
    pub group: Option<String>,
    /// Finite raw values available
    pub count: usize,
    /// Treatment applied
    pub action: Insufficiency,
}

/// Scores of one factor on every scored date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSet {
    factor: String,
    direction: Direction,
    by_date: BTreeMap<NaiveDate, BTreeMap<Symbol, f64>>,
    insufficient: Vec<InsufficientCrossSection>,
}

impl ScoreSet {
    /// Assemble a score set from precomputed per-date scores.
    pub fn from_scores(
        factor: impl Into<String>,
        direction: Direction,
        by_date: BTreeMap<NaiveDate, BTreeMap<Symbol, f64>>,
    ) -> Self {
        Self {
            factor: factor.into(),
            direction,
            by_date,
            insufficient: Vec::new(),
        }
    }

    /// Name of the scored factor.
    pub fn factor(&self) -> &str {
        &self.factor
    }

    /// Direction declared by the factor.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Scored dates in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    /// All scores on `date`.
    pub fn on(&self, date: NaiveDate) -> Option<&BTreeMap<Symbol, f64>> {
        self.by_date.get(&date)
    }

    /// Score of `symbol` on `date`.
    pub fn get(&self, symbol: &Symbol, date: NaiveDate) -> Option<f64> {
        self.by_date.get(&date)?.get(symbol).copied()
    }

    /// Total number of (instrument, date) scores, NaN included.
    pub fn len(&self) -> usize {
        self.by_date.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing was scored.
    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Cross-sections that were too small.
    pub fn insufficient(&self) -> &[InsufficientCrossSection] {
        &self.insufficient
    }
}

/// Per-date scorer for a single factor.
#[derive(Debug, Clone)]
pub struct CrossSectionalScorer {
    config: ScorerConfig,
    parallel: bool,
}

impl CrossSectionalScorer {
    /// Create a scorer after validating `config`.
    pub fn new(config: ScorerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parallel: true,
        })
    }

    /// Enable or disable parallel scoring across dates.
    pub const fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score every date of `panel`.
    pub fn score(
        &self,
        factor: &dyn Factor,
        panel: &ObservationPanel,
        groups: Option<&dyn PeerGroups>,
    ) -> Result<ScoreSet> {
        let sections: Vec<(NaiveDate, &[DailyObservation])> = panel.cross_sections().collect();
        let run = |&(date, obs): &(NaiveDate, &[DailyObservation])| {
            self.score_cross_section(factor, date, obs, groups)
                .map(|(scores, short)| (date, scores, short))
        };
        let results: Vec<_> = if self.parallel {
            sections.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            sections.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        let mut by_date = BTreeMap::new();
        let mut insufficient = Vec::new();
        for (date, scores, short) in results {
            by_date.insert(date, scores);
            insufficient.extend(short);
        }
        let set = ScoreSet {
            factor: factor.name().to_string(),
            direction: factor.direction(),
            by_date,
            insufficient,
        };
        info!(
            factor = set.factor(),
            dates = set.by_date.len(),
            scores = set.len(),
            insufficient = set.insufficient.len(),
            "scored factor"
        );
        Ok(set)
    }

    /// Score one date's observations.
    pub fn score_cross_section(
        &self,
        factor: &dyn Factor,
        date: NaiveDate,
        observations: &[DailyObservation],
        groups: Option<&dyn PeerGroups>,
    ) -> Result<(BTreeMap<Symbol, f64>, Vec<InsufficientCrossSection>)> {
        let inputs = CrossSection::for_factor(factor, date, observations)?;
        let raw = factor.compute(&inputs);

        let symbols: Vec<Symbol> = raw.keys().cloned().collect();
        let mut values: Vec<f64> = raw
            .values()
            .map(|v| if v.is_finite() { *v } else { f64::NAN })
            .collect();
        let mut short = Vec::new();

        let count = xsection::finite_count(&values);
        let needed = match self.config.normalization {
            Normalization::ZScore => self.config.min_cross_section.max(2),
            _ => self.config.min_cross_section,
        };
        if count < needed {
            debug!(%date, count, "cross-section too small");
            short.push(InsufficientCrossSection {
                date,
                group: None,
                count,
                action: Insufficiency::ScoredNan,
            });
            values.fill(f64::NAN);
            return Ok((symbols.into_iter().zip(values).collect(), short));
        }

        let mut partition: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
        for (i, symbol) in symbols.iter().enumerate() {
            let group = groups.and_then(|g| g.group_of(symbol));
            partition.entry(group).or_default().push(i);
        }

        for (group, members) in &partition {
            let mut slice: Vec<f64> = members.iter().map(|&i| values[i]).collect();
            self.transform_group(date, group.as_deref(), groups.is_some(), &mut slice, &mut short);
            for (&i, v) in members.iter().zip(slice) {
                values[i] = v;
            }
        }

        Ok((symbols.into_iter().zip(values).collect(), short))
    }

    fn transform_group(
        &self,
        date: NaiveDate,
        group: Option<&str>,
        grouped: bool,
        values: &mut [f64],
        short: &mut Vec<InsufficientCrossSection>,
    ) {
        let count = xsection::finite_count(values);
        let mut record = |action| {
            short.push(InsufficientCrossSection {
                date,
                group: group.map(str::to_string),
                count,
                action,
            });
        };

        if let Some(clip) = &self.config.clip {
            if !xsection::clip_sigma(values, clip.sigma_for(group)) {
                record(Insufficiency::ClipSkipped);
            }
        }

        let relative = (grouped && self.config.demean_by_group)
            || (grouped && self.config.normalization != Normalization::None);
        let needed = match self.config.normalization {
            Normalization::ZScore => self.config.min_cross_section.max(2),
            _ if self.config.demean_by_group => self.config.min_cross_section.max(2),
            _ => self.config.min_cross_section,
        };
        if relative && count < needed {
            values.fill(f64::NAN);
            record(Insufficiency::ScoredNan);
            return;
        }

        if grouped && self.config.demean_by_group {
            xsection::demean(values);
        }
        match self.config.normalization {
            Normalization::None => {}
            Normalization::ZScore => xsection::zscore(values),
            Normalization::Rank => xsection::percentile_rank(values),
        }
    }
}
