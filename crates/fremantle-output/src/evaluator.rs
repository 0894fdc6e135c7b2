//! Performance evaluation of a simulated backtest.

use crate::report::{
    AuditTrail, ForcedExit, IcPoint, IcSummary, PerformanceReport, PeriodReturn, ReportMeta,
    ReturnSeries, SeriesLabel, SeriesStats, Unresolved,
};
use crate::stats;
use chrono::{NaiveDate, Utc};
use fremantle_backtest::{ClosedEvent, ExclusionReason, SimulationResult, TradeFlag};
use fremantle_data::Symbol;
use fremantle_factors::ScoreSet;
use fremantle_factors::xsection::{mean, std_dev};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by the evaluator.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Invalid evaluation parameters.
    #[error("Invalid evaluation config: {0}")]
    InvalidConfig(String),
}

/// Annualization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Trading days in a year
    pub trading_days_per_year: f64,
    /// Annual risk-free rate subtracted in the Sharpe ratio
    pub risk_free_rate: f64,
}

impl EvaluationConfig {
    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if !(self.trading_days_per_year.is_finite() && self.trading_days_per_year > 0.0) {
            return Err(EvaluationError::InvalidConfig(format!(
                "trading_days_per_year must be positive, got {}",
                self.trading_days_per_year
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EvaluationError::InvalidConfig(
                "risk_free_rate must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Computes IC and return statistics from a [`SimulationResult`].
///
/// Annualization uses `trading_days_per_year / holding_period_days` periods a
/// year.
#[derive(Debug, Clone)]
pub struct PerformanceEvaluator {
    config: EvaluationConfig,
    holding_period_days: usize,
}

impl PerformanceEvaluator {
    /// Create an evaluator for a simulation with the given holding period.
    pub fn new(
        config: EvaluationConfig,
        holding_period_days: usize,
    ) -> Result<Self, EvaluationError> {
        config.validate()?;
        if holding_period_days == 0 {
            return Err(EvaluationError::InvalidConfig(
                "holding_period_days must be at least 1".into(),
            ));
        }
        Ok(Self {
            config,
            holding_period_days,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Rebalance periods per year.
    pub fn periods_per_year(&self) -> f64 {
        self.config.trading_days_per_year / self.holding_period_days as f64
    }

    /// Build the report for `result`; `scores` are the scores the simulation
    /// bucketed on.
    pub fn evaluate(&self, result: &SimulationResult, scores: &ScoreSet) -> PerformanceReport {
        let events = &result.events;
        let n_buckets = events.iter().map(|e| e.buckets.len()).max().unwrap_or(0);

        let buckets: Vec<ReturnSeries> = (0..n_buckets)
            .map(|i| self.bucket_series(events, i))
            .collect();
        let spread = self.spread_series(events, &buckets);
        let ic: Vec<IcPoint> = events.iter().map(|e| rank_ic(e, scores)).collect();
        let ic_summary = summarize_ic(&ic);
        let audit = audit_trail(result, scores);

        info!(
            factor = scores.factor(),
            periods = events.len(),
            skipped = audit.skipped.len(),
            ic_mean = ic_summary.mean,
            icir = ic_summary.icir,
            "evaluated backtest"
        );

        PerformanceReport {
            meta: ReportMeta {
                factor: scores.factor().to_string(),
                direction: scores.direction(),
                n_buckets,
                holding_period_days: self.holding_period_days,
                periods_per_year: self.periods_per_year(),
                risk_free_rate: self.config.risk_free_rate,
                first_date: events.first().map(|e| e.date),
                last_date: events.last().map(|e| e.date),
                generated_at: Utc::now(),
            },
            buckets,
            spread,
            ic,
            ic_summary,
            audit,
        }
    }

    fn bucket_series(&self, events: &[ClosedEvent], index: usize) -> ReturnSeries {
        let mut previous: Option<&[Symbol]> = None;
        let rows: Vec<(NaiveDate, f64, f64)> = events
            .iter()
            .map(|event| {
                let members = event
                    .buckets
                    .get(index)
                    .map_or(&[][..], |b| b.members.as_slice());
                let turnover = previous.map_or(f64::NAN, |prev| stats::turnover(prev, members));
                previous = Some(members);
                (event.date, event.bucket_return(index), turnover)
            })
            .collect();
        self.series(SeriesLabel::Bucket(index), &rows)
    }

    /// The spread trades both legs, so its turnover is the mean of theirs.
    fn spread_series(&self, events: &[ClosedEvent], buckets: &[ReturnSeries]) -> ReturnSeries {
        let leg_turnover = |i: usize| -> f64 {
            let low = buckets.first().and_then(|b| b.periods.get(i));
            let high = buckets.last().and_then(|b| b.periods.get(i));
            low.zip(high)
                .map_or(f64::NAN, |(l, h)| (l.turnover + h.turnover) / 2.0)
        };
        let rows: Vec<(NaiveDate, f64, f64)> = events
            .iter()
            .enumerate()
            .map(|(i, event)| (event.date, event.spread_return, leg_turnover(i)))
            .collect();
        self.series(SeriesLabel::Spread, &rows)
    }

    fn series(&self, label: SeriesLabel, rows: &[(NaiveDate, f64, f64)]) -> ReturnSeries {
        let returns: Vec<f64> = rows.iter().map(|r| r.1).collect();
        for (date, ret, _) in rows {
            if !ret.is_finite() {
                warn!(series = %label, %date, "no resolved return; period skipped in compounding");
            }
        }
        let nav = stats::nav(&returns);
        let turnovers: Vec<f64> = rows.iter().map(|r| r.2).collect();
        let ppy = self.periods_per_year();

        let summary = SeriesStats {
            periods: rows.len(),
            missing_periods: returns.iter().filter(|r| !r.is_finite()).count(),
            cumulative_return: stats::cumulative_return(&returns),
            annualized_return: stats::annualized_return(&returns, ppy),
            annualized_volatility: stats::annualized_volatility(&returns, ppy),
            sharpe: stats::sharpe(&returns, ppy, self.config.risk_free_rate),
            max_drawdown: stats::max_drawdown(&nav),
            mean_turnover: mean(&turnovers).unwrap_or(f64::NAN),
        };
        let periods = rows
            .iter()
            .zip(nav)
            .map(|(&(date, net_return, turnover), nav)| PeriodReturn {
                date,
                net_return,
                nav,
                turnover,
            })
            .collect();
        ReturnSeries {
            label,
            periods,
            stats: summary,
        }
    }
}

/// Rank IC of one event: the date's scores against the gross forward return
/// of every resolved trade in the universe.
pub fn rank_ic(event: &ClosedEvent, scores: &ScoreSet) -> IcPoint {
    let forward: BTreeMap<&Symbol, f64> = event
        .trades()
        .map(|t| (&t.symbol, t.gross_return))
        .collect();
    let (x, y): (Vec<f64>, Vec<f64>) = event
        .universe
        .iter()
        .filter_map(|s| Some((scores.get(s, event.date)?, *forward.get(s)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .unzip();
    IcPoint {
        date: event.date,
        ic: stats::spearman(&x, &y),
        pairs: x.len(),
    }
}

/// Mean, dispersion, ICIR and hit rate of an IC series.
///
/// ICIR is NaN with fewer than two defined ICs or zero dispersion.
pub fn summarize_ic(points: &[IcPoint]) -> IcSummary {
    let ics: Vec<f64> = points
        .iter()
        .map(|p| p.ic)
        .filter(|v| v.is_finite())
        .collect();
    let m = mean(&ics).unwrap_or(f64::NAN);
    let sd = std_dev(&ics).unwrap_or(f64::NAN);
    let icir = if sd > 0.0 { m / sd } else { f64::NAN };
    let hit_rate = if ics.is_empty() {
        f64::NAN
    } else {
        ics.iter().filter(|v| **v > 0.0).count() as f64 / ics.len() as f64
    };
    IcSummary {
        observations: ics.len(),
        mean: m,
        std: sd,
        icir,
        hit_rate,
    }
}

fn audit_trail(result: &SimulationResult, scores: &ScoreSet) -> AuditTrail {
    let mut audit = AuditTrail {
        skipped: result.skipped.clone(),
        insufficient: scores.insufficient().to_vec(),
        ..AuditTrail::default()
    };
    for event in &result.events {
        audit
            .forced_exits
            .extend(
                event
                    .trades()
                    .filter(|t| t.has(TradeFlag::ForcedExit))
                    .map(|t| ForcedExit {
                        rebalance_date: event.date,
                        symbol: t.symbol.clone(),
                        bucket: t.bucket,
                        exit_target: event.exit_target,
                        exit_date: t.exit_date,
                    }),
            );
        audit.unresolved.extend(
            event
                .exclusions
                .iter()
                .filter(|x| x.reason == ExclusionReason::Unresolved)
                .map(|x| Unresolved {
                    rebalance_date: event.date,
                    symbol: x.symbol.clone(),
                    bucket: x.bucket,
                }),
        );
    }
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fremantle_backtest::{BucketOutcome, Exclusion, SkipReason, SkippedEvent, Trade};
    use fremantle_factors::Direction;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn trade(symbol: &str, bucket: usize, score: f64, gross: f64) -> Trade {
        Trade {
            symbol: Symbol::new(symbol),
            bucket,
            score,
            entry_date: d(1, 2),
            entry_price: 10.0,
            exit_date: d(1, 30),
            exit_price: 10.0 * (1.0 + gross),
            gross_return: gross,
            net_return: gross,
            weight: 0.5,
            flags: Vec::new(),
        }
    }

    fn bucket(index: usize, trades: Vec<Trade>) -> BucketOutcome {
        let members = trades.iter().map(|t| t.symbol.clone()).collect();
        let net_return = if trades.is_empty() {
            f64::NAN
        } else {
            trades.iter().map(|t| t.net_return).sum::<f64>() / trades.len() as f64
        };
        BucketOutcome {
            index,
            members,
            trades,
            net_return,
        }
    }

    fn event(date: NaiveDate, low: BucketOutcome, high: BucketOutcome) -> ClosedEvent {
        let universe = low.members.iter().chain(&high.members).cloned().collect();
        let spread_return = high.net_return - low.net_return;
        ClosedEvent {
            date,
            exit_target: date,
            universe,
            buckets: vec![low, high],
            spread_return,
            exclusions: Vec::new(),
        }
    }

    fn scores_of(events: &[ClosedEvent]) -> ScoreSet {
        let by_date = events
            .iter()
            .map(|e| {
                let day = e.trades().map(|t| (t.symbol.clone(), t.score)).collect();
                (e.date, day)
            })
            .collect();
        ScoreSet::from_scores("signal", Direction::Ascending, by_date)
    }

    fn evaluator() -> PerformanceEvaluator {
        PerformanceEvaluator::new(
            EvaluationConfig {
                trading_days_per_year: 240.0,
                risk_free_rate: 0.0,
            },
            20,
        )
        .unwrap()
    }

    fn two_periods() -> Vec<ClosedEvent> {
        vec![
            event(
                d(1, 31),
                bucket(0, vec![trade("A", 0, 1.0, -0.02), trade("B", 0, 2.0, 0.0)]),
                bucket(1, vec![trade("C", 1, 3.0, 0.04), trade("D", 1, 4.0, 0.06)]),
            ),
            event(
                d(2, 29),
                bucket(0, vec![trade("A", 0, 1.0, 0.01), trade("C", 0, 2.0, 0.03)]),
                bucket(1, vec![trade("B", 1, 3.0, 0.02), trade("D", 1, 4.0, 0.0)]),
            ),
        ]
    }

    #[test]
    fn test_periods_per_year_from_holding_period() {
        assert_relative_eq!(evaluator().periods_per_year(), 12.0);
    }

    #[test]
    fn test_bucket_series_and_spread() {
        let events = two_periods();
        let report = evaluator().evaluate(
            &SimulationResult {
                events: events.clone(),
                skipped: Vec::new(),
            },
            &scores_of(&events),
        );

        assert_eq!(report.meta.n_buckets, 2);
        let low = report.bucket(0).unwrap();
        assert_relative_eq!(low.periods[0].net_return, -0.01, epsilon = 1e-12);
        assert_relative_eq!(low.periods[1].net_return, 0.02, epsilon = 1e-12);
        assert_relative_eq!(low.stats.cumulative_return, 0.99 * 1.02 - 1.0, epsilon = 1e-12);

        let high = report.bucket(1).unwrap();
        assert_relative_eq!(high.periods[0].net_return, 0.05, epsilon = 1e-12);
        assert_relative_eq!(report.spread.periods[0].net_return, 0.06, epsilon = 1e-12);
        assert_relative_eq!(report.spread.periods[1].net_return, -0.01, epsilon = 1e-12);
        assert_eq!(report.series().count(), 3);
    }

    #[test]
    fn test_turnover_first_period_nan() {
        let events = two_periods();
        let report = evaluator().evaluate(
            &SimulationResult {
                events: events.clone(),
                skipped: Vec::new(),
            },
            &scores_of(&events),
        );
        let low = report.bucket(0).unwrap();
        assert!(low.periods[0].turnover.is_nan());
        // {A, B} -> {A, C}
        assert_relative_eq!(low.periods[1].turnover, 0.5);
        assert_relative_eq!(low.stats.mean_turnover, 0.5);
        assert_relative_eq!(report.spread.periods[1].turnover, 0.5);
    }

    #[test]
    fn test_ic_series() {
        let events = two_periods();
        let report = evaluator().evaluate(
            &SimulationResult {
                events: events.clone(),
                skipped: Vec::new(),
            },
            &scores_of(&events),
        );
        // first period: scores and returns rank identically
        assert_relative_eq!(report.ic[0].ic, 1.0);
        assert_eq!(report.ic[0].pairs, 4);
        // second period: return ranks [2, 4, 3, 1] against score ranks 1..4
        assert_relative_eq!(report.ic[1].ic, -0.4, epsilon = 1e-12);
        assert_eq!(report.ic_summary.observations, 2);
        assert_relative_eq!(report.ic_summary.mean, 0.3, epsilon = 1e-12);
        assert_relative_eq!(report.ic_summary.hit_rate, 0.5);
        assert_relative_eq!(
            report.ic_summary.icir,
            0.3 / 0.98_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_icir_undefined_with_one_observation() {
        let summary = summarize_ic(&[
            IcPoint {
                date: d(1, 31),
                ic: 0.3,
                pairs: 10,
            },
            IcPoint {
                date: d(2, 29),
                ic: f64::NAN,
                pairs: 2,
            },
        ]);
        assert_eq!(summary.observations, 1);
        assert_relative_eq!(summary.mean, 0.3);
        assert!(summary.icir.is_nan());
        assert!(summary.std.is_nan());
    }

    #[test]
    fn test_ic_nan_with_two_pairs() {
        let e = event(
            d(1, 31),
            bucket(0, vec![trade("A", 0, 1.0, 0.01)]),
            bucket(1, vec![trade("B", 1, 2.0, 0.02)]),
        );
        let scores = scores_of(std::slice::from_ref(&e));
        let point = rank_ic(&e, &scores);
        assert!(point.ic.is_nan());
        assert_eq!(point.pairs, 2);
    }

    #[test]
    fn test_nan_period_skipped_in_compounding() {
        let mut events = two_periods();
        events[0].buckets[0] = bucket(0, Vec::new());
        events[0].spread_return = f64::NAN;
        let report = evaluator().evaluate(
            &SimulationResult {
                events: events.clone(),
                skipped: Vec::new(),
            },
            &scores_of(&events),
        );
        let low = report.bucket(0).unwrap();
        assert_eq!(low.stats.missing_periods, 1);
        assert_eq!(low.periods[0].nav, 1.0);
        assert_relative_eq!(low.stats.cumulative_return, 0.02, epsilon = 1e-12);
        assert_eq!(report.spread.stats.missing_periods, 1);
    }

    #[test]
    fn test_audit_trail() {
        let mut events = two_periods();
        let mut forced = trade("E", 1, 5.0, -0.1);
        forced.flags.push(TradeFlag::ForcedExit);
        forced.exit_date = d(1, 25);
        events[0].buckets[1].trades.push(forced);
        events[0].exclusions.push(Exclusion {
            symbol: Symbol::new("F"),
            bucket: Some(0),
            reason: ExclusionReason::Unresolved,
        });
        let skipped = vec![SkippedEvent {
            date: d(3, 31),
            reason: SkipReason::InsufficientHistory,
        }];
        let report = evaluator().evaluate(
            &SimulationResult {
                events: events.clone(),
                skipped: skipped.clone(),
            },
            &scores_of(&events),
        );
        assert_eq!(report.audit.skipped, skipped);
        assert_eq!(report.audit.forced_exits.len(), 1);
        assert_eq!(report.audit.forced_exits[0].symbol, Symbol::new("E"));
        assert_eq!(report.audit.forced_exits[0].exit_date, d(1, 25));
        assert_eq!(report.audit.unresolved.len(), 1);
        assert_eq!(report.audit.unresolved[0].bucket, Some(0));
        assert!(!report.audit.is_clean());
    }

    #[test]
    fn test_empty_result() {
        let report = evaluator().evaluate(
            &SimulationResult::default(),
            &ScoreSet::from_scores("signal", Direction::Ascending, BTreeMap::new()),
        );
        assert!(report.buckets.is_empty());
        assert!(report.spread.periods.is_empty());
        assert!(report.spread.stats.cumulative_return.is_nan());
        assert!(report.ic_summary.mean.is_nan());
        assert_eq!(report.meta.first_date, None);
    }

    #[test]
    fn test_invalid_config() {
        let bad = EvaluationConfig {
            trading_days_per_year: 0.0,
            risk_free_rate: 0.0,
        };
        assert!(PerformanceEvaluator::new(bad, 20).is_err());
        let ok = EvaluationConfig {
            trading_days_per_year: 252.0,
            risk_free_rate: 0.0,
        };
        assert!(PerformanceEvaluator::new(ok, 0).is_err());
    }
}
