//! Bucketed portfolio simulation.
//!
//! Every rebalance date is simulated independently against the immutable
//! observation panel, so events run in parallel. An event walks through
//! [`EventStage`]s: the universe is filtered, scored instruments are bucketed,
//! trades are opened and resolved, and the closed event is emitted.

use crate::bucket::assign_buckets;
use crate::cost::CostModel;
use crate::error::{Result, ScheduleError, SimulationError};
use crate::event::{
    BucketOutcome, ClosedEvent, EventStage, Exclusion, ExclusionReason, Lifecycle, SkipReason,
    SkippedEvent, Trade, TradeFlag,
};
use crate::schedule::Schedule;
use crate::universe::{UniverseFilter, UniverseFilterConfig};
use chrono::NaiveDate;
use fremantle_data::{Instrument, ObservationPanel, PriceBar, Symbol, TradingCalendar};
use fremantle_factors::ScoreSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Price used to enter a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPrice {
    /// Opening price of the entry day
    Open,
    /// Closing price of the entry day
    Close,
}

/// How constituents are weighted inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Equal weights
    Equal,
    /// Proportional to market cap on the rebalance date
    MarketCap,
}

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Trading days between rebalance and exit
    pub holding_period_days: usize,
    /// Number of buckets
    pub n_buckets: usize,
    /// Entry price
    pub entry_price: EntryPrice,
    /// Trading days an exit may be delayed past the target
    pub max_exit_slippage_days: usize,
    /// Bucket weighting
    pub weighting: Weighting,
    /// Transaction costs
    pub costs: CostModel,
    /// Universe filter thresholds
    pub filter: UniverseFilterConfig,
}

impl SimulationConfig {
    /// Reject parameters that cannot be simulated.
    pub fn validate(&self) -> Result<()> {
        if self.n_buckets == 0 {
            return Err(SimulationError::InvalidConfig(
                "n_buckets must be at least 1".to_string(),
            ));
        }
        if self.holding_period_days == 0 {
            return Err(SimulationError::InvalidConfig(
                "holding_period_days must be at least 1".to_string(),
            ));
        }
        self.costs.validate()
    }
}

/// Closed events and skipped rebalances of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Closed events in date order
    pub events: Vec<ClosedEvent>,
    /// Skipped rebalances in date order
    pub skipped: Vec<SkippedEvent>,
}

enum Outcome {
    Closed(ClosedEvent),
    Skipped(SkippedEvent),
}

/// Simulates bucketed holdings over a rebalance schedule.
#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    config: SimulationConfig,
    parallel: bool,
}

/// Read-only inputs shared by every event of a run.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    /// Aligned observations on every trading day
    pub panel: &'a ObservationPanel,
    /// Trading calendar covering the holding periods
    pub calendar: &'a TradingCalendar,
    /// Instrument master data
    pub instruments: &'a [Instrument],
}

impl PortfolioSimulator {
    /// Create a simulator after validating `config`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parallel: true,
        })
    }

    /// Enable or disable parallel simulation across events.
    pub const fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate every date of `schedule`.
    pub fn run(
        &self,
        schedule: &Schedule,
        scores: &ScoreSet,
        market: MarketView<'_>,
    ) -> Result<SimulationResult> {
        self.run_with_progress(schedule, scores, market, |_, _| {})
    }

    /// Simulate every date of `schedule`, calling `progress(done, total)`
    /// after each event.
    pub fn run_with_progress<F>(
        &self,
        schedule: &Schedule,
        scores: &ScoreSet,
        market: MarketView<'_>,
        progress: F,
    ) -> Result<SimulationResult>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let filter = UniverseFilter::new(self.config.filter.clone(), market.instruments);
        let total = schedule.dates.len();
        let done = std::sync::atomic::AtomicUsize::new(0);
        let simulate = |date: &NaiveDate| {
            let outcome = self.simulate_event(*date, scores, &filter, market);
            let n = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
            progress(n, total);
            outcome
        };

        let outcomes: Vec<Outcome> = if self.parallel {
            schedule
                .dates
                .par_iter()
                .map(simulate)
                .collect::<Result<Vec<_>>>()?
        } else {
            schedule
                .dates
                .iter()
                .map(simulate)
                .collect::<Result<Vec<_>>>()?
        };

        let mut result = SimulationResult::default();
        result.skipped.extend(schedule.skipped.iter().map(|err| match err {
            ScheduleError::NoTradingDay {
                target,
                window_days,
            } => SkippedEvent {
                date: *target,
                reason: SkipReason::NoTradingDay {
                    window_days: *window_days,
                },
            },
        }));
        for outcome in outcomes {
            match outcome {
                Outcome::Closed(event) => result.events.push(event),
                Outcome::Skipped(skip) => result.skipped.push(skip),
            }
        }
        result.events.sort_by_key(|e| e.date);
        result.skipped.sort_by_key(|s| s.date);

        let forced = result
            .events
            .iter()
            .map(|e| e.forced_exits().count())
            .sum::<usize>();
        info!(
            events = result.events.len(),
            skipped = result.skipped.len(),
            forced_exits = forced,
            "simulation finished"
        );
        Ok(result)
    }

    fn simulate_event(
        &self,
        date: NaiveDate,
        scores: &ScoreSet,
        filter: &UniverseFilter,
        market: MarketView<'_>,
    ) -> Result<Outcome> {
        let calendar = market.calendar;
        let start = calendar
            .index_of(date)
            .ok_or(SimulationError::UnknownRebalanceDate(date))?;
        let exit_index = start + self.config.holding_period_days;
        let Some(exit_target) = calendar.get(exit_index) else {
            warn!(%date, "holding period runs past the calendar; rebalance skipped");
            return Ok(Outcome::Skipped(SkippedEvent {
                date,
                reason: SkipReason::InsufficientHistory,
            }));
        };

        let mut life = Lifecycle::new();
        let mut exclusions = Vec::new();

        let cross_section = market.panel.cross_section(date);
        let (kept, removed) = filter.apply(date, cross_section);
        exclusions.extend(removed.into_iter().map(|(symbol, reason)| Exclusion {
            symbol,
            bucket: None,
            reason: ExclusionReason::Filtered(reason),
        }));
        let mut scored = Vec::with_capacity(kept.len());
        for symbol in kept {
            match scores.get(&symbol, date).filter(|s| s.is_finite()) {
                Some(score) => scored.push((symbol, score)),
                None => exclusions.push(Exclusion {
                    symbol,
                    bucket: None,
                    reason: ExclusionReason::NoScore,
                }),
            }
        }
        life.advance(EventStage::UniverseFiltered)?;

        let assignment = assign_buckets(&scored, self.config.n_buckets, scores.direction());
        life.advance(EventStage::Bucketed)?;

        let mut buckets = Vec::with_capacity(assignment.len());
        for (index, members) in assignment.into_iter().enumerate() {
            let mut trades = Vec::with_capacity(members.len());
            for symbol in &members {
                let score = scores.get(symbol, date).unwrap_or(f64::NAN);
                match self.open_trade(symbol, index, score, start, exit_index, market) {
                    Some(trade) => trades.push(trade),
                    None => {
                        debug!(%date, symbol = %symbol, "no tradable entry within holding window");
                        exclusions.push(Exclusion {
                            symbol: symbol.clone(),
                            bucket: Some(index),
                            reason: ExclusionReason::Unresolved,
                        });
                    }
                }
            }
            buckets.push((index, members, trades));
        }
        life.advance(EventStage::Held)?;

        let buckets: Vec<BucketOutcome> = buckets
            .into_iter()
            .map(|(index, members, trades)| self.close_bucket(date, index, members, trades, market))
            .collect();
        // a single bucket has no long-short spread
        let spread_return = match buckets.as_slice() {
            [low, .., high] => high.net_return - low.net_return,
            _ => f64::NAN,
        };
        life.advance(EventStage::Closed)?;

        Ok(Outcome::Closed(ClosedEvent {
            date,
            exit_target,
            universe: scored.into_iter().map(|(s, _)| s).collect(),
            buckets,
            spread_return,
            exclusions,
        }))
    }

    /// Tradable bar of `symbol` on the calendar day at `index`.
    fn tradable_bar<'a>(
        symbol: &Symbol,
        index: usize,
        market: MarketView<'a>,
    ) -> Option<&'a PriceBar> {
        let date = market.calendar.get(index)?;
        market
            .panel
            .get(symbol, date)
            .map(|obs| &obs.bar)
            .filter(|bar| bar.is_tradable())
    }

    fn open_trade(
        &self,
        symbol: &Symbol,
        bucket: usize,
        score: f64,
        start: usize,
        exit_index: usize,
        market: MarketView<'_>,
    ) -> Option<Trade> {
        let mut flags = Vec::new();

        let (entry_index, entry_bar) = (start..exit_index)
            .find_map(|i| Self::tradable_bar(symbol, i, market).map(|bar| (i, bar)))?;
        if entry_index > start {
            flags.push(TradeFlag::DelayedEntry);
        }
        let entry_price = match self.config.entry_price {
            EntryPrice::Open => entry_bar.open,
            EntryPrice::Close => entry_bar.close,
        };
        if !(entry_price.is_finite() && entry_price > 0.0) {
            return None;
        }

        let last_allowed = exit_index + self.config.max_exit_slippage_days;
        let exit = (exit_index..=last_allowed)
            .find_map(|i| Self::tradable_bar(symbol, i, market).map(|bar| (i, bar)));
        let (exit_at, exit_bar) = match exit {
            Some((i, bar)) => {
                if i > exit_index {
                    flags.push(TradeFlag::DelayedExit);
                }
                (i, bar)
            }
            None => {
                flags.push(TradeFlag::ForcedExit);
                let (i, bar) = (entry_index..exit_index)
                    .rev()
                    .find_map(|i| Self::tradable_bar(symbol, i, market).map(|bar| (i, bar)))?;
                debug!(symbol = %symbol, exit = %bar.date, "forced exit at last tradable close");
                (i, bar)
            }
        };

        let exit_date = market.calendar.get(exit_at)?;
        let gross_return = (exit_bar.close - entry_price) / entry_price;
        Some(Trade {
            symbol: symbol.clone(),
            bucket,
            score,
            entry_date: entry_bar.date,
            entry_price,
            exit_date,
            exit_price: exit_bar.close,
            gross_return,
            net_return: gross_return - self.config.costs.round_trip(),
            weight: 0.0,
            flags,
        })
    }

    fn close_bucket(
        &self,
        date: NaiveDate,
        index: usize,
        members: Vec<Symbol>,
        mut trades: Vec<Trade>,
        market: MarketView<'_>,
    ) -> BucketOutcome {
        if trades.is_empty() {
            return BucketOutcome {
                index,
                members,
                trades,
                net_return: f64::NAN,
            };
        }

        let caps: Option<Vec<f64>> = match self.config.weighting {
            Weighting::Equal => None,
            Weighting::MarketCap => trades
                .iter()
                .map(|t| {
                    market
                        .panel
                        .get(&t.symbol, date)
                        .and_then(|obs| obs.bar.market_cap)
                        .filter(|c| c.is_finite() && *c > 0.0)
                })
                .collect(),
        };
        if self.config.weighting == Weighting::MarketCap && caps.is_none() {
            warn!(%date, bucket = index, "market cap missing; bucket falls back to equal weights");
        }
        let weights = match caps {
            Some(caps) => {
                let total: f64 = caps.iter().sum();
                caps.into_iter().map(|c| c / total).collect()
            }
            None => vec![1.0 / trades.len() as f64; trades.len()],
        };

        let mut net_return = 0.0;
        for (trade, w) in trades.iter_mut().zip(weights) {
            trade.weight = w;
            net_return += w * trade.net_return;
        }
        BucketOutcome {
            index,
            members,
            trades,
            net_return,
        }
    }
}
