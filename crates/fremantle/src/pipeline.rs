//! End-to-end backtest pipeline.

use crate::config::{BacktestConfig, DataConfig, PeerGrouping};
use crate::error::Result;
use chrono::Days;
use fremantle_backtest::{
    MarketView, PortfolioSimulator, RebalanceScheduler, Schedule, SimulationResult,
};
use fremantle_data::{
    DataSource, DateRange, FundamentalRecord, Instrument, ObservationPanel, PeriodNormalizer,
    PeriodicValue, PointInTimeAligner, Symbol, TradingCalendar,
};
use fremantle_factors::{
    CrossSectionalScorer, FactorRegistry, IndustryMap, PeerGroups, ScoreSet,
};
use fremantle_output::{PerformanceEvaluator, PerformanceReport};
use tracing::info;

/// Extra calendar days fetched past the last holding period.
const CALENDAR_SLACK_DAYS: u64 = 14;

/// Inputs after fetching, period normalization and alignment.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Trading calendar covering the run and its holding periods
    pub calendar: TradingCalendar,
    /// Instrument master data
    pub instruments: Vec<Instrument>,
    /// Aligned daily observations
    pub panel: ObservationPanel,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct BacktestOutput {
    /// Rebalance dates and skipped anchors
    pub schedule: Schedule,
    /// Factor scores on the rebalance dates
    pub scores: ScoreSet,
    /// Closed and skipped rebalance events
    pub simulation: SimulationResult,
    /// IC and return statistics
    pub report: PerformanceReport,
}

/// Append single-quarter (`<field>_q`) and trailing-twelve-month
/// (`<field>_ttm`) records derived from the cumulative fields.
///
/// The original records are kept unchanged.
pub fn derive_periodic_records(
    records: &[FundamentalRecord],
    data: &DataConfig,
) -> Result<Vec<FundamentalRecord>> {
    let cumulative: Vec<FundamentalRecord> = records
        .iter()
        .filter(|r| data.cumulative_fields.contains(&r.field))
        .cloned()
        .collect();
    let mut out = records.to_vec();
    if cumulative.is_empty() {
        return Ok(out);
    }

    let normalizer = PeriodNormalizer::new();
    let periodic = normalizer.normalize(&cumulative)?;
    let ttm_input: Vec<PeriodicValue> = periodic
        .iter()
        .filter(|p| data.ttm_fields.contains(&p.field))
        .cloned()
        .collect();
    let ttm = normalizer.trailing_twelve_months(&ttm_input);

    out.extend(periodic.iter().map(|p| p.to_record("q")));
    out.extend(ttm.iter().map(|p| p.to_record("ttm")));
    Ok(out)
}

/// Runs the whole pipeline for one factor.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    registry: FactorRegistry,
    parallel: bool,
}

impl Backtest {
    /// Create a backtest with the built-in factors.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: FactorRegistry::with_builtins(),
            parallel: true,
        })
    }

    /// Replace the factor registry.
    pub fn with_registry(mut self, registry: FactorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Enable or disable parallel scoring and simulation.
    pub const fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Factor registry used to resolve factor names.
    pub const fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Calendar range fetched for a run over `range`: widened by the schedule
    /// search window before, and by the holding period, exit slippage and
    /// search window after.
    pub fn data_window(&self, range: DateRange) -> DateRange {
        let search = u64::from(self.config.schedule.max_search_days);
        let sim = &self.config.simulation;
        let trading = (sim.holding_period_days + sim.max_exit_slippage_days) as u64;
        // trading days to calendar days, with room for holidays
        let ahead = trading * 3 / 2 + search + CALENDAR_SLACK_DAYS;
        DateRange {
            start: range.start.checked_sub_days(Days::new(search)).unwrap_or(range.start),
            end: range.end.checked_add_days(Days::new(ahead)).unwrap_or(range.end),
        }
    }

    /// Fetch, normalize and align the inputs of a run over `range`.
    ///
    /// An empty `symbols` slice means every instrument the source knows.
    pub fn prepare<S>(&self, source: &S, symbols: &[Symbol], range: DateRange) -> Result<PreparedData>
    where
        S: DataSource + ?Sized,
    {
        let window = self.data_window(range);
        let calendar = source.fetch_calendar(&self.config.data.market, window)?;
        let instruments = source.fetch_instruments(symbols)?;
        let fundamentals = source.fetch_fundamentals(symbols, window)?;
        let prices = source.fetch_prices(symbols, window)?;
        info!(
            trading_days = calendar.len(),
            instruments = instruments.len(),
            fundamentals = fundamentals.len(),
            prices = prices.len(),
            "fetched inputs"
        );

        let fundamentals = derive_periodic_records(&fundamentals, &self.config.data)?;
        let panel = PointInTimeAligner::new().align(&fundamentals, &prices, &calendar)?;
        Ok(PreparedData {
            calendar,
            instruments,
            panel,
        })
    }

    /// Rebalance dates of `range` on `calendar`.
    pub fn schedule(&self, range: DateRange, calendar: &TradingCalendar) -> Schedule {
        RebalanceScheduler::new(self.config.schedule.clone()).schedule(range, calendar)
    }

    /// Score `factor` on the rebalance dates of `schedule`.
    pub fn score(
        &self,
        factor: &str,
        data: &PreparedData,
        schedule: &Schedule,
    ) -> Result<ScoreSet> {
        let factor = self.registry.get(factor)?;
        let scorer =
            CrossSectionalScorer::new(self.config.scoring.clone())?.with_parallelism(self.parallel);
        let industries = match self.config.peer_groups {
            PeerGrouping::None => None,
            PeerGrouping::Industry => Some(IndustryMap::from_instruments(&data.instruments)),
        };
        let groups = industries.as_ref().map(|m| m as &dyn PeerGroups);
        let panel = data.panel.restrict_to(&schedule.dates);
        Ok(scorer.score(factor.as_ref(), &panel, groups)?)
    }

    /// Run `factor` over `range`.
    pub fn run<S>(
        &self,
        source: &S,
        factor: &str,
        symbols: &[Symbol],
        range: DateRange,
    ) -> Result<BacktestOutput>
    where
        S: DataSource + ?Sized,
    {
        self.run_with_progress(source, factor, symbols, range, |_, _| {})
    }

    /// Run `factor` over `range`, calling `progress(done, total)` after each
    /// simulated rebalance.
    pub fn run_with_progress<S, F>(
        &self,
        source: &S,
        factor: &str,
        symbols: &[Symbol],
        range: DateRange,
        progress: F,
    ) -> Result<BacktestOutput>
    where
        S: DataSource + ?Sized,
        F: Fn(usize, usize) + Send + Sync,
    {
        let data = self.prepare(source, symbols, range)?;
        self.run_prepared(&data, factor, range, progress)
    }

    /// Run `factor` over `range` on already prepared inputs.
    pub fn run_prepared<F>(
        &self,
        data: &PreparedData,
        factor: &str,
        range: DateRange,
        progress: F,
    ) -> Result<BacktestOutput>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let schedule = self.schedule(range, &data.calendar);
        let scores = self.score(factor, data, &schedule)?;

        let simulator = PortfolioSimulator::new(self.config.simulation.clone())?
            .with_parallelism(self.parallel);
        let market = MarketView {
            panel: &data.panel,
            calendar: &data.calendar,
            instruments: &data.instruments,
        };
        let simulation = simulator.run_with_progress(&schedule, &scores, market, progress)?;

        let evaluator = PerformanceEvaluator::new(
            self.config.evaluation.clone(),
            self.config.simulation.holding_period_days,
        )?;
        let report = evaluator.evaluate(&simulation, &scores);
        info!(
            factor,
            rebalances = schedule.dates.len(),
            events = simulation.events.len(),
            skipped = simulation.skipped.len(),
            "backtest finished"
        );

        Ok(BacktestOutput {
            schedule,
            scores,
            simulation,
            report,
        })
    }
}
