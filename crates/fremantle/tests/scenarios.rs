//! End-to-end runs of the pipeline on small synthetic markets.

use approx::assert_relative_eq;
use chrono::{Datelike, NaiveDate};
use fremantle::backtest::{
    CostModel, EntryPrice, ExclusionReason, Frequency, ScheduleConfig, SchedulePolicy,
    SimulationConfig, UniverseFilterConfig, Weighting,
};
use fremantle::data::{
    DateRange, FundamentalRecord, InMemorySource, Instrument, PriceBar, Symbol, TradingCalendar,
};
use fremantle::factors::{
    ClipConfig, CrossSectionalScorer, Insufficiency, Normalization, RawFieldFactor, ScorerConfig,
};
use fremantle::output::EvaluationConfig;
use fremantle::{Backtest, BacktestConfig, DataConfig, PeerGrouping, derive_periodic_records};
use std::collections::BTreeMap;

const MARKET: &str = "TEST";

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> TradingCalendar {
    start
        .iter_days()
        .take_while(|x| *x <= end)
        .filter(|x| x.weekday().num_days_from_monday() < 5)
        .collect()
}

fn config() -> BacktestConfig {
    BacktestConfig {
        schedule: ScheduleConfig {
            frequency: Frequency::Daily,
            policy: SchedulePolicy::CalendarExact,
            max_search_days: 10,
        },
        scoring: ScorerConfig {
            normalization: Normalization::None,
            clip: None,
            demean_by_group: false,
            min_cross_section: 1,
        },
        peer_groups: PeerGrouping::None,
        simulation: SimulationConfig {
            holding_period_days: 5,
            n_buckets: 2,
            entry_price: EntryPrice::Close,
            max_exit_slippage_days: 2,
            weighting: Weighting::Equal,
            costs: CostModel {
                commission_rate: 0.0,
                stamp_tax_rate: 0.0,
                slippage_rate: 0.0,
            },
            filter: UniverseFilterConfig {
                min_market_cap: None,
                min_traded_value: None,
                min_listed_days: None,
                exclude_flagged: false,
                exclude_suspended: false,
            },
        },
        evaluation: EvaluationConfig {
            trading_days_per_year: 250.0,
            risk_free_rate: 0.0,
        },
        data: DataConfig {
            market: MARKET.to_string(),
            cumulative_fields: Vec::new(),
            ttm_fields: Vec::new(),
        },
    }
}

fn listed(names: &[&str]) -> Vec<Instrument> {
    names.iter().map(|s| Instrument::new(*s, d(2000, 1, 3))).collect()
}

/// Flat prices on every trading day.
fn flat_prices(names: &[&str], calendar: &TradingCalendar) -> Vec<PriceBar> {
    names
        .iter()
        .flat_map(|s| {
            calendar
                .dates()
                .iter()
                .map(move |date| PriceBar::flat(*s, *date, 10.0, 1000.0))
        })
        .collect()
}

/// A market where every instrument carries a constant `signal` fundamental.
fn market(
    instruments: Vec<Instrument>,
    signals: &[(&str, f64)],
    prices: Vec<PriceBar>,
    calendar: &TradingCalendar,
) -> InMemorySource {
    let fundamentals = signals
        .iter()
        .map(|(s, v)| FundamentalRecord::new(*s, d(2000, 12, 31), d(2001, 3, 15), "signal", *v))
        .collect();
    InMemorySource::new()
        .with_instruments(instruments)
        .with_fundamentals(fundamentals)
        .with_prices(prices)
        .with_calendar(MARKET, calendar.clone())
}

fn signal_market(signals: &[(&str, f64)], calendar: &TradingCalendar) -> InMemorySource {
    let names: Vec<&str> = signals.iter().map(|(s, _)| *s).collect();
    market(listed(&names), signals, flat_prices(&names, calendar), calendar)
}

fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|n| Symbol::new(*n)).collect()
}

#[test]
fn scenario_a_two_buckets_split_by_rank() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 2, 29));
    let source = signal_market(
        &[("D", 40.0), ("B", 20.0), ("A", 10.0), ("C", 30.0)],
        &calendar,
    );
    let range = DateRange::new(d(2024, 1, 2), d(2024, 1, 2)).unwrap();

    let output = Backtest::new(config())
        .unwrap()
        .run(&source, "raw:signal:asc", &[], range)
        .unwrap();

    assert_eq!(output.schedule.dates, vec![d(2024, 1, 2)]);
    let event = &output.simulation.events[0];
    assert_eq!(event.buckets[0].members, symbols(&["A", "B"]));
    assert_eq!(event.buckets[1].members, symbols(&["C", "D"]));
    // flat prices
    assert_relative_eq!(event.spread_return, 0.0);
    assert_eq!(output.report.meta.n_buckets, 2);
}

#[test]
fn scenario_b_cumulative_figures_become_quarters() {
    let x = "X";
    let cumulative = vec![
        FundamentalRecord::new(x, d(2023, 3, 31), d(2023, 4, 20), "net_income", 100.0),
        FundamentalRecord::new(x, d(2023, 6, 30), d(2023, 8, 20), "net_income", 180.0),
        FundamentalRecord::new(x, d(2023, 9, 30), d(2023, 10, 25), "net_income", 260.0),
        FundamentalRecord::new(x, d(2023, 12, 31), d(2024, 3, 30), "net_income", 300.0),
    ];
    let mut cfg = config();
    cfg.data.cumulative_fields = vec!["net_income".to_string()];
    cfg.data.ttm_fields = vec!["net_income".to_string()];

    let records = derive_periodic_records(&cumulative, &cfg.data).unwrap();
    let quarters: Vec<f64> = records
        .iter()
        .filter(|r| r.field == "net_income_q")
        .map(|r| r.value)
        .collect();
    assert_eq!(quarters.len(), 4);
    for (got, want) in quarters.iter().zip([100.0, 80.0, 80.0, 40.0]) {
        assert_relative_eq!(*got, want, epsilon = 1e-9);
    }
    let ttm: Vec<&FundamentalRecord> = records
        .iter()
        .filter(|r| r.field == "net_income_ttm")
        .collect();
    assert_eq!(ttm.len(), 1);
    assert_relative_eq!(ttm[0].value, 300.0, epsilon = 1e-9);

    // aligned: the annual report only becomes visible once announced
    let calendar = weekdays(d(2024, 3, 1), d(2024, 5, 31));
    let prices = calendar
        .dates()
        .iter()
        .map(|date| PriceBar::flat(x, *date, 5.0, 100.0))
        .collect();
    let source = InMemorySource::new()
        .with_instruments(vec![Instrument::new(x, d(2010, 1, 4))])
        .with_fundamentals(cumulative)
        .with_prices(prices)
        .with_calendar(MARKET, calendar);
    let range = DateRange::new(d(2024, 3, 25), d(2024, 4, 30)).unwrap();
    let data = Backtest::new(cfg).unwrap().prepare(&source, &[], range).unwrap();

    let before = data.panel.get(&Symbol::new(x), d(2024, 3, 29)).unwrap();
    assert_relative_eq!(before.value("net_income_q").unwrap(), 80.0, epsilon = 1e-9);
    assert_eq!(before.value("net_income_ttm"), None);
    let after = data.panel.get(&Symbol::new(x), d(2024, 4, 1)).unwrap();
    assert_relative_eq!(after.value("net_income_q").unwrap(), 40.0, epsilon = 1e-9);
    assert_relative_eq!(after.value("net_income_ttm").unwrap(), 300.0, epsilon = 1e-9);
}

#[test]
fn scenario_c_sunday_month_end_moves_to_monday() {
    let calendar = weekdays(d(2025, 8, 1), d(2025, 10, 31));
    let source = signal_market(
        &[("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0)],
        &calendar,
    );
    let mut cfg = config();
    cfg.schedule.frequency = Frequency::Monthly;
    cfg.schedule.policy = SchedulePolicy::NearestTradingDay;
    let range = DateRange::new(d(2025, 8, 1), d(2025, 9, 15)).unwrap();

    let output = Backtest::new(cfg)
        .unwrap()
        .run(&source, "raw:signal", &[], range)
        .unwrap();

    assert_eq!(output.schedule.dates, vec![d(2025, 9, 1)]);
    assert_eq!(output.report.meta.first_date, Some(d(2025, 9, 1)));
    assert_eq!(output.simulation.events[0].date, d(2025, 9, 1));
}

#[test]
fn scenario_d_single_member_group_passes_through() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 2, 29));
    let signals = [
        ("A", 1.0),
        ("B", 2.0),
        ("C", 3.0),
        ("D", 4.0),
        ("E", 5.0),
        ("Z", 1000.0),
    ];
    let instruments: Vec<Instrument> = signals
        .iter()
        .map(|(s, _)| {
            let industry = if *s == "Z" { "mining" } else { "banks" };
            Instrument::new(*s, d(2000, 1, 3)).with_industry(industry)
        })
        .collect();
    let names = signals.map(|(s, _)| s);
    let source = market(instruments, &signals, flat_prices(&names, &calendar), &calendar);

    let mut cfg = config();
    cfg.scoring.clip = Some(ClipConfig {
        default_sigma: 1.0,
        group_sigma: BTreeMap::new(),
    });
    cfg.peer_groups = PeerGrouping::Industry;
    let range = DateRange::new(d(2024, 1, 2), d(2024, 1, 2)).unwrap();

    let output = Backtest::new(cfg)
        .unwrap()
        .run(&source, "raw:signal", &[], range)
        .unwrap();

    let date = d(2024, 1, 2);
    assert_eq!(output.scores.get(&Symbol::new("Z"), date), Some(1000.0));
    // the banks are clipped to one standard deviation of their own group
    let sd = 2.5_f64.sqrt();
    assert_relative_eq!(
        output.scores.get(&Symbol::new("A"), date).unwrap(),
        3.0 - sd,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        output.scores.get(&Symbol::new("E"), date).unwrap(),
        3.0 + sd,
        epsilon = 1e-12
    );
    let record = output
        .scores
        .insufficient()
        .iter()
        .find(|r| r.group.as_deref() == Some("mining"))
        .unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.action, Insufficiency::ClipSkipped);
}

#[test]
fn scenario_e_suspended_instrument_is_unresolved() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 2, 29));
    let rebalance = d(2024, 1, 2);
    let signals = [("A", 10.0), ("B", 20.0), ("C", 30.0), ("D", 40.0)];
    let prices: Vec<PriceBar> = signals
        .iter()
        .flat_map(|(s, _)| {
            calendar.dates().iter().map(move |date| {
                let close = if *date == rebalance { 10.0 } else { 11.0 };
                let mut bar = PriceBar::flat(*s, *date, close, 1000.0);
                bar.suspended = *s == "D";
                bar
            })
        })
        .collect();
    let source = market(listed(&["A", "B", "C", "D"]), &signals, prices, &calendar);
    let range = DateRange::new(rebalance, rebalance).unwrap();

    let output = Backtest::new(config())
        .unwrap()
        .run(&source, "raw:signal", &[], range)
        .unwrap();

    let event = &output.simulation.events[0];
    let high = &event.buckets[1];
    assert_eq!(high.members, symbols(&["C", "D"]));
    assert_eq!(high.trades.len(), 1);
    assert_eq!(high.trades[0].symbol, Symbol::new("C"));
    // D is out of both the numerator and the denominator
    assert_relative_eq!(high.net_return, 0.1, epsilon = 1e-12);

    let exclusion = event
        .exclusions
        .iter()
        .find(|x| x.symbol == Symbol::new("D"))
        .unwrap();
    assert_eq!(exclusion.reason, ExclusionReason::Unresolved);
    assert_eq!(exclusion.bucket, Some(1));

    assert_eq!(output.report.audit.unresolved.len(), 1);
    assert_eq!(output.report.audit.unresolved[0].symbol, Symbol::new("D"));
}

#[test]
fn scores_do_not_depend_on_other_dates() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 1, 31));
    let names = ["A", "B", "C", "D", "E"];
    let prices = names
        .iter()
        .enumerate()
        .flat_map(|(i, s)| {
            calendar.dates().iter().enumerate().map(move |(t, date)| {
                let close = 10.0 + (i * 7 + t * 3) as f64 % 11.0;
                PriceBar::flat(*s, *date, close, 500.0)
            })
        })
        .collect();
    let source = market(listed(&names), &names.map(|s| (s, 1.0)), prices, &calendar);
    let range = DateRange::new(d(2024, 1, 2), d(2024, 1, 31)).unwrap();
    let mut cfg = config();
    cfg.scoring.normalization = Normalization::ZScore;
    cfg.scoring.clip = Some(ClipConfig {
        default_sigma: 2.0,
        group_sigma: BTreeMap::new(),
    });
    let data = Backtest::new(cfg.clone())
        .unwrap()
        .prepare(&source, &[], range)
        .unwrap();

    let factor = RawFieldFactor::new("close", fremantle::factors::Direction::Ascending);
    let scorer = CrossSectionalScorer::new(cfg.scoring).unwrap();
    let full = scorer.score(&factor, &data.panel, None).unwrap();

    let target = d(2024, 1, 17);
    let alone = scorer
        .score(&factor, &data.panel.restrict_to(&[target]), None)
        .unwrap();
    assert_eq!(full.on(target), alone.on(target));
    assert_eq!(alone.dates().count(), 1);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 6, 28));
    let names = ["A", "B", "C", "D", "E", "F"];
    let prices = names
        .iter()
        .enumerate()
        .flat_map(|(i, s)| {
            calendar.dates().iter().enumerate().map(move |(t, date)| {
                let close = 20.0 + ((i + 1) * t) as f64 * 0.01;
                PriceBar::flat(*s, *date, close, 800.0)
            })
        })
        .collect();
    let signals: Vec<(&str, f64)> = names
        .iter()
        .enumerate()
        .map(|(i, s)| (*s, i as f64))
        .collect();
    let source = market(listed(&names), &signals, prices, &calendar);
    let mut cfg = config();
    cfg.schedule.frequency = Frequency::Weekly;
    cfg.simulation.n_buckets = 3;
    let range = DateRange::new(d(2024, 1, 1), d(2024, 5, 31)).unwrap();

    let parallel = Backtest::new(cfg.clone())
        .unwrap()
        .run(&source, "raw:signal", &[], range)
        .unwrap();
    let sequential = Backtest::new(cfg)
        .unwrap()
        .with_parallelism(false)
        .run(&source, "raw:signal", &[], range)
        .unwrap();

    assert!(!parallel.simulation.events.is_empty());
    assert_eq!(parallel.simulation, sequential.simulation);
    assert_eq!(parallel.report.ic, sequential.report.ic);
    // higher signal, steeper price path: the IC is perfect every week
    assert!(
        parallel
            .report
            .ic
            .iter()
            .all(|p| (p.ic - 1.0).abs() < 1e-12)
    );
}

#[test]
fn unknown_factor_is_an_error() {
    let calendar = weekdays(d(2024, 1, 1), d(2024, 1, 31));
    let source = signal_market(&[("A", 1.0)], &calendar);
    let range = DateRange::new(d(2024, 1, 2), d(2024, 1, 5)).unwrap();
    let result = Backtest::new(config())
        .unwrap()
        .run(&source, "momentum_12_1", &[], range);
    assert!(matches!(result, Err(fremantle::EngineError::Factor(_))));
}
