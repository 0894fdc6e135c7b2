#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bucket;
pub mod cost;
pub mod error;
pub mod event;
pub mod schedule;
pub mod simulator;
pub mod universe;

pub use bucket::assign_buckets;
pub use cost::CostModel;
pub use error::{Result, ScheduleError, SimulationError};
pub use event::{
    BucketOutcome, ClosedEvent, EventStage, Exclusion, ExclusionReason, Lifecycle, SkipReason,
    SkippedEvent, Trade, TradeFlag,
};
pub use schedule::{Frequency, RebalanceScheduler, Schedule, ScheduleConfig, SchedulePolicy};
pub use simulator::{
    EntryPrice, MarketView, PortfolioSimulator, SimulationConfig, SimulationResult, Weighting,
};
pub use universe::{FilterReason, UniverseFilter, UniverseFilterConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
