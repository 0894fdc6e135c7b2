#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use fremantle_backtest as backtest;
pub use fremantle_data as data;
pub use fremantle_factors as factors;
pub use fremantle_output as output;

pub use config::{BacktestConfig, DataConfig, PeerGrouping};
pub use error::{EngineError, Result};
pub use pipeline::{Backtest, BacktestOutput, PreparedData, derive_periodic_records};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
