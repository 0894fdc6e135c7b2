#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod align;
pub mod calendar;
pub mod error;
pub mod normalize;
pub mod observation;
pub mod source;
pub mod types;

pub use align::PointInTimeAligner;
pub use calendar::{Nearest, TradingCalendar};
pub use error::{DataError, Result};
pub use normalize::{FiscalPeriod, PeriodNormalizer, PeriodicValue};
pub use observation::{DailyObservation, FundamentalValue, ObservationPanel};
pub use source::{CsvPaths, CsvSource, DataSource, FrameSource, InMemorySource};
pub use types::{DateRange, FundamentalRecord, Instrument, PriceBar, Symbol};

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
