//! Size factors.

pub mod log_market_cap;

pub use log_market_cap::{LogMarketCapConfig, LogMarketCapFactor};
