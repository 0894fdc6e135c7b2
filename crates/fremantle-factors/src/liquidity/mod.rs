//! Liquidity factors.
//!
//! Scored from one day's traded amount relative to market cap.

pub mod turnover;

pub use turnover::TurnoverFactor;
