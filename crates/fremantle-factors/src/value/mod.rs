//! Value factors: fundamentals over the day's market cap.
//!
//! Both read as-of fundamentals, so a stale book or earnings figure is
//! priced against the current cap until the next announcement.

pub mod book_to_price;
pub mod earnings_yield;

pub use book_to_price::{BookToPriceConfig, BookToPriceFactor};
pub use earnings_yield::{EarningsYieldConfig, EarningsYieldFactor};
