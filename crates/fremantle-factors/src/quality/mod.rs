//! Quality factors built from balance-sheet and income fields.

pub mod leverage;
pub mod roe;

pub use leverage::{LeverageConfig, LeverageFactor};
pub use roe::{RoeConfig, RoeFactor};
