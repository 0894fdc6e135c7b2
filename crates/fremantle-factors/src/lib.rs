#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod liquidity;
pub mod quality;
pub mod raw;
pub mod registry;
pub mod scorer;
pub mod size;
pub mod traits;
pub mod value;
pub mod xsection;

pub use error::{FactorError, Result};
pub use raw::RawFieldFactor;
pub use registry::{FactorCategory, FactorInfo, FactorRegistry, available_factors};
pub use scorer::{
    ClipConfig, CrossSectionalScorer, IndustryMap, Insufficiency, InsufficientCrossSection,
    Normalization, PeerGroups, ScoreSet, ScorerConfig,
};
pub use traits::{CrossSection, Direction, Factor, FactorInputs, INPUT_SCHEMA_VERSION, NullPolicy};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
