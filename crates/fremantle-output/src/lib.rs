#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod evaluator;
pub mod export;
pub mod report;
pub mod stats;
pub mod summary;

pub use evaluator::{
    EvaluationConfig, EvaluationError, PerformanceEvaluator, rank_ic, summarize_ic,
};
pub use export::{ExportError, ExportFormat, Exporter, write_report};
pub use report::{
    AuditTrail, ForcedExit, IcPoint, IcSummary, PerformanceReport, PeriodReturn, ReportMeta,
    ReturnSeries, SeriesLabel, SeriesStats, Unresolved,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
