//! Quality solver for the Plume water-quality engine.
//!
//! Wraps [`plume_transport::QualityState`] in a solver with a validated
//! configuration, an explicit lifecycle, hydraulic-interval time stepping,
//! per-step metrics and reporting accessors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod report;
pub mod solver;

pub use config::{ConfigError, QualityConfig};
pub use metrics::StepMetrics;
pub use report::QualityReport;
pub use solver::{Phase, QualitySolver};
