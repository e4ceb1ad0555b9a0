//! Plume: Lagrangian water-quality transport for water distribution networks.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Plume sub-crates. For most users, adding `plume` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use plume::prelude::*;
//!
//! // A reservoir at quality 1.0 feeding one junction through 100 m of pipe.
//! let mut b = NetworkBuilder::new();
//! b.add_reservoir("R", 1.0).unwrap();
//! b.add_junction("J", 0.0).unwrap();
//! b.add_pipe(
//!     "P",
//!     "R",
//!     "J",
//!     PipeSpec { length: 100.0, diameter: 0.2, ..PipeSpec::default() },
//! )
//! .unwrap();
//! let network = b.build().unwrap();
//! let j = network.node_id("J").unwrap();
//!
//! let config = QualityConfig {
//!     quality_step: 60,
//!     duration: 3600,
//!     ..QualityConfig::default()
//! };
//! let mut solver = QualitySolver::open(network, config).unwrap();
//! solver.initialize().unwrap();
//!
//! // One hour of 10 L/s flow: the pipe flushes in about five minutes.
//! solver
//!     .load_hydraulics(HydraulicState::open(0, 3600, vec![0.01], vec![-0.01, 0.01]))
//!     .unwrap();
//! solver.next().unwrap();
//!
//! assert_eq!(solver.time(), 3600);
//! assert!((solver.node_quality(j) - 1.0).abs() < 1e-9);
//! assert!((solver.mass_balance().ratio - 1.0).abs() < 1e-6);
//! solver.close();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `plume-core` | IDs, network model, hydraulic states, errors |
//! | [`arena`] | `plume-arena` | Segment arena and per-link segment chains |
//! | [`transport`] | `plume-transport` | Sorting, routing, reactions, tank mixing |
//! | [`engine`] | `plume-engine` | Solver lifecycle, configuration, reporting |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and the network model (`plume-core`).
///
/// Contains the immutable [`types::Network`] and its builder, per-interval
/// [`types::HydraulicState`]s, and the [`types::HydraulicSource`] trait a
/// hydraulic solver implements to drive a run.
pub use plume_core as types;

/// Segment storage (`plume-arena`).
///
/// [`arena::ChainStore`] holds one chain of [`arena::Segment`]s per link and
/// per plug-flow tank, backed by a block-allocated [`arena::SegmentArena`].
pub use plume_arena as arena;

/// Transport and reaction routines (`plume-transport`).
///
/// [`transport::QualityState`] owns all mutable quality state; the
/// [`transport::Sequencer`] orders nodes upstream first.
pub use plume_transport as transport;

/// The quality solver (`plume-engine`).
///
/// [`engine::QualitySolver`] drives the open, initialize, step and close
/// lifecycle against a [`engine::QualityConfig`].
pub use plume_engine as engine;

/// Common imports for typical Plume usage.
///
/// ```rust
/// use plume::prelude::*;
/// ```
///
/// This imports the network builder and its specs, hydraulic states, the
/// solver and its configuration, and the error types.
pub mod prelude {
    // Network model
    pub use plume_core::{
        LinkId, MixModel, Network, NetworkBuilder, NodeId, PipeSpec, Source, SourceKind, TankId,
        TankSpec,
    };

    // Hydraulics
    pub use plume_core::{HydraulicSource, HydraulicState, LinkStatus};

    // Errors
    pub use plume_core::{NetworkError, QualityError};
    pub use plume_engine::ConfigError;

    // Transport parameters and results
    pub use plume_transport::{MassBalance, QualityMode, ReactionParams, ReactionTotals};

    // Engine
    pub use plume_engine::{QualityConfig, QualityReport, QualitySolver, StepMetrics};
}
