//! Core types for the Plume water-quality engine.
//!
//! This crate defines the vocabulary shared by every other Plume crate:
//! dense identifiers, the validated network model, the per-interval
//! hydraulic state and the engine-level error types. It has no
//! knowledge of segments, arenas or routing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hydraulics;
pub mod id;
pub mod network;

pub use error::{NetworkError, QualityError};
pub use hydraulics::{HydraulicSource, HydraulicState, LinkStatus};
pub use id::{ChainId, LinkId, NodeId, PatternId, PoolId, TankId};
pub use network::{
    Link, LinkKind, MixModel, Network, NetworkBuilder, Node, NodeKind, Pattern, PipeSpec, Source,
    SourceKind, Tank, TankSpec,
};
