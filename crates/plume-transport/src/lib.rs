//! Lagrangian water-quality transport for the Plume engine.
//!
//! Water in every pipe and tank is held as a chain of segments (see
//! [`plume_arena::ChainStore`]). Each quality sub-step reacts the segments
//! in place, then visits nodes in topological order: withdraws the water
//! arriving from upstream chains, mixes it, applies sources and releases
//! the result into downstream chains.
//!
//! [`QualityState`] owns all evolving state. The time stepping around it
//! lives in `plume-engine`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod kinetics;
pub mod mass_balance;
pub mod params;
pub mod routing;
pub mod sequencer;
pub mod source;
pub mod state;
pub mod tank;

pub use direction::{DirectionChange, FlowDirection, FlowDirections};
pub use kinetics::ReactionTotals;
pub use mass_balance::MassBalance;
pub use params::{
    QualityMode, ReactionParams, TransportParams, DEFAULT_QUALITY_TOLERANCE,
    DEFAULT_STAGNANT_FLOW, TRACE_QUALITY,
};
pub use routing::SubStep;
pub use sequencer::{Sequencer, SortOutcome};
pub use state::QualityState;
pub use tank::TankMixer;
