//! Segment storage for the Plume water-quality engine.
//!
//! Water travelling through a pipe or sitting in a plug-flow tank is
//! modelled as an ordered chain of [`Segment`]s, each a parcel of uniform
//! quality. This crate owns every segment record:
//!
//! ```text
//! ChainStore (per-link and per-tank chains, free list, out-of-memory flag)
//! └── SegmentArena (pools, active pool, epochs)
//!     └── BlockList → Block[] (fixed-size bump-allocated Vec<Segment>)
//! ```
//!
//! Records are addressed by [`SegmentHandle`] (pool, epoch, block, slot)
//! rather than by pointer. Consumed segments go onto a LIFO free list and
//! are reused before the arena is asked for fresh space; the arena itself
//! only releases memory when a pool is reset or destroyed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod handle;
pub mod segment;

pub use arena::SegmentArena;
pub use chain::{ChainStats, ChainStore, Withdrawal};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::SegmentHandle;
pub use segment::Segment;
