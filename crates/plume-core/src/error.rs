//! Error types for the Plume water-quality engine.
//!
//! Organized by subsystem: [`NetworkError`] for network model
//! validation and [`QualityError`] for the quality solver lifecycle.
//! Numerical edge cases (near-zero denominators, empty tanks, zero
//! diameters) are guarded where they occur and never surface here.

use std::error::Error;
use std::fmt;

use crate::id::{LinkId, NodeId, PatternId};

/// Errors from the quality solver during initialization and routing.
///
/// Every fatal condition aborts only the current operation. The solver
/// stays closable after any of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QualityError {
    /// Arena or working-array allocation failed while opening or
    /// initializing the solver (code 101).
    AllocationFailed {
        /// Description of the failed allocation.
        reason: String,
    },
    /// The segment arena was exhausted during routing (code 102).
    ///
    /// Sticky: once raised, every later step fails the same way until
    /// the solver is re-initialized.
    OutOfMemory,
    /// The topological sort could not order every node (code 120).
    TopologyIncomplete {
        /// Nodes placed before the sort gave up.
        sorted: usize,
        /// Total node count.
        total: usize,
    },
    /// An operation needing an initialized solver was called before
    /// `initialize()` (code 200).
    NotInitialized,
    /// The solver has been closed (code 201).
    Closed,
    /// A hydraulic state did not match the network dimensions (code 302).
    HydraulicsMismatch {
        /// Which array was wrong.
        what: &'static str,
        /// Length required by the network.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },
    /// The hydraulic collaborator could not supply a state (code 307).
    HydraulicsUnavailable {
        /// Description supplied by the collaborator.
        reason: String,
    },
}

impl QualityError {
    /// Numeric error code, distinct per variant.
    pub fn code(&self) -> u32 {
        match self {
            Self::AllocationFailed { .. } => 101,
            Self::OutOfMemory => 102,
            Self::TopologyIncomplete { .. } => 120,
            Self::NotInitialized => 200,
            Self::Closed => 201,
            Self::HydraulicsMismatch { .. } => 302,
            Self::HydraulicsUnavailable { .. } => 307,
        }
    }
}

impl fmt::Display for QualityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { reason } => write!(f, "allocation failed: {reason}"),
            Self::OutOfMemory => write!(f, "segment arena exhausted during routing"),
            Self::TopologyIncomplete { sorted, total } => {
                write!(f, "topological sort incomplete: {sorted} of {total} nodes ordered")
            }
            Self::NotInitialized => write!(f, "quality solver not initialized"),
            Self::Closed => write!(f, "quality solver is closed"),
            Self::HydraulicsMismatch {
                what,
                expected,
                actual,
            } => {
                write!(f, "hydraulic {what} has {actual} entries, expected {expected}")
            }
            Self::HydraulicsUnavailable { reason } => {
                write!(f, "hydraulics unavailable: {reason}")
            }
        }
    }
}

impl Error for QualityError {}

/// Errors detected while building a [`Network`](crate::network::Network).
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkError {
    /// Two nodes or two links share an identifier.
    DuplicateId {
        /// The repeated identifier.
        id: String,
    },
    /// A link or source references a node id that was never added.
    UnknownNode {
        /// The missing identifier.
        id: String,
    },
    /// A link starts and ends at the same node.
    SelfLoop {
        /// The offending link.
        link: LinkId,
    },
    /// A pipe has a negative or non-finite length or diameter.
    InvalidGeometry {
        /// The offending link.
        link: LinkId,
        /// Description of the bad value.
        reason: String,
    },
    /// A tank has a negative or non-finite volume parameter.
    InvalidTank {
        /// The tank's node.
        node: NodeId,
        /// Description of the bad value.
        reason: String,
    },
    /// A source references a pattern that does not exist.
    UnknownPattern {
        /// The node carrying the source.
        node: NodeId,
        /// The missing pattern.
        pattern: PatternId,
    },
    /// A pattern has no multipliers.
    EmptyPattern {
        /// The empty pattern.
        pattern: PatternId,
    },
    /// The network has no nodes.
    Empty,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "duplicate id '{id}'"),
            Self::UnknownNode { id } => write!(f, "unknown node '{id}'"),
            Self::SelfLoop { link } => write!(f, "link {link} connects a node to itself"),
            Self::InvalidGeometry { link, reason } => {
                write!(f, "link {link} has invalid geometry: {reason}")
            }
            Self::InvalidTank { node, reason } => write!(f, "tank at node {node}: {reason}"),
            Self::UnknownPattern { node, pattern } => {
                write!(f, "source at node {node} references unknown pattern {pattern}")
            }
            Self::EmptyPattern { pattern } => write!(f, "pattern {pattern} has no multipliers"),
            Self::Empty => write!(f, "network has no nodes"),
        }
    }
}

impl Error for NetworkError {}
