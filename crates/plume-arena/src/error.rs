//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use plume_core::PoolId;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The pool already holds `max_blocks` blocks and the last one is full.
    CapacityExceeded {
        /// Blocks in the pool.
        blocks: usize,
        /// Segment records per block.
        block_len: usize,
    },
    /// The allocator refused to back a new block.
    AllocationFailed {
        /// Bytes requested for the block.
        bytes: usize,
    },
    /// A handle issued before its pool was last reset.
    StaleHandle {
        /// The epoch encoded in the handle.
        handle_epoch: u32,
        /// The pool's current epoch.
        current_epoch: u32,
    },
    /// A pool id that does not exist or has been destroyed.
    UnknownPool {
        /// The missing pool.
        pool: PoolId,
    },
    /// Attempted to destroy the pool allocations are currently drawn from.
    ActivePool {
        /// The active pool.
        pool: PoolId,
    },
    /// Arena configuration rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { blocks, block_len } => {
                write!(
                    f,
                    "arena capacity exceeded: {blocks} blocks of {block_len} segments in use"
                )
            }
            Self::AllocationFailed { bytes } => {
                write!(f, "failed to allocate a {bytes} byte block")
            }
            Self::StaleHandle {
                handle_epoch,
                current_epoch,
            } => {
                write!(
                    f,
                    "stale handle: epoch {handle_epoch}, pool is at epoch {current_epoch}"
                )
            }
            Self::UnknownPool { pool } => write!(f, "unknown pool: {pool}"),
            Self::ActivePool { pool } => write!(f, "pool {pool} is active and cannot be destroyed"),
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
