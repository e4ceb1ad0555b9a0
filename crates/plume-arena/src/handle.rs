//! Segment handles.
//!
//! A [`SegmentHandle`] encodes the physical location of a segment record
//! within the arena. It is epoch-scoped: resetting a pool bumps its epoch,
//! so handles issued before the reset are detected in O(1).

use std::fmt;

use plume_core::PoolId;

/// Location of a segment record within a [`SegmentArena`](crate::SegmentArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct SegmentHandle {
    pub(crate) pool: PoolId,
    pub(crate) epoch: u32,
    pub(crate) block: u32,
    pub(crate) slot: u32,
}

impl SegmentHandle {
    pub(crate) fn new(pool: PoolId, epoch: u32, block: u32, slot: u32) -> Self {
        Self {
            pool,
            epoch,
            block,
            slot,
        }
    }

    /// The pool this record was allocated from.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// The pool epoch at allocation time.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
}

impl fmt::Display for SegmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SegmentHandle(pool={}, epoch={}, block={}, slot={})",
            self.pool, self.epoch, self.block, self.slot
        )
    }
}
