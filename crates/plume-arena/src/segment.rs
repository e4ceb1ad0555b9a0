//! The segment record stored in the arena.

use crate::handle::SegmentHandle;

/// A parcel of water with uniform quality inside a pipe or tank.
///
/// Segments form a doubly linked chain. `downstream` points toward the
/// chain's head (the oldest water, next to leave); `upstream` points
/// toward the tail (the newest water).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Volume in m³.
    pub volume: f64,
    /// Concentration, age in hours, or trace percentage.
    pub quality: f64,
    /// Neighbour toward the tail, if any.
    pub upstream: Option<SegmentHandle>,
    /// Neighbour toward the head, if any.
    pub downstream: Option<SegmentHandle>,
}

impl Segment {
    /// An unlinked segment.
    pub fn new(volume: f64, quality: f64) -> Self {
        Self {
            volume,
            quality,
            upstream: None,
            downstream: None,
        }
    }

    /// Constituent mass carried by the segment.
    pub fn mass(&self) -> f64 {
        self.volume * self.quality
    }
}
