//! Per-step performance metrics for the quality solver.
//!
//! [`StepMetrics`] captures timing and segment-memory data for the most
//! recent `step()` or `next()` call.

/// Timing and memory metrics collected during a single step.
///
/// All durations are in microseconds. The solver replaces these after
/// each `step()`/`next()` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Time spent reacting pipe and tank segments, in microseconds.
    pub reaction_us: u64,
    /// Time spent routing water through nodes, in microseconds.
    pub routing_us: u64,
    /// Time spent in the topological sort triggered by the last
    /// hydraulic load, in microseconds. Zero when no sort ran.
    pub sort_us: u64,
    /// Quality sub-steps executed.
    pub sub_steps: u32,
    /// Segments currently linked into chains.
    pub live_segments: usize,
    /// Recycled segment records waiting on the free list.
    pub free_segments: usize,
    /// Cumulative segment records taken fresh from the arena.
    pub fresh_allocations: u64,
    /// Cumulative segment records taken from the free list.
    pub reuse_hits: u64,
    /// Arena blocks allocated.
    pub block_count: usize,
    /// Memory held by the arena, in bytes.
    pub memory_bytes: usize,
    /// Nodes forced into the order to break cycles in the last sort.
    pub forced_nodes: usize,
}
