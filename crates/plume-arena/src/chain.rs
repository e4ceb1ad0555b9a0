//! Segment chains for links and tanks.
//!
//! Every link and every tank owns one chain of [`Segment`]s. The head
//! (`first`) is the downstream end holding the oldest water; the tail
//! (`last`) is the upstream end where new water enters. Segments that are
//! fully consumed go onto a LIFO free list and are reused before the arena
//! is asked for a fresh record.
//!
//! Allocation failure never panics. It sets a sticky out-of-memory flag
//! that the engine checks after each routing sub-step.

use log::error;

use plume_core::ChainId;

use crate::arena::SegmentArena;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::SegmentHandle;
use crate::segment::Segment;

/// Volume and mass taken out of a chain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Withdrawal {
    /// Volume withdrawn, m³.
    pub volume: f64,
    /// Constituent mass withdrawn.
    pub mass: f64,
}

impl Withdrawal {
    /// Average quality of the withdrawn water, if any was withdrawn.
    pub fn quality(&self) -> Option<f64> {
        (self.volume > 0.0).then(|| self.mass / self.volume)
    }
}

/// Allocation counters, cumulative since the last [`ChainStore::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Records obtained from the arena.
    pub fresh_allocations: u64,
    /// Records obtained from the free list.
    pub reuse_hits: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Chain {
    first: Option<SegmentHandle>,
    last: Option<SegmentHandle>,
    len: usize,
}

#[derive(Clone, Copy)]
enum End {
    Head,
    Tail,
}

/// All segment chains of one network, plus the arena backing them.
pub struct ChainStore {
    arena: SegmentArena,
    chains: Vec<Chain>,
    free: Vec<SegmentHandle>,
    out_of_memory: bool,
    stats: ChainStats,
}

impl ChainStore {
    /// Create `chain_count` empty chains over a fresh arena.
    pub fn new(chain_count: usize, config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            arena: SegmentArena::new(config)?,
            chains: vec![Chain::default(); chain_count],
            free: Vec::new(),
            out_of_memory: false,
            stats: ChainStats::default(),
        })
    }

    /// Append a new tail segment to `chain`.
    ///
    /// Reuses the most recently freed record if there is one. Returns
    /// `None` and raises the out-of-memory flag when the arena is exhausted.
    pub fn add_segment(
        &mut self,
        chain: ChainId,
        volume: f64,
        quality: f64,
    ) -> Option<SegmentHandle> {
        let old_last = self.chains[chain.index()].last;
        let record = Segment {
            volume,
            quality,
            upstream: None,
            downstream: old_last,
        };

        let handle = if let Some(handle) = self.free.pop() {
            *self.arena.get_mut(handle) = record;
            self.stats.reuse_hits += 1;
            handle
        } else {
            match self.arena.allocate(record) {
                Ok(handle) => {
                    self.stats.fresh_allocations += 1;
                    handle
                }
                Err(e) => {
                    if !self.out_of_memory {
                        error!("segment arena exhausted on chain {chain}: {e}");
                    }
                    self.out_of_memory = true;
                    return None;
                }
            }
        };

        match old_last {
            Some(last) => self.arena.get_mut(last).upstream = Some(handle),
            None => self.chains[chain.index()].first = Some(handle),
        }
        let c = &mut self.chains[chain.index()];
        c.last = Some(handle);
        c.len += 1;
        Some(handle)
    }

    /// Withdraw up to `volume` from the head of `chain`.
    ///
    /// Fully consumed segments are unlinked and recycled. If the chain
    /// holds less than `volume`, the shortfall contributes nothing.
    pub fn consume_from_head(&mut self, chain: ChainId, volume: f64) -> Withdrawal {
        self.drain(chain, volume, End::Head, false)
    }

    /// Withdraw `volume` from the head of `chain`.
    ///
    /// With `keep_last`, the final remaining segment is never unlinked: it
    /// supplies whatever volume is still owed at its own quality, and its
    /// volume is floored at zero.
    pub fn drain_head(&mut self, chain: ChainId, volume: f64, keep_last: bool) -> Withdrawal {
        self.drain(chain, volume, End::Head, keep_last)
    }

    /// Withdraw `volume` from the tail of `chain`, newest water first.
    ///
    /// `keep_last` behaves as in [`drain_head`](Self::drain_head).
    pub fn drain_tail(&mut self, chain: ChainId, volume: f64, keep_last: bool) -> Withdrawal {
        self.drain(chain, volume, End::Tail, keep_last)
    }

    fn drain(&mut self, chain: ChainId, volume: f64, end: End, keep_last: bool) -> Withdrawal {
        let mut out = Withdrawal::default();
        let mut remaining = volume;
        while remaining > 0.0 {
            let c = self.chains[chain.index()];
            let Some(handle) = (match end {
                End::Head => c.first,
                End::Tail => c.last,
            }) else {
                break;
            };
            let pinned = keep_last && c.first == c.last;
            let seg = self.arena.get_mut(handle);
            let take = if pinned {
                remaining
            } else {
                seg.volume.min(remaining)
            };
            out.volume += take;
            out.mass += take * seg.quality;
            remaining -= take;

            if pinned || take < seg.volume {
                seg.volume = (seg.volume - take).max(0.0);
            } else {
                self.unlink(chain, end);
            }
        }
        out
    }

    fn unlink(&mut self, chain: ChainId, end: End) {
        let c = &mut self.chains[chain.index()];
        let removed = match end {
            End::Head => c.first,
            End::Tail => c.last,
        };
        let Some(handle) = removed else {
            return;
        };
        let seg = *self.arena.get(handle);
        match end {
            End::Head => {
                c.first = seg.upstream;
                match seg.upstream {
                    Some(next) => self.arena.get_mut(next).downstream = None,
                    None => c.last = None,
                }
            }
            End::Tail => {
                c.last = seg.downstream;
                match seg.downstream {
                    Some(next) => self.arena.get_mut(next).upstream = None,
                    None => c.first = None,
                }
            }
        }
        c.len -= 1;
        self.free.push(handle);
    }

    /// Put `volume` of water at `quality` into the tail of `chain`.
    ///
    /// Merges into the tail segment (volume-weighted quality) when the two
    /// qualities differ by less than `tolerance`; otherwise appends a new
    /// segment. A non-positive volume is a no-op.
    pub fn append_or_merge_at_tail(
        &mut self,
        chain: ChainId,
        volume: f64,
        quality: f64,
        tolerance: f64,
    ) {
        if volume <= 0.0 {
            return;
        }
        if let Some(last) = self.chains[chain.index()].last {
            let seg = self.arena.get_mut(last);
            if (seg.quality - quality).abs() < tolerance {
                seg.quality = (seg.quality * seg.volume + quality * volume) / (seg.volume + volume);
                seg.volume += volume;
                return;
            }
        }
        // Failure is reported through `is_out_of_memory`.
        let _ = self.add_segment(chain, volume, quality);
    }

    /// Reverse `chain` in place: head becomes tail.
    pub fn reverse(&mut self, chain: ChainId) {
        let c = &mut self.chains[chain.index()];
        let mut cursor = c.first;
        while let Some(handle) = cursor {
            let seg = self.arena.get_mut(handle);
            std::mem::swap(&mut seg.upstream, &mut seg.downstream);
            cursor = seg.downstream;
        }
        std::mem::swap(&mut c.first, &mut c.last);
    }

    /// Move every segment of `chain` to the free list.
    pub fn remove_all(&mut self, chain: ChainId) {
        let c = std::mem::take(&mut self.chains[chain.index()]);
        let mut cursor = c.first;
        while let Some(handle) = cursor {
            cursor = self.arena.get(handle).upstream;
            self.free.push(handle);
        }
    }

    /// Empty every chain, drop the free list, rewind the arena's active
    /// pool and clear the out-of-memory flag and counters.
    pub fn reset(&mut self) -> Result<(), ArenaError> {
        for c in &mut self.chains {
            *c = Chain::default();
        }
        self.free.clear();
        self.out_of_memory = false;
        self.stats = ChainStats::default();
        self.arena.reset(self.arena.active())
    }

    /// Release the arena. Chains are emptied; later additions fail and
    /// raise the out-of-memory flag. Idempotent.
    pub fn destroy(&mut self) {
        for c in &mut self.chains {
            *c = Chain::default();
        }
        self.free.clear();
        self.arena.destroy();
    }

    /// Handle of the head segment.
    pub fn first_handle(&self, chain: ChainId) -> Option<SegmentHandle> {
        self.chains[chain.index()].first
    }

    /// Handle of the tail segment.
    pub fn last_handle(&self, chain: ChainId) -> Option<SegmentHandle> {
        self.chains[chain.index()].last
    }

    /// The head segment (downstream end, oldest water).
    pub fn first(&self, chain: ChainId) -> Option<&Segment> {
        self.first_handle(chain).map(|h| self.arena.get(h))
    }

    /// The tail segment (upstream end, newest water).
    pub fn last(&self, chain: ChainId) -> Option<&Segment> {
        self.last_handle(chain).map(|h| self.arena.get(h))
    }

    /// Resolve a handle held by this store.
    pub fn segment(&self, handle: SegmentHandle) -> &Segment {
        self.arena.get(handle)
    }

    /// Resolve a handle held by this store for mutation.
    ///
    /// Callers may change `volume` and `quality`; the link fields belong
    /// to the store.
    pub fn segment_mut(&mut self, handle: SegmentHandle) -> &mut Segment {
        self.arena.get_mut(handle)
    }

    /// Iterate over `chain` from head to tail.
    pub fn iter(&self, chain: ChainId) -> ChainIter<'_> {
        ChainIter {
            arena: &self.arena,
            cursor: self.chains[chain.index()].first,
        }
    }

    /// Apply `f` to every segment of `chain`, head to tail.
    pub fn for_each_mut(&mut self, chain: ChainId, mut f: impl FnMut(&mut Segment)) {
        let mut cursor = self.chains[chain.index()].first;
        while let Some(handle) = cursor {
            let seg = self.arena.get_mut(handle);
            f(seg);
            cursor = seg.upstream;
        }
    }

    /// Total volume held by `chain`.
    pub fn volume(&self, chain: ChainId) -> f64 {
        self.iter(chain).map(|s| s.volume).sum()
    }

    /// Total constituent mass held by `chain`.
    pub fn mass(&self, chain: ChainId) -> f64 {
        self.iter(chain).map(Segment::mass).sum()
    }

    /// Number of segments in `chain`.
    pub fn len(&self, chain: ChainId) -> usize {
        self.chains[chain.index()].len
    }

    /// Whether `chain` holds no segments.
    pub fn is_empty(&self, chain: ChainId) -> bool {
        self.chains[chain.index()].first.is_none()
    }

    /// Number of chains.
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Segments currently linked into some chain.
    pub fn live_segments(&self) -> usize {
        self.chains.iter().map(|c| c.len).sum()
    }

    /// Segments waiting on the free list.
    pub fn free_segments(&self) -> usize {
        self.free.len()
    }

    /// Whether an allocation has failed since the last reset.
    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }

    /// Allocation counters.
    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// Arena blocks held.
    pub fn block_count(&self) -> usize {
        self.arena.block_count()
    }

    /// Arena bytes reserved.
    pub fn memory_bytes(&self) -> usize {
        self.arena.memory_bytes()
    }
}

/// Head-to-tail iterator over a chain.
pub struct ChainIter<'a> {
    arena: &'a SegmentArena,
    cursor: Option<SegmentHandle>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let seg = self.arena.get(handle);
        self.cursor = seg.upstream;
        Some(seg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: ChainId = ChainId(0);
    const B: ChainId = ChainId(1);

    fn store() -> ChainStore {
        ChainStore::new(2, ArenaConfig::default()).unwrap()
    }

    fn qualities(s: &ChainStore, chain: ChainId) -> Vec<f64> {
        s.iter(chain).map(|seg| seg.quality).collect()
    }

    #[test]
    fn add_segment_appends_at_tail() {
        let mut s = store();
        s.add_segment(A, 1.0, 10.0).unwrap();
        s.add_segment(A, 2.0, 20.0).unwrap();
        assert_eq!(qualities(&s, A), vec![10.0, 20.0]);
        assert_eq!(s.first(A).unwrap().quality, 10.0);
        assert_eq!(s.last(A).unwrap().quality, 20.0);
        assert_eq!(s.len(A), 2);
        assert!(s.is_empty(B));
    }

    #[test]
    fn consume_walks_from_head_and_recycles() {
        let mut s = store();
        s.add_segment(A, 1.0, 10.0);
        s.add_segment(A, 2.0, 20.0);
        let w = s.consume_from_head(A, 2.0);
        assert_eq!(w.volume, 2.0);
        assert_eq!(w.mass, 10.0 + 20.0);
        assert_eq!(s.len(A), 1);
        assert_eq!(s.first(A).unwrap().volume, 1.0);
        assert_eq!(s.free_segments(), 1);
    }

    #[test]
    fn consume_shortfall_contributes_nothing() {
        let mut s = store();
        s.add_segment(A, 1.0, 4.0);
        let w = s.consume_from_head(A, 5.0);
        assert_eq!(w.volume, 1.0);
        assert_eq!(w.quality(), Some(4.0));
        assert!(s.is_empty(A));
        assert_eq!(s.consume_from_head(A, 1.0), Withdrawal::default());
    }

    #[test]
    fn freed_segment_is_next_one_handed_out() {
        let mut s = store();
        let h = s.add_segment(A, 1.0, 1.0).unwrap();
        s.consume_from_head(A, 1.0);
        let again = s.add_segment(B, 3.0, 2.0).unwrap();
        assert_eq!(h, again);
        assert_eq!(s.stats().reuse_hits, 1);
        assert_eq!(s.stats().fresh_allocations, 1);
        assert_eq!(s.segment(again).volume, 3.0);
    }

    #[test]
    fn merge_within_tolerance_mixes_by_volume() {
        let mut s = store();
        s.append_or_merge_at_tail(A, 1.0, 1.0, 0.01);
        s.append_or_merge_at_tail(A, 1.0, 1.005, 0.01);
        assert_eq!(s.len(A), 1);
        assert!((s.last(A).unwrap().quality - 1.0025).abs() < 1e-12);
        s.append_or_merge_at_tail(A, 1.0, 2.0, 0.01);
        assert_eq!(s.len(A), 2);
        s.append_or_merge_at_tail(A, 0.0, 9.0, 0.01);
        assert_eq!(s.len(A), 2);
    }

    #[test]
    fn keep_last_pins_the_final_segment() {
        let mut s = store();
        s.add_segment(A, 1.0, 1.0);
        s.add_segment(A, 1.0, 3.0);
        let w = s.drain_head(A, 5.0, true);
        assert_eq!(w.volume, 5.0);
        assert_eq!(w.mass, 1.0 + 4.0 * 3.0);
        assert_eq!(s.len(A), 1);
        assert_eq!(s.first(A).unwrap().volume, 0.0);
    }

    #[test]
    fn drain_tail_takes_newest_first() {
        let mut s = store();
        s.add_segment(A, 1.0, 1.0);
        s.add_segment(A, 1.0, 2.0);
        s.add_segment(A, 1.0, 3.0);
        let w = s.drain_tail(A, 1.5, true);
        assert_eq!(w.mass, 3.0 + 0.5 * 2.0);
        assert_eq!(qualities(&s, A), vec![1.0, 2.0]);
        assert_eq!(s.last(A).unwrap().volume, 0.5);
    }

    #[test]
    fn reverse_swaps_ends() {
        let mut s = store();
        for q in [1.0, 2.0, 3.0] {
            s.add_segment(A, 1.0, q);
        }
        s.reverse(A);
        assert_eq!(qualities(&s, A), vec![3.0, 2.0, 1.0]);
        let w = s.consume_from_head(A, 1.0);
        assert_eq!(w.mass, 3.0);
        s.add_segment(A, 1.0, 0.0);
        assert_eq!(qualities(&s, A), vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn remove_all_recycles_every_segment() {
        let mut s = store();
        for _ in 0..4 {
            s.add_segment(A, 1.0, 1.0);
        }
        s.remove_all(A);
        assert!(s.is_empty(A));
        assert_eq!(s.free_segments(), 4);
        assert_eq!(s.live_segments(), 0);
    }

    #[test]
    fn exhaustion_sets_sticky_flag() {
        let config = ArenaConfig {
            block_bytes: std::mem::size_of::<Segment>() * 2,
            max_blocks: 1,
        };
        let mut s = ChainStore::new(1, config).unwrap();
        assert!(s.add_segment(A, 1.0, 0.0).is_some());
        assert!(s.add_segment(A, 1.0, 0.0).is_some());
        assert!(s.add_segment(A, 1.0, 0.0).is_none());
        assert!(s.is_out_of_memory());
        assert_eq!(s.len(A), 2);

        s.reset().unwrap();
        assert!(!s.is_out_of_memory());
        assert!(s.add_segment(A, 1.0, 0.0).is_some());
    }

    #[test]
    fn failed_tail_append_raises_flag() {
        let config = ArenaConfig {
            block_bytes: std::mem::size_of::<Segment>(),
            max_blocks: 1,
        };
        let mut s = ChainStore::new(1, config).unwrap();
        s.append_or_merge_at_tail(A, 1.0, 0.0, 0.01);
        // Merging needs no new record.
        s.append_or_merge_at_tail(A, 1.0, 0.005, 0.01);
        assert!(!s.is_out_of_memory());
        s.append_or_merge_at_tail(A, 1.0, 5.0, 0.01);
        assert!(s.is_out_of_memory());
        assert_eq!(s.len(A), 1);
        assert!((s.volume(A) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn destroy_empties_chains_and_is_idempotent() {
        let mut s = store();
        s.add_segment(A, 1.0, 1.0);
        s.destroy();
        s.destroy();
        assert!(s.is_empty(A));
        assert_eq!(s.memory_bytes(), 0);
        assert!(s.add_segment(A, 1.0, 1.0).is_none());
        assert!(s.is_out_of_memory());
    }

    proptest! {
        #[test]
        fn volume_is_conserved(ops in proptest::collection::vec((0.0f64..5.0, any::<bool>()), 1..60)) {
            let mut s = store();
            let mut expected = 0.0;
            for (v, add) in ops {
                if add {
                    s.append_or_merge_at_tail(A, v, v.floor(), 0.5);
                    if v > 0.0 {
                        expected += v;
                    }
                } else {
                    expected -= s.consume_from_head(A, v).volume;
                }
            }
            prop_assert!((s.volume(A) - expected).abs() < 1e-9);
        }

        #[test]
        fn reversing_twice_restores_order(qs in proptest::collection::vec(0.0f64..100.0, 0..30)) {
            let mut s = store();
            for &q in &qs {
                s.add_segment(A, 1.0, q);
            }
            s.reverse(A);
            s.reverse(A);
            prop_assert_eq!(qualities(&s, A), qs);
        }
    }
}
