//! Pooled segment arena.
//!
//! A [`SegmentArena`] holds one or more pools, each a [`BlockList`] with
//! its own epoch. Allocations are drawn from the active pool. Pools are
//! released wholesale: [`SegmentArena::reset`] rewinds a pool (keeping its
//! blocks) and [`SegmentArena::destroy_pool`] frees it.

use plume_core::PoolId;

use crate::block::BlockList;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::SegmentHandle;
use crate::segment::Segment;

struct Pool {
    blocks: BlockList,
    epoch: u32,
}

/// Owner of every segment record.
pub struct SegmentArena {
    pools: Vec<Option<Pool>>,
    active: PoolId,
    config: ArenaConfig,
}

impl SegmentArena {
    /// Create an arena with pool 0 active and one block reserved.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let first = Pool {
            blocks: BlockList::new(config.block_len(), config.max_blocks)?,
            epoch: 0,
        };
        Ok(Self {
            pools: vec![Some(first)],
            active: PoolId(0),
            config,
        })
    }

    /// Allocate a record from the active pool.
    pub fn allocate(&mut self, segment: Segment) -> Result<SegmentHandle, ArenaError> {
        let active = self.active;
        let pool = self.pool_mut(active)?;
        let (block, slot) = pool.blocks.alloc(segment)?;
        Ok(SegmentHandle::new(active, pool.epoch, block, slot))
    }

    /// Resolve a handle, reporting unknown pools and stale epochs.
    pub fn try_get(&self, handle: SegmentHandle) -> Result<&Segment, ArenaError> {
        let pool = self.pool(handle.pool)?;
        check_epoch(handle, pool)?;
        pool.blocks
            .get(handle.block, handle.slot)
            .ok_or(ArenaError::StaleHandle {
                handle_epoch: handle.epoch,
                current_epoch: pool.epoch,
            })
    }

    /// Resolve a handle for mutation.
    pub fn try_get_mut(&mut self, handle: SegmentHandle) -> Result<&mut Segment, ArenaError> {
        let pool = self.pool_mut(handle.pool)?;
        check_epoch(handle, pool)?;
        let current_epoch = pool.epoch;
        pool.blocks
            .get_mut(handle.block, handle.slot)
            .ok_or(ArenaError::StaleHandle {
                handle_epoch: handle.epoch,
                current_epoch,
            })
    }

    /// Resolve a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or its pool is gone. Handles held by
    /// a [`ChainStore`](crate::ChainStore) are always live.
    pub fn get(&self, handle: SegmentHandle) -> &Segment {
        match self.try_get(handle) {
            Ok(segment) => segment,
            Err(e) => panic!("invalid {handle}: {e}"),
        }
    }

    /// Resolve a handle for mutation.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or its pool is gone.
    pub fn get_mut(&mut self, handle: SegmentHandle) -> &mut Segment {
        match self.try_get_mut(handle) {
            Ok(segment) => segment,
            Err(e) => panic!("invalid {handle}: {e}"),
        }
    }

    /// Rewind a pool: every block's cursor returns to zero and every
    /// handle issued from it becomes stale. Blocks are kept for reuse.
    pub fn reset(&mut self, pool: PoolId) -> Result<(), ArenaError> {
        let pool = self.pool_mut(pool)?;
        pool.blocks.reset();
        pool.epoch = pool.epoch.wrapping_add(1);
        Ok(())
    }

    /// Create an empty pool with one reserved block.
    pub fn create_pool(&mut self) -> Result<PoolId, ArenaError> {
        let pool = Pool {
            blocks: BlockList::new(self.config.block_len(), self.config.max_blocks)?,
            epoch: 0,
        };
        self.pools.push(Some(pool));
        Ok(PoolId(self.pools.len() as u32 - 1))
    }

    /// Make `pool` the source of future allocations, returning the
    /// previously active pool.
    pub fn set_active(&mut self, pool: PoolId) -> Result<PoolId, ArenaError> {
        self.pool(pool)?;
        Ok(std::mem::replace(&mut self.active, pool))
    }

    /// The pool allocations are drawn from.
    pub fn active(&self) -> PoolId {
        self.active
    }

    /// Release every block of a pool. The active pool cannot be destroyed.
    pub fn destroy_pool(&mut self, pool: PoolId) -> Result<(), ArenaError> {
        if pool == self.active {
            return Err(ArenaError::ActivePool { pool });
        }
        self.pool(pool)?;
        self.pools[pool.0 as usize] = None;
        Ok(())
    }

    /// Release every pool. Idempotent; later allocations fail with
    /// [`ArenaError::UnknownPool`].
    pub fn destroy(&mut self) {
        self.pools.clear();
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.pools.is_empty()
    }

    /// Blocks held across all pools.
    pub fn block_count(&self) -> usize {
        self.live_pools().map(|p| p.blocks.block_count()).sum()
    }

    /// Bytes reserved across all pools.
    pub fn memory_bytes(&self) -> usize {
        self.live_pools().map(|p| p.blocks.memory_bytes()).sum()
    }

    /// Records handed out across all pools since their last reset.
    pub fn allocated(&self) -> usize {
        self.live_pools().map(|p| p.blocks.total_used()).sum()
    }

    fn live_pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter().flatten()
    }

    fn pool(&self, pool: PoolId) -> Result<&Pool, ArenaError> {
        self.pools
            .get(pool.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(ArenaError::UnknownPool { pool })
    }

    fn pool_mut(&mut self, pool: PoolId) -> Result<&mut Pool, ArenaError> {
        self.pools
            .get_mut(pool.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(ArenaError::UnknownPool { pool })
    }
}

fn check_epoch(handle: SegmentHandle, pool: &Pool) -> Result<(), ArenaError> {
    if handle.epoch != pool.epoch {
        return Err(ArenaError::StaleHandle {
            handle_epoch: handle.epoch,
            current_epoch: pool.epoch,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ArenaConfig {
        ArenaConfig {
            block_bytes: std::mem::size_of::<Segment>() * 4,
            max_blocks: 2,
        }
    }

    #[test]
    fn allocate_and_read_back() {
        let mut arena = SegmentArena::new(small()).unwrap();
        let h = arena.allocate(Segment::new(2.0, 3.0)).unwrap();
        assert_eq!(arena.get(h).mass(), 6.0);
        arena.get_mut(h).quality = 1.0;
        assert_eq!(arena.try_get(h).unwrap().quality, 1.0);
    }

    #[test]
    fn reset_makes_handles_stale() {
        let mut arena = SegmentArena::new(small()).unwrap();
        let h = arena.allocate(Segment::new(1.0, 0.0)).unwrap();
        arena.reset(PoolId(0)).unwrap();
        assert!(matches!(
            arena.try_get(h),
            Err(ArenaError::StaleHandle { .. })
        ));
        assert_eq!(arena.allocated(), 0);
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    fn exhaustion_is_an_error_not_a_panic() {
        let mut arena = SegmentArena::new(small()).unwrap();
        for _ in 0..8 {
            arena.allocate(Segment::new(1.0, 0.0)).unwrap();
        }
        assert!(matches!(
            arena.allocate(Segment::new(1.0, 0.0)),
            Err(ArenaError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn pools_are_independent() {
        let mut arena = SegmentArena::new(small()).unwrap();
        let a = arena.allocate(Segment::new(1.0, 0.0)).unwrap();
        let second = arena.create_pool().unwrap();
        assert_eq!(arena.set_active(second).unwrap(), PoolId(0));
        let b = arena.allocate(Segment::new(2.0, 0.0)).unwrap();
        assert_eq!(b.pool(), second);

        arena.reset(second).unwrap();
        assert!(arena.try_get(a).is_ok());
        assert!(arena.try_get(b).is_err());

        assert_eq!(
            arena.destroy_pool(second),
            Err(ArenaError::ActivePool { pool: second })
        );
        arena.set_active(PoolId(0)).unwrap();
        arena.destroy_pool(second).unwrap();
        assert_eq!(
            arena.try_get(b),
            Err(ArenaError::UnknownPool { pool: second })
        );
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut arena = SegmentArena::new(small()).unwrap();
        arena.destroy();
        arena.destroy();
        assert!(arena.is_destroyed());
        assert_eq!(arena.memory_bytes(), 0);
        assert!(matches!(
            arena.allocate(Segment::new(1.0, 0.0)),
            Err(ArenaError::UnknownPool { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "invalid SegmentHandle")]
    fn get_panics_on_stale_handle() {
        let mut arena = SegmentArena::new(small()).unwrap();
        let h = arena.allocate(Segment::new(1.0, 0.0)).unwrap();
        arena.reset(PoolId(0)).unwrap();
        let _ = arena.get(h);
    }
}
