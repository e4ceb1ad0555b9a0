//! Fixed-size blocks of segment records and growable block lists.
//!
//! A [`Block`] is a contiguous `Vec<Segment>` of fixed capacity with bump
//! allocation. A [`BlockList`] is a growable collection of blocks that
//! overflows into a new block when the current one is full.

use crate::error::ArenaError;
use crate::segment::Segment;

/// A single contiguous block of segment records with bump allocation.
///
/// Blocks are never freed individually. They are reset (cursor back to
/// zero, memory kept) or dropped with their pool.
pub struct Block {
    /// Backing storage. Reserved to full capacity at creation.
    data: Vec<Segment>,
    /// Bump pointer: next free slot.
    cursor: usize,
    capacity: usize,
}

impl Block {
    /// Create a block holding `capacity` records.
    ///
    /// The backing storage is reserved fallibly, so an allocator refusal
    /// surfaces as [`ArenaError::AllocationFailed`] instead of aborting.
    pub fn new(capacity: usize) -> Result<Self, ArenaError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ArenaError::AllocationFailed {
                bytes: capacity.saturating_mul(std::mem::size_of::<Segment>()),
            })?;
        Ok(Self {
            data,
            cursor: 0,
            capacity,
        })
    }

    /// Bump-allocate one record, returning its slot, or `None` when full.
    ///
    /// Slots below the high-water mark left by an earlier epoch are
    /// overwritten in place.
    pub fn alloc(&mut self, segment: Segment) -> Option<usize> {
        if self.cursor >= self.capacity {
            return None;
        }
        let slot = self.cursor;
        if slot < self.data.len() {
            self.data[slot] = segment;
        } else {
            self.data.push(segment);
        }
        self.cursor += 1;
        Some(slot)
    }

    /// The record at `slot`, if it has been allocated this epoch.
    pub fn get(&self, slot: usize) -> Option<&Segment> {
        if slot < self.cursor {
            self.data.get(slot)
        } else {
            None
        }
    }

    /// Mutable access to the record at `slot`, if allocated this epoch.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Segment> {
        if slot < self.cursor {
            self.data.get_mut(slot)
        } else {
            None
        }
    }

    /// Reset the bump pointer to zero without deallocating.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Number of records currently allocated.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Total capacity in records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining free capacity in records.
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// Memory reserved by the backing storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.capacity.saturating_mul(std::mem::size_of::<Segment>())
    }
}

/// A growable list of [`Block`]s with overflow-based bump allocation.
///
/// When the current block is full, allocation advances to the next block
/// that already exists (left over from before a reset) or appends a new
/// one, up to `max_blocks`.
pub struct BlockList {
    blocks: Vec<Block>,
    block_len: usize,
    max_blocks: usize,
    /// Index of the block currently being filled.
    current: usize,
}

impl BlockList {
    /// Create a block list with one pre-allocated block.
    pub fn new(block_len: usize, max_blocks: u32) -> Result<Self, ArenaError> {
        let first = Block::new(block_len)?;
        Ok(Self {
            blocks: vec![first],
            block_len,
            max_blocks: max_blocks as usize,
            current: 0,
        })
    }

    /// Bump-allocate one record, growing into a new block if needed.
    ///
    /// Returns `(block_index, slot)`.
    pub fn alloc(&mut self, segment: Segment) -> Result<(u32, u32), ArenaError> {
        if let Some(slot) = self.blocks[self.current].alloc(segment) {
            return Ok((self.current as u32, slot as u32));
        }

        // Current block full: advance to the next existing block or create one.
        let next = self.current + 1;
        if next < self.blocks.len() {
            if let Some(slot) = self.blocks[next].alloc(segment) {
                self.current = next;
                return Ok((next as u32, slot as u32));
            }
        }

        if self.blocks.len() >= self.max_blocks {
            return Err(ArenaError::CapacityExceeded {
                blocks: self.blocks.len(),
                block_len: self.block_len,
            });
        }

        let mut block = Block::new(self.block_len)?;
        let slot = block.alloc(segment).ok_or(ArenaError::CapacityExceeded {
            blocks: self.blocks.len(),
            block_len: self.block_len,
        })?;
        self.blocks.push(block);
        self.current = self.blocks.len() - 1;
        Ok((self.current as u32, slot as u32))
    }

    /// The record at `(block, slot)`, if live.
    pub fn get(&self, block: u32, slot: u32) -> Option<&Segment> {
        self.blocks.get(block as usize)?.get(slot as usize)
    }

    /// Mutable access to the record at `(block, slot)`, if live.
    pub fn get_mut(&mut self, block: u32, slot: u32) -> Option<&mut Segment> {
        self.blocks.get_mut(block as usize)?.get_mut(slot as usize)
    }

    /// Reset all blocks' bump pointers without deallocating.
    ///
    /// After reset, allocations start from block 0 again.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.reset();
        }
        self.current = 0;
    }

    /// Total number of blocks currently allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total memory reserved across all blocks in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.iter().map(Block::memory_bytes).sum()
    }

    /// Total records handed out across all blocks.
    pub fn total_used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }
}
