//! # Thread buffers
//!
//! A [`ThreadBuffer`] is one thread's private working set: a cache-line
//! aligned array of 16-byte [`Entry`] records. Only the first entry of every
//! block is ever touched by the benchmark; the rest pad the block out to a
//! full cache line.
//!
//! The dependency chain is stored in the entries themselves. `next` holds the
//! index of the following entry in the same buffer, so a traversal cannot
//! compute its next address before the current load completes.
use crate::error::DistgenError;
use crate::geometry::BLOCK_LEN;
use std::mem::size_of;

/// Link value of an entry not yet part of the chain
pub const UNLINKED: u64 = u64::MAX;

/// One access unit: payload plus link to the next unit in the chain.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub v: f64,
    pub next: u64,
}

const _: () = assert!(size_of::<Entry>() == 16);

/// Entries per cache-line block
pub const ENTRIES_PER_BLOCK: usize = BLOCK_LEN as usize / size_of::<Entry>();

// only ever read through the flat `entries` view
#[allow(dead_code)]
#[repr(C, align(64))]
#[derive(Clone, Copy)]
struct Block([Entry; ENTRIES_PER_BLOCK]);

const _: () = assert!(size_of::<Block>() == BLOCK_LEN as usize);

/// A thread's buffer, exclusively owned by the thread that sweeps it.
pub struct ThreadBuffer {
    blocks: Vec<Block>,
}

impl ThreadBuffer {
    /// Allocate `blocks` cache lines. Every payload starts as its own entry
    /// index and every link as [`UNLINKED`].
    pub fn new(blocks: u64) -> Result<Self, DistgenError> {
        let bytes = blocks.saturating_mul(BLOCK_LEN);
        let count = usize::try_from(blocks).map_err(|_| DistgenError::Allocation { bytes })?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(count)
            .map_err(|_| DistgenError::Allocation { bytes })?;
        storage.extend((0..count).map(|b| {
            let base = b * ENTRIES_PER_BLOCK;
            Block(std::array::from_fn(|i| Entry {
                v: (base + i) as f64,
                next: UNLINKED,
            }))
        }));

        Ok(ThreadBuffer { blocks: storage })
    }

    /// Number of cache-line blocks
    pub fn blocks(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Flat view over every entry of the buffer
    pub fn entries(&self) -> &[Entry] {
        // SAFETY: `Block` is `repr(C)` around `[Entry; ENTRIES_PER_BLOCK]` and its
        // size is asserted equal to that array, so the blocks are a contiguous
        // run of `len * ENTRIES_PER_BLOCK` initialised entries.
        unsafe {
            std::slice::from_raw_parts(
                self.blocks.as_ptr().cast::<Entry>(),
                self.blocks.len() * ENTRIES_PER_BLOCK,
            )
        }
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        // SAFETY: see `entries`; the borrow of `self` is exclusive.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.blocks.as_mut_ptr().cast::<Entry>(),
                self.blocks.len() * ENTRIES_PER_BLOCK,
            )
        }
    }

    /// Link the first entry of every block into one cycle with a step of
    /// `stride` blocks, starting at block 0.
    ///
    /// # Panics
    ///
    /// If an entry is linked twice, which happens when `stride` is not coprime
    /// with the block count, or if `stride` exceeds the block count.
    pub fn link_chain(&mut self, stride: u64) {
        let blocks = self.blocks();
        assert!(
            stride >= 1 && stride <= blocks,
            "stride {stride} outside 1..={blocks}"
        );
        let idx_max = blocks * ENTRIES_PER_BLOCK as u64;
        let idx_incr = stride * ENTRIES_PER_BLOCK as u64;
        let entries = self.entries_mut();

        let mut idx = 0u64;
        for _ in 0..blocks {
            let mut next = idx + idx_incr;
            if next >= idx_max {
                next -= idx_max;
            }
            let entry = &mut entries[idx as usize];
            assert_eq!(entry.next, UNLINKED, "entry {idx} linked twice");
            entry.next = next;
            idx = next;
        }
    }

    /// Block offsets in chain order, starting from block 0, one full lap
    pub fn chain_order(&self) -> Vec<u64> {
        let entries = self.entries();
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut idx = 0u64;
        for _ in 0..self.blocks.len() {
            order.push(idx / ENTRIES_PER_BLOCK as u64);
            idx = entries[idx as usize].next;
        }
        order
    }
}
