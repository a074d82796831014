//! # Geometry
//!
//! Derives everything the initialiser and the executor need from the
//! registered distances: block counts and traversal counts per distance, and
//! the normalised buffer size `B` together with the address stride `S`.
//!
//! `B` is grown until `gcd(B, S) == 1`. Stepping by `S` modulo `B` then hits
//! every block exactly once before returning to block 0, which is what lets a
//! dependency chain with stride `S` cover the whole buffer in a single cycle.
use crate::buffer::ENTRIES_PER_BLOCK;
use crate::config::Config;
use crate::error::DistgenError;
use crate::format_size;
use log::info;

/// Access granularity in bytes (one cache line)
pub const BLOCK_LEN: u64 = 64;

/// Numerator and denominator of the pseudo-random stride ratio
const STRIDE_NUM: u64 = 7;
const STRIDE_DEN: u64 = 17;

pub fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Number of blocks needed to cover `bytes`
pub fn raw_blocks(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_LEN)
}

/// Stride in blocks: 1 for sequential addressing, otherwise 7/17 of the
/// buffer. Never 0, which would make [`adjust_size`] spin forever.
pub fn stride_for(raw_blocks: u64, pseudo_random: bool) -> u64 {
    if pseudo_random {
        (raw_blocks * STRIDE_NUM / STRIDE_DEN).max(1)
    } else {
        1
    }
}

/// Grow `blocks` until it is coprime with `stride`
pub fn adjust_size(mut blocks: u64, stride: u64) -> u64 {
    while gcd(blocks, stride) > 1 {
        blocks += 1;
    }
    blocks
}

/// Derived sizes for one run. Shared read-only by every thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    /// Distances in bytes, descending
    pub dist_sizes: Vec<u64>,
    /// Blocks swept per traversal of each distance
    pub dist_blocks: Vec<u64>,
    /// Traversals of each distance per outer iteration
    pub dist_iters: Vec<u64>,
    /// Normalised buffer size in blocks
    pub blocks: u64,
    /// Address stride in blocks, coprime with `blocks`
    pub stride: u64,
}

impl Geometry {
    pub fn new(config: &Config) -> Result<Self, DistgenError> {
        let largest = config.distances.largest().ok_or(DistgenError::NoDistances)?;

        let dist_sizes: Vec<u64> = config.distances.iter().collect();
        let dist_blocks = dist_sizes.iter().map(|&d| raw_blocks(d)).collect();
        let dist_iters = dist_sizes.iter().map(|&d| largest / d).collect();

        let raw = raw_blocks(largest);
        let stride = stride_for(raw, config.pseudo_random);
        let blocks = adjust_size(raw, stride);

        Ok(Geometry {
            dist_sizes,
            dist_blocks,
            dist_iters,
            blocks,
            stride,
        })
    }

    /// Number of 16-byte entries in one thread's buffer
    pub fn entries(&self) -> u64 {
        self.blocks * ENTRIES_PER_BLOCK as u64
    }

    /// Stride expressed in entries
    pub fn stride_entries(&self) -> u64 {
        self.stride * ENTRIES_PER_BLOCK as u64
    }

    /// Bytes allocated per thread, saturating at `u64::MAX`
    pub fn buffer_bytes(&self) -> u64 {
        self.blocks.saturating_mul(BLOCK_LEN)
    }

    /// Accesses one thread performs per outer iteration, counting a
    /// read-modify-write as two accesses.
    pub fn accesses_per_iteration(&self, write: bool) -> u64 {
        let reads: u64 = self
            .dist_iters
            .iter()
            .zip(&self.dist_blocks)
            .map(|(iters, blocks)| iters * blocks)
            .sum();
        if write { reads * 2 } else { reads }
    }

    /// Diagnostic summary, only emitted when `config.verbose` is set
    pub fn log_summary(&self, config: &Config) {
        if !config.verbose {
            return;
        }

        info!("number of distances: {}", self.dist_sizes.len());
        for (d, (size, iters)) in self.dist_sizes.iter().zip(&self.dist_iters).enumerate() {
            info!(
                "  D{:2}: size {} ({} traversals per iteration)",
                d + 1,
                format_size(*size),
                iters
            );
        }

        let threads = config.threads as u64;
        let per_iter = self.accesses_per_iteration(config.write);
        let total = per_iter
            .saturating_mul(threads)
            .saturating_mul(config.iterations);
        info!(
            "buffer size per thread {} (total {}), address diff {}",
            format_size(self.buffer_bytes()),
            format_size(self.buffer_bytes().saturating_mul(threads)),
            BLOCK_LEN * self.stride
        );
        info!(
            "accesses per iteration and thread: {} (total {} accs = {})",
            per_iter,
            total,
            format_size(total.saturating_mul(BLOCK_LEN))
        );
    }
}
