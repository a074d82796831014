//! # Benchmark executor
//!
//! Runs the timed sweeps over one thread's buffer. The caller owns timing and
//! threading; this module only walks memory and keeps a checksum so the
//! compiler cannot drop the loads.
use crate::buffer::{Entry, ThreadBuffer};
use crate::geometry::Geometry;
use std::hint::black_box;

/// Value the chain-write sweep leaves behind in every unit it touches
pub const CHAIN_WRITE_VALUE: f64 = 1.23;

/// Addressing and write combination, chosen once per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Computed strided addresses, loads only
    SequentialRead,
    /// Follow the dependency chain, loads only
    ChainRead,
    /// Computed strided addresses, increment in place
    SequentialWrite,
    /// Follow the dependency chain, increment then overwrite with [`CHAIN_WRITE_VALUE`]
    ChainWrite,
}

impl AccessMode {
    pub fn from_flags(dep_chain: bool, write: bool) -> Self {
        match (dep_chain, write) {
            (false, false) => AccessMode::SequentialRead,
            (true, false) => AccessMode::ChainRead,
            (false, true) => AccessMode::SequentialWrite,
            (true, true) => AccessMode::ChainWrite,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, AccessMode::SequentialWrite | AccessMode::ChainWrite)
    }
}

/// Running checksum and access count, carried across calls
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub sum: f64,
    pub accesses: u64,
}

impl Totals {
    /// Fold another thread's totals into this one
    pub fn merge(&mut self, other: Totals) {
        self.sum += other.sum;
        self.accesses += other.accesses;
    }
}

/// Sweep `buf` for `iterations` outer iterations, adding to `totals`.
///
/// Each iteration reads entry 0 once, then for every distance reads entry 0
/// again and walks that distance's block range `dist_iters[d]` times.
///
/// # Panics
///
/// If `buf` was not built for `geometry`.
#[inline(never)]
pub fn run_bench(
    buf: &mut ThreadBuffer,
    geometry: &Geometry,
    iterations: u64,
    mode: AccessMode,
    totals: &mut Totals,
) {
    assert_eq!(buf.blocks(), geometry.blocks, "buffer does not match geometry");

    let idx_incr = geometry.stride_entries() as usize;
    let idx_max = geometry.entries() as usize;
    let entries = buf.entries_mut();

    let mut lsum = totals.sum;
    let mut accesses = totals.accesses;
    for _ in 0..iterations {
        lsum += entries[0].v;
        for (&steps, &traversals) in geometry.dist_blocks.iter().zip(&geometry.dist_iters) {
            lsum += entries[0].v;
            for _ in 0..traversals {
                accesses += steps;
                lsum = match mode {
                    AccessMode::SequentialRead => sequential_read(entries, steps, idx_incr, idx_max, lsum),
                    AccessMode::ChainRead => chain_read(entries, steps, lsum),
                    AccessMode::SequentialWrite => {
                        sequential_write(entries, steps, idx_incr, idx_max, lsum)
                    }
                    AccessMode::ChainWrite => chain_write(entries, steps, lsum),
                };
            }
        }
    }

    totals.sum = black_box(lsum);
    totals.accesses = accesses;
}

#[inline(always)]
fn sequential_read(entries: &[Entry], steps: u64, incr: usize, max: usize, mut sum: f64) -> f64 {
    let mut idx = 0;
    for _ in 0..steps {
        sum += entries[idx].v;
        idx += incr;
        if idx >= max {
            idx -= max;
        }
    }
    sum
}

#[inline(always)]
fn chain_read(entries: &[Entry], steps: u64, mut sum: f64) -> f64 {
    let mut idx = 0;
    for _ in 0..steps {
        let e = &entries[idx];
        sum += e.v;
        idx = e.next as usize;
    }
    sum
}

#[inline(always)]
fn sequential_write(entries: &mut [Entry], steps: u64, incr: usize, max: usize, mut sum: f64) -> f64 {
    let mut idx = 0;
    for _ in 0..steps {
        let e = &mut entries[idx];
        e.v += 1.0;
        sum += e.v;
        idx += incr;
        if idx >= max {
            idx -= max;
        }
    }
    sum
}

#[inline(always)]
fn chain_write(entries: &mut [Entry], steps: u64, mut sum: f64) -> f64 {
    let mut idx = 0;
    for _ in 0..steps {
        let e = &mut entries[idx];
        e.v += 1.0;
        sum += e.v;
        e.v = CHAIN_WRITE_VALUE;
        idx = e.next as usize;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ENTRIES_PER_BLOCK;
    use crate::config::Config;
    use crate::distance::DistanceRegistry;

    /// Payload of the first entry of every block, in block order
    fn block_payloads(buf: &ThreadBuffer) -> Vec<f64> {
        buf.entries()
            .iter()
            .step_by(ENTRIES_PER_BLOCK)
            .map(|e| e.v)
            .collect()
    }

    fn setup(sizes: &[u64], pseudo_random: bool) -> (Geometry, ThreadBuffer) {
        let cfg = Config {
            pseudo_random,
            iterations: 1,
            distances: DistanceRegistry::try_from(sizes).unwrap(),
            ..Config::default()
        };
        let geo = Geometry::new(&cfg).unwrap();
        let mut buf = ThreadBuffer::new(geo.blocks).unwrap();
        buf.link_chain(geo.stride);
        (geo, buf)
    }

    #[test]
    fn mode_from_flags() {
        assert_eq!(AccessMode::from_flags(false, false), AccessMode::SequentialRead);
        assert_eq!(AccessMode::from_flags(true, false), AccessMode::ChainRead);
        assert_eq!(AccessMode::from_flags(false, true), AccessMode::SequentialWrite);
        assert_eq!(AccessMode::from_flags(true, true), AccessMode::ChainWrite);
        assert!(AccessMode::ChainWrite.is_write());
        assert!(!AccessMode::ChainRead.is_write());
    }

    #[test]
    fn sequential_read_sum_and_count() {
        let (geo, mut buf) = setup(&[4096, 1024], false);
        let mut totals = Totals::default();
        run_bench(&mut buf, &geo, 1, AccessMode::SequentialRead, &mut totals);
        // block b holds 4 * b: 64 blocks once, then the first 16 blocks 4 times
        let big: f64 = (0..64).map(|b| 4.0 * b as f64).sum();
        let small: f64 = (0..16).map(|b| 4.0 * b as f64).sum();
        assert_eq!(totals.sum, big + 4.0 * small);
        assert_eq!(totals.accesses, 128);
    }

    #[test]
    fn totals_accumulate_across_calls() {
        let (geo, mut buf) = setup(&[4096, 1024], false);
        let mut totals = Totals {
            sum: 5.0,
            accesses: 7,
        };
        run_bench(&mut buf, &geo, 2, AccessMode::ChainRead, &mut totals);
        assert_eq!(totals.accesses, 7 + 2 * 128);
        assert_eq!(totals.sum, 5.0 + 2.0 * 9984.0);
    }

    #[test]
    fn chain_and_sequential_reads_agree() {
        for pseudo_random in [false, true] {
            let (geo, mut buf) = setup(&[1 << 16, 1 << 12, 1000], pseudo_random);
            let mut seq = Totals::default();
            let mut chain = Totals::default();
            run_bench(&mut buf, &geo, 3, AccessMode::SequentialRead, &mut seq);
            run_bench(&mut buf, &geo, 3, AccessMode::ChainRead, &mut chain);
            assert_eq!(seq, chain);
        }
    }

    #[test]
    fn read_modes_leave_payloads_alone() {
        let (geo, mut buf) = setup(&[8192, 512], true);
        let before = buf.entries().to_vec();
        let mut totals = Totals::default();
        run_bench(&mut buf, &geo, 4, AccessMode::SequentialRead, &mut totals);
        run_bench(&mut buf, &geo, 4, AccessMode::ChainRead, &mut totals);
        assert_eq!(buf.entries(), before.as_slice());
    }

    #[test]
    fn sequential_write_increments_touched_blocks() {
        let (geo, mut buf) = setup(&[4096], false);
        let mut totals = Totals::default();
        run_bench(&mut buf, &geo, 1, AccessMode::SequentialWrite, &mut totals);
        let payloads = block_payloads(&buf);
        for (b, v) in payloads.iter().enumerate() {
            assert_eq!(*v, 4.0 * b as f64 + 1.0);
        }
        assert_eq!(totals.sum, (0..64).map(|b| 4.0 * b as f64 + 1.0).sum::<f64>());
        assert_eq!(totals.accesses, 64);
    }

    #[test]
    fn chain_write_leaves_constant() {
        let (geo, mut buf) = setup(&[4096, 2048], true);
        let before = buf.entries().to_vec();
        let mut totals = Totals::default();
        run_bench(&mut buf, &geo, 2, AccessMode::ChainWrite, &mut totals);

        let touched: std::collections::HashSet<u64> = buf.chain_order().into_iter().collect();
        for (b, v) in block_payloads(&buf).iter().enumerate() {
            if touched.contains(&(b as u64)) {
                assert_eq!(*v, CHAIN_WRITE_VALUE);
            }
        }
        // padding entries are never touched
        for (i, (now, was)) in buf.entries().iter().zip(&before).enumerate() {
            if i % ENTRIES_PER_BLOCK != 0 {
                assert_eq!(now, was);
            }
        }
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn mismatched_buffer_panics() {
        let (geo, _) = setup(&[4096], false);
        let mut other = ThreadBuffer::new(geo.blocks + 1).unwrap();
        run_bench(&mut other, &geo, 1, AccessMode::SequentialRead, &mut Totals::default());
    }
}
