//! # Per-thread initialisation
//!
//! Every thread allocates and links its own buffer concurrently. All threads
//! work on disjoint memory, so nothing is shared except the block count and
//! stride copied into each worker. Initialisation only counts as done once
//! every worker has been joined.
use crate::buffer::ThreadBuffer;
use crate::config::Config;
use crate::error::DistgenError;
use crate::geometry::Geometry;
use crate::workers::WorkerSet;
use log::debug;

/// Allocate, fill and chain one buffer per thread. Buffers are returned in
/// thread-id order. Any failure in any thread fails the whole call.
pub fn init_buffers(config: &Config, geometry: &Geometry) -> Result<Vec<ThreadBuffer>, DistgenError> {
    config.validate()?;

    let blocks = geometry.blocks;
    let stride = geometry.stride;
    let mut workers = WorkerSet::new();
    for tid in 0..config.threads {
        let work = move || -> Result<ThreadBuffer, DistgenError> {
            debug!("thread {} allocating {} blocks", tid, blocks);
            let mut buf = ThreadBuffer::new(blocks)?;
            buf.link_chain(stride);
            debug!("thread {} chain linked (stride {})", tid, stride);
            Ok(buf)
        };
        workers.spawn(format!("distgen-init-{tid}"), tid, config.pin_threads, work)?;
    }

    workers.wait()?.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceRegistry;

    fn config(threads: usize, pseudo_random: bool) -> Config {
        Config {
            threads,
            pseudo_random,
            iterations: 1,
            distances: DistanceRegistry::try_from(&[8192u64, 1024][..]).unwrap(),
            ..Config::default()
        }
    }

    #[test]
    fn one_buffer_per_thread() {
        let cfg = config(3, true);
        let geo = Geometry::new(&cfg).unwrap();
        let bufs = init_buffers(&cfg, &geo).unwrap();
        assert_eq!(bufs.len(), 3);
        for buf in &bufs {
            assert_eq!(buf.blocks(), geo.blocks);
            assert_eq!(buf.chain_order().len() as u64, geo.blocks);
        }
        // disjoint allocations
        assert_ne!(bufs[0].entries().as_ptr(), bufs[1].entries().as_ptr());
    }

    #[test]
    fn bad_thread_count_spawns_nothing() {
        let cfg = config(0, false);
        let geo = Geometry::new(&cfg).unwrap();
        assert!(matches!(
            init_buffers(&cfg, &geo),
            Err(DistgenError::ThreadCount { requested: 0, .. })
        ));
    }

    #[test]
    fn allocation_failure_returns_no_buffers() {
        let cfg = Config {
            threads: 2,
            iterations: 1,
            distances: DistanceRegistry::try_from(&[u64::MAX][..]).unwrap(),
            ..Config::default()
        };
        let geo = Geometry::new(&cfg).unwrap();
        assert!(matches!(
            init_buffers(&cfg, &geo),
            Err(DistgenError::Allocation { .. })
        ));
    }

    #[test]
    fn broken_geometry_is_fatal() {
        let cfg = config(2, false);
        let mut geo = Geometry::new(&cfg).unwrap();
        // not coprime with the block count: the chain builder must refuse
        geo.stride = 2;
        assert!(matches!(
            init_buffers(&cfg, &geo),
            Err(DistgenError::WorkerPanicked { .. })
        ));
    }
}
