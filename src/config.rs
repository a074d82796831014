use crate::distance::DistanceRegistry;
use crate::error::DistgenError;

/// Hard upper bound (exclusive) on worker threads
pub const MAX_THREADS: usize = 64;

/// Accesses per thread the driver aims for when no iteration count is given
pub const DEFAULT_TOTAL_ACCESSES: u64 = 1_000_000_000;

/// Run parameters, fixed before initialisation and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads, each with a private buffer
    pub threads: usize,
    /// Scatter accesses with a 7/17 stride instead of walking block by block
    pub pseudo_random: bool,
    /// Traverse the pre-linked dependency chain instead of computing addresses
    pub dep_chain: bool,
    /// Read-modify-write instead of read-only
    pub write: bool,
    /// Outer iterations per benchmark call; `0` means "derive from distances"
    pub iterations: u64,
    pub verbose: bool,
    /// Pin thread `tid` to CPU core `tid`
    pub pin_threads: bool,
    pub distances: DistanceRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            threads: 1,
            pseudo_random: false,
            dep_chain: false,
            write: false,
            iterations: 0,
            verbose: false,
            pin_threads: false,
            distances: DistanceRegistry::new(),
        }
    }
}

impl Config {
    /// Check every bound the core relies on.
    pub fn validate(&self) -> Result<(), DistgenError> {
        if self.threads == 0 || self.threads >= MAX_THREADS {
            return Err(DistgenError::ThreadCount {
                requested: self.threads,
                max: MAX_THREADS,
            });
        }
        if self.distances.is_empty() {
            return Err(DistgenError::NoDistances);
        }
        if self.iterations == 0 {
            return Err(DistgenError::ZeroIterations);
        }
        Ok(())
    }

    /// Fill in `iterations` when left at zero, so one thread performs about
    /// [`DEFAULT_TOTAL_ACCESSES`] accesses in total.
    pub fn derive_iterations(&mut self, accesses_per_iteration: u64) {
        if self.iterations == 0 {
            self.iterations = (DEFAULT_TOTAL_ACCESSES / accesses_per_iteration.max(1)).max(1);
        }
    }
}
