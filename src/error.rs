use thiserror::Error;

/// Everything that can stop a measurement before it starts.
///
/// None of these are recoverable: a partially configured or partially
/// initialised run would report meaningless numbers, so callers are expected
/// to bail out on the first error.
#[derive(Error, Debug)]
pub enum DistgenError {
    /// More distinct distances than the registry can hold.
    #[error("too many distances: at most {max} can be registered")]
    TooManyDistances { max: usize },

    /// A distance of zero bytes has no blocks to sweep.
    #[error("distance must be a positive byte count")]
    ZeroDistance,

    #[error("no distances registered")]
    NoDistances,

    /// Thread count outside `1..max`.
    #[error("thread count {requested} out of range (1..{max})")]
    ThreadCount { requested: usize, max: usize },

    #[error("iteration count must be at least 1")]
    ZeroIterations,

    /// Buffer allocation for one thread failed.
    #[error("failed to allocate {bytes} bytes for thread buffer")]
    Allocation { bytes: u64 },

    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked before handing back its result.
    #[error("worker thread {tid} panicked")]
    WorkerPanicked { tid: usize },

    /// A size argument that is not `<number>[K|M|G]`.
    #[error("invalid size '{0}'")]
    InvalidSize(String),
}
