//! # Distance Registry
//!
//! The set of working-set sizes ("distances") a run sweeps. Kept strictly
//! descending so index 0 is always the largest distance, which decides the
//! buffer size; every other distance is a sub-range of that buffer.
use crate::error::DistgenError;

/// Maximum number of distinct distances per run
pub const MAX_DISTANCES: usize = 8;

/// Fixed-capacity, strictly descending set of distances in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistanceRegistry {
    sizes: Vec<u64>,
}

impl DistanceRegistry {
    pub fn new() -> Self {
        DistanceRegistry {
            sizes: Vec::with_capacity(MAX_DISTANCES),
        }
    }

    /// Insert `size` keeping descending order. A value already present is
    /// ignored, so adding the same distance twice leaves the registry as it was.
    pub fn add(&mut self, size: u64) -> Result<(), DistgenError> {
        if size == 0 {
            return Err(DistgenError::ZeroDistance);
        }

        let mut pos = self.sizes.len();
        for (d, &existing) in self.sizes.iter().enumerate() {
            if existing == size {
                return Ok(());
            }
            if existing < size {
                pos = d;
                break;
            }
        }

        if self.sizes.len() >= MAX_DISTANCES {
            return Err(DistgenError::TooManyDistances { max: MAX_DISTANCES });
        }
        self.sizes.insert(pos, size);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// The largest registered distance, if any
    pub fn largest(&self) -> Option<u64> {
        self.sizes.first().copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.sizes
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.sizes.iter().copied()
    }
}

impl TryFrom<&[u64]> for DistanceRegistry {
    type Error = DistgenError;

    fn try_from(sizes: &[u64]) -> Result<Self, Self::Error> {
        let mut registry = DistanceRegistry::new();
        for &size in sizes {
            registry.add(size)?;
        }
        Ok(registry)
    }
}
