//! Allocator configuration.

use crate::error::ConfigError;

/// Slab capacities recycled by the default allocator, ascending.
pub const SIZE_CLASSES: [usize; 8] = [64, 256, 512, 1024, 4096, 16384, 65536, 131072];

/// Largest pooled capacity. Requests above it are allocated exactly and
/// never pooled.
pub const MAX_POOLED_SIZE: usize = SIZE_CLASSES[SIZE_CLASSES.len() - 1];

/// Default number of idle slabs kept per size class.
pub const DEFAULT_POOL_CAPACITY: usize = 2500;

/// Size classes and per-class ceiling for an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Slab capacities, strictly ascending.
    pub size_classes: Vec<usize>,

    /// Maximum idle slabs held per class.
    pub pool_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size_classes: SIZE_CLASSES.to_vec(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the default classes and ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the size classes.
    #[must_use]
    pub fn with_size_classes(mut self, classes: impl Into<Vec<usize>>) -> Self {
        self.size_classes = classes.into();
        self
    }

    /// Set the per-class ceiling.
    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Check the configuration can back an allocator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_classes.is_empty() {
            return Err(ConfigError::NoSizeClasses);
        }

        let ascending = self.size_classes.windows(2).all(|w| w[0] < w[1]);
        if self.size_classes[0] == 0 || !ascending {
            return Err(ConfigError::InvalidSizeClasses(self.size_classes.clone()));
        }

        if self.pool_capacity < zmtp_ring::MIN_CAPACITY {
            return Err(ConfigError::PoolCapacityTooSmall {
                capacity: self.pool_capacity,
                min: zmtp_ring::MIN_CAPACITY,
            });
        }

        Ok(())
    }
}
