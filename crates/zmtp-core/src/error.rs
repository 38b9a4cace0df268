//! Error types for buffers and allocator configuration.

/// Errors raised when adjusting a [`Buffer`](crate::Buffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// Requested length does not fit the buffer's storage.
    #[error("length {requested} exceeds buffer capacity {capacity}")]
    CapacityExceeded {
        /// Length that was asked for
        requested: usize,
        /// Storage reserved by the buffer
        capacity: usize,
    },
}

/// Errors raised when validating a [`PoolConfig`](crate::PoolConfig).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No size classes were given.
    #[error("at least one size class is required")]
    NoSizeClasses,

    /// Size classes must be non-zero and strictly ascending.
    #[error("size classes must be non-zero and strictly ascending: {0:?}")]
    InvalidSizeClasses(Vec<usize>),

    /// Per-class pool ceiling is below what the ring supports.
    #[error("pool capacity {capacity} is below the minimum of {min}")]
    PoolCapacityTooSmall {
        /// Configured ceiling
        capacity: usize,
        /// Smallest accepted ceiling
        min: usize,
    },
}
