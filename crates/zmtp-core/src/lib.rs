//! # ZMTP Core
//!
//! Slab allocator and message model for a ZMTP messaging stack.
//!
//! ## Design Principles
//! - Size-classed slabs recycled through bounded lock-free pools
//! - Acquire and release never block and never fail
//! - Buffers track valid length separately from capacity
//! - Messages own their frames; storage moves in, never aliases

pub mod allocator;
pub mod buffer;
pub mod config;
pub mod error;
pub mod message;

pub use allocator::{global, Allocator, AllocatorStats, ClassStats, SizeClass};
pub use buffer::Buffer;
pub use config::{PoolConfig, DEFAULT_POOL_CAPACITY, MAX_POOLED_SIZE, SIZE_CLASSES};
pub use error::{BufferError, ConfigError};
pub use message::{DeferredError, Message, MessageKind};
