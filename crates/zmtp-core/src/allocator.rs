//! Size-classed slab allocator.
//!
//! Each size class owns a bounded lock-free ring of idle slabs. Acquiring
//! pops a slab of the smallest fitting class and falls back to a fresh
//! allocation when the ring is empty; releasing pushes the slab back and
//! drops it when the ring is full. Neither side ever blocks or fails.
//!
//! Requests above the largest class are served with an exact-size buffer
//! that is never pooled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use zmtp_ring::MpmcRing;

use crate::buffer::Buffer;
use crate::config::PoolConfig;
use crate::error::ConfigError;

/// A pooled capacity, identified by its position in the class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SizeClass {
    index: usize,
    capacity: usize,
}

impl SizeClass {
    /// Position in the allocator's class table (0 = smallest).
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Slab capacity of this class.
    #[inline(always)]
    pub const fn capacity(self) -> usize {
        self.capacity
    }
}

#[derive(Default)]
struct ClassCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    recycled: AtomicU64,
    dropped: AtomicU64,
}

struct SlabPool {
    capacity: usize,
    idle: MpmcRing<Box<[u8]>>,
    counters: ClassCounters,
}

/// Point-in-time counters for one size class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Slab capacity of the class.
    pub capacity: usize,
    /// Idle slabs currently pooled.
    pub pooled: usize,
    /// Acquires served from the pool.
    pub hits: u64,
    /// Acquires that allocated fresh storage.
    pub misses: u64,
    /// Releases that went back into the pool.
    pub recycled: u64,
    /// Releases dropped because the pool was full.
    pub dropped: u64,
}

/// Point-in-time counters for an allocator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// One entry per size class, smallest first.
    pub classes: Vec<ClassStats>,
    /// Acquires above the largest class.
    pub oversized_acquired: u64,
    /// Releases whose capacity matched no class.
    pub unpooled_released: u64,
}

impl AllocatorStats {
    /// Total idle slabs across all classes.
    pub fn pooled(&self) -> usize {
        self.classes.iter().map(|c| c.pooled).sum()
    }
}

/// Size-classed buffer pool.
///
/// Safe to share between threads; `acquire` and `release` take `&self`.
pub struct Allocator {
    /// Pools ordered by ascending slab capacity.
    pools: Box<[SlabPool]>,
    /// Per-class idle ceiling.
    pool_capacity: usize,
    oversized_acquired: AtomicU64,
    unpooled_released: AtomicU64,
}

impl Allocator {
    /// Create an allocator with the default size classes and ceiling.
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Create an allocator from a custom configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let pools: Vec<SlabPool> = config
            .size_classes
            .iter()
            .map(|&capacity| SlabPool {
                capacity,
                idle: MpmcRing::with_capacity(config.pool_capacity),
                counters: ClassCounters::default(),
            })
            .collect();

        tracing::debug!(
            classes = pools.len(),
            pool_capacity = config.pool_capacity,
            "slab allocator initialised"
        );

        Self {
            pools: pools.into_boxed_slice(),
            pool_capacity: config.pool_capacity,
            oversized_acquired: AtomicU64::new(0),
            unpooled_released: AtomicU64::new(0),
        }
    }

    /// Smallest class whose capacity holds `size` bytes.
    ///
    /// Returns `None` for oversized requests.
    #[inline]
    pub fn classify(&self, size: usize) -> Option<SizeClass> {
        let index = self.pools.partition_point(|pool| pool.capacity < size);
        self.pools.get(index).map(|pool| SizeClass {
            index,
            capacity: pool.capacity,
        })
    }

    /// Class whose capacity is exactly `capacity`.
    #[inline]
    fn pool_for_capacity(&self, capacity: usize) -> Option<&SlabPool> {
        self.pools
            .binary_search_by_key(&capacity, |pool| pool.capacity)
            .ok()
            .map(|index| &self.pools[index])
    }

    /// Get a buffer of exactly `size` valid bytes.
    ///
    /// Capacity is the class capacity, or `size` itself when oversized.
    /// Contents of a recycled slab are whatever its previous holder left.
    pub fn acquire(&self, size: usize) -> Buffer {
        let Some(class) = self.classify(size) else {
            self.oversized_acquired.fetch_add(1, Ordering::Relaxed);
            return Buffer::zeroed(size, size);
        };

        let pool = &self.pools[class.index];
        match pool.idle.try_pop() {
            Some(storage) => {
                pool.counters.hits.fetch_add(1, Ordering::Relaxed);
                Buffer::from_storage(storage, size)
            }
            None => {
                pool.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(capacity = pool.capacity, size, "slab pool empty, allocating");
                Buffer::zeroed(pool.capacity, size)
            }
        }
    }

    /// Return a buffer's storage for reuse.
    ///
    /// Only buffers whose capacity equals a size class are pooled. A full
    /// pool drops the buffer instead of waiting for room.
    pub fn release(&self, buffer: Buffer) {
        let capacity = buffer.capacity();
        let Some(pool) = self.pool_for_capacity(capacity) else {
            self.unpooled_released.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(capacity, "capacity matches no size class, dropping buffer");
            return;
        };

        match pool.idle.try_push(buffer.into_storage()) {
            Ok(()) => {
                pool.counters.recycled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                pool.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(capacity, "slab pool full, dropping buffer");
            }
        }
    }

    /// Capacities of the size classes, smallest first.
    pub fn size_classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.pools.iter().map(|pool| pool.capacity)
    }

    /// Per-class idle ceiling.
    #[inline(always)]
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Idle slabs held for `class`.
    pub fn pooled(&self, class: SizeClass) -> usize {
        self.pools
            .get(class.index)
            .map_or(0, |pool| pool.idle.len())
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> AllocatorStats {
        let classes = self
            .pools
            .iter()
            .map(|pool| ClassStats {
                capacity: pool.capacity,
                pooled: pool.idle.len(),
                hits: pool.counters.hits.load(Ordering::Relaxed),
                misses: pool.counters.misses.load(Ordering::Relaxed),
                recycled: pool.counters.recycled.load(Ordering::Relaxed),
                dropped: pool.counters.dropped.load(Ordering::Relaxed),
            })
            .collect();

        AllocatorStats {
            classes,
            oversized_acquired: self.oversized_acquired.load(Ordering::Relaxed),
            unpooled_released: self.unpooled_released.load(Ordering::Relaxed),
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("size_classes", &self.size_classes().collect::<Vec<_>>())
            .field("pool_capacity", &self.pool_capacity)
            .finish()
    }
}

static GLOBAL: OnceLock<Allocator> = OnceLock::new();

/// Process-wide allocator with the default configuration.
///
/// Built on first use and never torn down.
pub fn global() -> &'static Allocator {
    GLOBAL.get_or_init(Allocator::new)
}
