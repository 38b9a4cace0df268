//! Lock-free bounded MPMC ring buffer.
//!
//! Every slot carries its own sequence number, so any number of producers
//! and consumers can share one ring through `&self`. Operations never
//! block: a full ring hands the value back and an empty ring yields `None`.
//!
//! Capacity is fixed at construction and need not be a power of two.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU64, Ordering};

/// Smallest capacity a ring accepts.
///
/// With a single slot a full ring and an empty ring share the same slot
/// sequence, so at least two are required.
pub const MIN_CAPACITY: usize = 2;

/// Padded atomic counter to prevent false sharing.
/// Uses 128-byte alignment to ensure it occupies its own cache line.
#[repr(C, align(128))]
struct PaddedAtomicU64 {
    value: AtomicU64,
}

impl PaddedAtomicU64 {
    const fn new(v: u64) -> Self {
        Self {
            value: AtomicU64::new(v),
        }
    }
}

struct Slot<T> {
    /// Equals the push position when the slot is writable, and the push
    /// position + 1 once it holds a value.
    sequence: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded multi-producer multi-consumer ring.
pub struct MpmcRing<T> {
    /// Next position to pop.
    head: PaddedAtomicU64,

    /// Next position to push.
    tail: PaddedAtomicU64,

    slots: Box<[Slot<T>]>,
}

// SAFETY: a value is written by exactly one producer (the one that won the
// tail CAS) and read by exactly one consumer (the one that won the head CAS);
// the slot sequence hands it over with release/acquire ordering.
unsafe impl<T: Send> Send for MpmcRing<T> {}
unsafe impl<T: Send> Sync for MpmcRing<T> {}

impl<T> MpmcRing<T> {
    /// Create a ring holding at most `capacity` values.
    ///
    /// # Panics
    /// Panics if `capacity` is below [`MIN_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity >= MIN_CAPACITY,
            "Ring capacity must be at least {}",
            MIN_CAPACITY
        );

        let slots: Vec<Slot<T>> = (0..capacity as u64)
            .map(|i| Slot {
                sequence: AtomicU64::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            head: PaddedAtomicU64::new(0),
            tail: PaddedAtomicU64::new(0),
            slots: slots.into_boxed_slice(),
        }
    }

    /// Maximum number of values the ring holds.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn slot(&self, pos: u64) -> &Slot<T> {
        &self.slots[(pos % self.slots.len() as u64) as usize]
    }

    /// Attempt to push a value.
    ///
    /// Returns the value back if the ring is full.
    #[inline]
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut pos = self.tail.value.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(pos);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as i64;

            if diff == 0 {
                match self.tail.value.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS gives this producer sole
                        // access to the slot until the sequence is published.
                        unsafe {
                            (*slot.value.get()).write(value);
                        }
                        slot.sequence.store(pos + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Slot still holds a value from the previous lap.
                return Err(value);
            } else {
                pos = self.tail.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempt to pop a value.
    ///
    /// Returns `None` if the ring is empty.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        let mut pos = self.head.value.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(pos);
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos + 1) as i64;

            if diff == 0 {
                match self.head.value.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the acquire load above saw the producer's
                        // release store, so the slot is initialized, and the
                        // CAS makes this consumer its only reader.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(pos + self.slots.len() as u64, Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.head.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Number of values currently held.
    ///
    /// Exact when no push or pop is in flight, otherwise a snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        loop {
            let tail = self.tail.value.load(Ordering::Acquire);
            let head = self.head.value.load(Ordering::Acquire);

            // Retry if tail moved while head was read.
            if self.tail.value.load(Ordering::Acquire) == tail {
                let len = tail.saturating_sub(head) as usize;
                return len.min(self.capacity());
            }
        }
    }

    /// Check if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

impl<T> Drop for MpmcRing<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

impl<T> fmt::Debug for MpmcRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcRing")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_value() {
        let ring: MpmcRing<u64> = MpmcRing::with_capacity(16);

        assert!(ring.try_push(42).is_ok());
        assert_eq!(ring.try_pop(), Some(42));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn test_fill_drain() {
        let ring: MpmcRing<u64> = MpmcRing::with_capacity(16);

        for i in 0..16 {
            assert!(ring.try_push(i).is_ok(), "Failed at {}", i);
        }

        assert!(ring.is_full());
        assert_eq!(ring.try_push(100), Err(100));

        for i in 0..16 {
            assert_eq!(ring.try_pop(), Some(i));
        }

        assert!(ring.is_empty());
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn test_wrap_around_odd_capacity() {
        let ring: MpmcRing<u64> = MpmcRing::with_capacity(3);

        for round in 0..10 {
            let base = round * 3;

            for i in 0..3 {
                assert!(ring.try_push(base + i).is_ok());
            }
            assert_eq!(ring.try_push(999), Err(999));

            for i in 0..3 {
                assert_eq!(ring.try_pop(), Some(base + i));
            }
        }
    }

    #[test]
    fn test_len_tracks_contents() {
        let ring: MpmcRing<u64> = MpmcRing::with_capacity(8);
        assert_eq!(ring.len(), 0);

        ring.try_push(1).unwrap();
        ring.try_push(2).unwrap();
        assert_eq!(ring.len(), 2);

        ring.try_pop();
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_drop_releases_remaining_values() {
        let token = Arc::new(());
        {
            let ring = MpmcRing::with_capacity(4);
            ring.try_push(Arc::clone(&token)).unwrap();
            ring.try_push(Arc::clone(&token)).unwrap();
            assert_eq!(Arc::strong_count(&token), 3);
        }
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    #[should_panic(expected = "at least")]
    fn test_capacity_one_rejected() {
        let _ring: MpmcRing<u8> = MpmcRing::with_capacity(1);
    }

    #[test]
    fn test_concurrent_producers_consumers() {
        const PER_PRODUCER: u64 = 10_000;
        const PRODUCERS: u64 = 4;

        let ring: MpmcRing<u64> = MpmcRing::with_capacity(64);
        let popped = AtomicUsize::new(0);
        let sum = AtomicU64::new(0);

        thread::scope(|s| {
            for p in 0..PRODUCERS {
                let ring = &ring;
                s.spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut value = p * PER_PRODUCER + i;
                        while let Err(v) = ring.try_push(value) {
                            value = v;
                            core::hint::spin_loop();
                        }
                    }
                });
            }

            for _ in 0..4 {
                s.spawn(|| {
                    while popped.load(Ordering::Relaxed) < (PRODUCERS * PER_PRODUCER) as usize {
                        if let Some(v) = ring.try_pop() {
                            sum.fetch_add(v, Ordering::Relaxed);
                            popped.fetch_add(1, Ordering::Relaxed);
                        } else {
                            core::hint::spin_loop();
                        }
                    }
                });
            }
        });

        let n = PRODUCERS * PER_PRODUCER;
        assert_eq!(popped.load(Ordering::Relaxed), n as usize);
        assert_eq!(sum.load(Ordering::Relaxed), n * (n - 1) / 2);
        assert!(ring.is_empty());
    }
}
