//! Lock-free SPSC ring buffer.
//!
//! Single-producer single-consumer bounded queue of `Copy` records with
//! cache-line-padded cursors to prevent false sharing. Each side keeps a
//! cached copy of the other side's cursor so the common case touches only
//! its own cache line.
//!
//! [`ring`] hands back owning producer/consumer halves that can move to
//! different threads; exactly one of each exists, which is what makes the
//! unsynchronised buffer slots sound.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU64, Ordering};

/// Default capacity for engine event queues.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

/// Padded atomic counter occupying its own cache line.
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

/// The shared ring state. Use [`ring`] to construct one and split it.
pub struct SpscRing<T> {
    /// Next slot to write (owned by the producer).
    write_cursor: PaddedAtomicU64,
    /// Producer's cached view of `read_cursor`.
    cached_read: PaddedAtomicU64,
    /// Next slot to read (owned by the consumer).
    read_cursor: PaddedAtomicU64,
    /// Consumer's cached view of `write_cursor`.
    cached_write: PaddedAtomicU64,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: u64,
}

// SAFETY: slots are only touched by the single producer (writes) and the
// single consumer (reads), ordered by the acquire/release cursor protocol.
unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T: Copy> SpscRing<T> {
    fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two().max(2);
        let mut buffer = Vec::with_capacity(cap);
        buffer.resize_with(cap, || UnsafeCell::new(MaybeUninit::uninit()));
        Self {
            write_cursor: PaddedAtomicU64::new(0),
            cached_read: PaddedAtomicU64::new(0),
            read_cursor: PaddedAtomicU64::new(0),
            cached_write: PaddedAtomicU64::new(0),
            buffer: buffer.into_boxed_slice(),
            mask: (cap - 1) as u64,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// Create a ring and split it into its two halves.
///
/// `capacity` is rounded up to the next power of two.
pub fn ring<T: Copy + Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(SpscRing::with_capacity(capacity));
    (
        Producer {
            ring: Arc::clone(&ring),
        },
        Consumer { ring },
    )
}

/// Write half. There is exactly one per ring and it is deliberately not
/// `Clone`: a second producer would race the unsynchronised slots.
pub struct Producer<T: Copy> {
    ring: Arc<SpscRing<T>>,
}

impl<T: Copy> Producer<T> {
    /// Attempt to publish a value. Returns `false` if the ring is full.
    #[inline(always)]
    pub fn try_publish(&mut self, value: T) -> bool {
        let ring = &*self.ring;
        let write_pos = ring.write_cursor.value.load(Ordering::Relaxed);

        // Full check against the cached read position first.
        let cached_read = ring.cached_read.value.load(Ordering::Relaxed);
        if write_pos - cached_read > ring.mask {
            let current_read = ring.read_cursor.value.load(Ordering::Acquire);
            ring.cached_read.value.store(current_read, Ordering::Relaxed);
            if write_pos - current_read > ring.mask {
                return false;
            }
        }

        let idx = (write_pos & ring.mask) as usize;
        // SAFETY: the slot is outside the readable window until the
        // release store below, and we are the only producer.
        unsafe {
            (*ring.buffer[idx].get()).write(value);
        }
        ring.write_cursor
            .value
            .store(write_pos + 1, Ordering::Release);
        true
    }

    /// Slots currently free for publishing.
    pub fn remaining_capacity(&self) -> usize {
        let ring = &*self.ring;
        let write_pos = ring.write_cursor.value.load(Ordering::Relaxed);
        let read_pos = ring.read_cursor.value.load(Ordering::Acquire);
        ring.capacity() - (write_pos - read_pos) as usize
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Read half; exactly one per ring, not `Clone`.
pub struct Consumer<T: Copy> {
    ring: Arc<SpscRing<T>>,
}

impl<T: Copy> Consumer<T> {
    /// Attempt to consume a value. Returns `None` if the ring is empty.
    #[inline(always)]
    pub fn try_consume(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let read_pos = ring.read_cursor.value.load(Ordering::Relaxed);

        // Empty check against the cached write position first.
        let cached_write = ring.cached_write.value.load(Ordering::Relaxed);
        if read_pos >= cached_write {
            let current_write = ring.write_cursor.value.load(Ordering::Acquire);
            ring.cached_write
                .value
                .store(current_write, Ordering::Relaxed);
            if read_pos >= current_write {
                return None;
            }
        }

        let idx = (read_pos & ring.mask) as usize;
        // SAFETY: the acquire load above proves the producer published
        // this slot, and we are the only consumer.
        let value = unsafe { (*ring.buffer[idx].get()).assume_init_read() };
        ring.read_cursor
            .value
            .store(read_pos + 1, Ordering::Release);
        Some(value)
    }

    /// Items currently available to consume.
    pub fn available(&self) -> usize {
        let ring = &*self.ring;
        let write_pos = ring.write_cursor.value.load(Ordering::Acquire);
        let read_pos = ring.read_cursor.value.load(Ordering::Relaxed);
        (write_pos - read_pos) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_message() {
        let (mut producer, mut consumer) = ring::<u64>(16);
        assert!(producer.try_publish(42));
        assert_eq!(consumer.try_consume(), Some(42));
        assert_eq!(consumer.try_consume(), None);
    }

    #[test]
    fn fill_then_drain() {
        let (mut producer, mut consumer) = ring::<u64>(16);

        for i in 0..16 {
            assert!(producer.try_publish(i), "failed at {}", i);
        }
        assert!(!producer.try_publish(100));

        for i in 0..16 {
            assert_eq!(consumer.try_consume(), Some(i));
        }
        assert_eq!(consumer.try_consume(), None);
    }

    #[test]
    fn wrap_around() {
        let (mut producer, mut consumer) = ring::<u64>(4);

        for round in 0..10 {
            let base = round * 4;
            for i in 0..4 {
                assert!(producer.try_publish(base + i));
            }
            for i in 0..4 {
                assert_eq!(consumer.try_consume(), Some(base + i));
            }
        }
    }

    #[test]
    fn capacity_rounds_up() {
        let (producer, _consumer) = ring::<u64>(10);
        assert_eq!(producer.capacity(), 16);
    }

    #[test]
    fn counters_track_occupancy() {
        let (mut producer, consumer) = ring::<u64>(8);
        assert_eq!(consumer.available(), 0);
        assert_eq!(producer.remaining_capacity(), 8);

        producer.try_publish(1);
        producer.try_publish(2);
        assert_eq!(consumer.available(), 2);
        assert_eq!(producer.remaining_capacity(), 6);
    }
}
