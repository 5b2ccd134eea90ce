//! Edge-duration capture ring.
//!
//! The receiver ISR measures the time between consecutive edges of the RF
//! input pin and hands the durations to the decode task through this buffer.
//!
//! ```text
//! edge ISR ──enqueue──▶ TimingRing ──dequeue──▶ decode task
//!                       (lock-free)
//! ```
//!
//! # Contract
//!
//! - Exactly one producer (the ISR) and one consumer (the decode task).
//! - `enqueue` never blocks, never allocates, never takes a lock; it is a
//!   count check, one slot write and two atomic updates.
//! - When the ring is full the new sample is dropped. Overload sheds the
//!   newest data; the `capacity` oldest samples are always retained.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::CAPTURE_CAPACITY;

/// Duration in microseconds between two consecutive signal edges.
pub type CodeTime = u32;

/// Lock-free SPSC ring buffer of edge durations.
///
/// # Safety
///
/// Uses `UnsafeCell` internally but is safe under the single-producer,
/// single-consumer discipline: the write position is only advanced by the
/// producer, the read position only by the consumer, and the shared item
/// count is updated atomically with release/acquire ordering so the consumer
/// observes a slot's contents before it observes the count that covers it.
pub struct TimingRing<const N: usize = CAPTURE_CAPACITY> {
    slots: UnsafeCell<[CodeTime; N]>,

    /// Next write position (producer-owned, wraps via mask).
    write_pos: AtomicU32,

    /// Next read position (consumer-owned, wraps via mask).
    read_pos: AtomicU32,

    /// Number of samples currently queued.
    count: AtomicU32,
}

// SAFETY: Single producer, single consumer, atomic coordination.
unsafe impl<const N: usize> Sync for TimingRing<N> {}
unsafe impl<const N: usize> Send for TimingRing<N> {}

impl<const N: usize> TimingRing<N> {
    const MASK: u32 = (N - 1) as u32;

    /// Create a new empty ring.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Ring size must be power of 2");

        Self {
            slots: UnsafeCell::new([0; N]),
            write_pos: AtomicU32::new(0),
            read_pos: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Enqueue a duration from the producer side.
    ///
    /// Safe to call from interrupt context. Returns `false` when the ring is
    /// full and the sample was dropped.
    #[inline]
    pub fn enqueue(&self, duration: CodeTime) -> bool {
        if self.count.load(Ordering::Acquire) >= N as u32 {
            return false;
        }

        let pos = self.write_pos.load(Ordering::Relaxed);

        // SAFETY: Single producer; this slot is outside the readable window
        // until the count update below publishes it.
        unsafe {
            (*self.slots.get())[(pos & Self::MASK) as usize] = duration;
        }

        self.write_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// Dequeue the oldest duration, or `None` when the ring is empty.
    #[inline]
    pub fn dequeue(&self) -> Option<CodeTime> {
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }

        let pos = self.read_pos.load(Ordering::Relaxed);

        // SAFETY: Single consumer; count > 0 guarantees the producer has
        // published this slot.
        let duration = unsafe { (*self.slots.get())[(pos & Self::MASK) as usize] };

        self.read_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        self.count.fetch_sub(1, Ordering::Release);
        Some(duration)
    }

    /// Number of samples currently queued.
    #[inline]
    pub fn len(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Check whether the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Copy the most recently captured durations into `out`, oldest first,
    /// terminated by a zero sentinel.
    ///
    /// Diagnostics only; races with a concurrent producer are harmless (a
    /// torn window shows stale timings, never out-of-bounds data). Returns
    /// the number of durations copied, excluding the sentinel.
    pub fn snapshot(&self, out: &mut [CodeTime]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let want = (out.len() - 1).min(N);
        let end = self.write_pos.load(Ordering::Acquire);
        let start = end.wrapping_sub(want as u32);

        for (i, slot) in out.iter_mut().take(want).enumerate() {
            let pos = start.wrapping_add(i as u32) & Self::MASK;
            // SAFETY: In-bounds read of a slot that may be concurrently
            // rewritten; CodeTime is Copy and any value is valid.
            *slot = unsafe { (*self.slots.get())[pos as usize] };
        }
        out[want] = 0;
        want
    }
}

impl<const N: usize> Default for TimingRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side edge timer.
///
/// Owned by the ISR context. Converts absolute edge timestamps into
/// durations; the first edge after construction yields the elapsed time
/// since `new` was called, which the decoder discards as noise.
pub struct EdgeSampler {
    last_us: i64,
}

impl EdgeSampler {
    pub const fn new() -> Self {
        Self { last_us: 0 }
    }

    /// Record an edge at `now_us` and return the duration since the
    /// previous edge.
    #[inline]
    pub fn on_edge(&mut self, now_us: i64) -> CodeTime {
        let duration = now_us.wrapping_sub(self.last_us);
        self.last_us = now_us;
        duration as CodeTime
    }
}

impl Default for EdgeSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_fifo_order() {
        let ring = TimingRing::<8>::new();

        assert!(ring.enqueue(100));
        assert!(ring.enqueue(200));
        assert!(ring.enqueue(300));

        assert_eq!(ring.dequeue(), Some(100));
        assert_eq!(ring.dequeue(), Some(200));
        assert_eq!(ring.dequeue(), Some(300));
        assert_eq!(ring.dequeue(), None);
    }

    #[test]
    fn test_ring_drops_newest_when_full() {
        let ring = TimingRing::<4>::new();

        assert!(ring.enqueue(1));
        assert!(ring.enqueue(2));
        assert!(ring.enqueue(3));
        assert!(ring.enqueue(4));

        // Full: new samples are rejected, queued ones untouched
        assert!(!ring.enqueue(5));
        assert!(!ring.enqueue(6));
        assert_eq!(ring.len(), 4);

        assert_eq!(ring.dequeue(), Some(1));
        assert_eq!(ring.dequeue(), Some(2));
        assert_eq!(ring.dequeue(), Some(3));
        assert_eq!(ring.dequeue(), Some(4));
        assert_eq!(ring.dequeue(), None);
    }

    #[test]
    fn test_ring_wrap_around() {
        let ring = TimingRing::<4>::new();

        for t in 1..=4 {
            ring.enqueue(t);
        }
        assert_eq!(ring.dequeue(), Some(1));
        assert_eq!(ring.dequeue(), Some(2));

        ring.enqueue(5);
        ring.enqueue(6);

        assert_eq!(ring.dequeue(), Some(3));
        assert_eq!(ring.dequeue(), Some(4));
        assert_eq!(ring.dequeue(), Some(5));
        assert_eq!(ring.dequeue(), Some(6));
    }

    #[test]
    fn test_snapshot_recent_timings() {
        let ring = TimingRing::<8>::new();

        for t in 1..=6 {
            ring.enqueue(t * 10);
        }

        let mut out = [0u32; 5];
        let n = ring.snapshot(&mut out);
        assert_eq!(n, 4);
        // Most recent 4 captures, oldest first, zero-terminated
        assert_eq!(out, [30, 40, 50, 60, 0]);
    }

    #[test]
    fn test_edge_sampler_durations() {
        let mut sampler = EdgeSampler::new();

        sampler.on_edge(1_000);
        assert_eq!(sampler.on_edge(1_320), 320);
        assert_eq!(sampler.on_edge(2_280), 960);
    }
}
