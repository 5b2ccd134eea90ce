//! RF pipeline counters.
//!
//! Lightweight observability for conditions the core handles silently:
//! dropped samples under overload, duplicate decodes, rejected commands.
//! All counters are atomic and may be bumped from the ISR or any task.

use core::sync::atomic::{AtomicU32, Ordering};

/// Counter block for the capture → decode → pairing pipeline.
pub struct RfStats {
    /// Durations enqueued by the edge ISR.
    captured: AtomicU32,
    /// Durations dropped because the handoff ring was full.
    dropped: AtomicU32,
    /// Sequences emitted by the decoder.
    decoded: AtomicU32,
    /// Decodes filtered as retransmissions of the same press.
    duplicates: AtomicU32,
    /// EV1527 frames whose address did not match the paired remote.
    address_mismatches: AtomicU32,
    /// Frames whose data payload mapped to no relay.
    unmapped: AtomicU32,
    /// Toggles suppressed by hold-detection.
    held: AtomicU32,
}

impl RfStats {
    pub const fn new() -> Self {
        Self {
            captured: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            decoded: AtomicU32::new(0),
            duplicates: AtomicU32::new(0),
            address_mismatches: AtomicU32::new(0),
            unmapped: AtomicU32::new(0),
            held: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn count_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_address_mismatch(&self) {
        self.address_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_unmapped(&self) {
        self.unmapped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_held(&self) {
        self.held.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot for diagnostics output.
    pub fn snapshot(&self) -> RfStatsSnapshot {
        RfStatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            address_mismatches: self.address_mismatches.load(Ordering::Relaxed),
            unmapped: self.unmapped.load(Ordering::Relaxed),
            held: self.held.load(Ordering::Relaxed),
        }
    }
}

impl Default for RfStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RfStatsSnapshot {
    pub captured: u32,
    pub dropped: u32,
    pub decoded: u32,
    pub duplicates: u32,
    pub address_mismatches: u32,
    pub unmapped: u32,
    pub held: u32,
}
