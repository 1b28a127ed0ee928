//! Byte accounting shared between the session and whoever observes the transport.
//!
//! All counters are updated with atomic operations so they can be read from any thread while
//! request completions are being processed on others.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread safe counters for bytes sent, received, dropped and currently queued for output
#[derive(Debug, Default)]
pub struct ByteCounters {
    total_bytes_in: AtomicU64,
    total_bytes_out: AtomicU64,
    total_bytes_dropped: AtomicU64,
    queue_bytes_out: AtomicU64,
}

/// A point in time copy of all byte counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteCountersSnapshot {
    pub total_bytes_in: u64,
    pub total_bytes_out: u64,
    pub total_bytes_dropped: u64,
    pub queue_bytes_out: u64,
}

impl ByteCounters {
    pub fn new() -> ByteCounters {
        ByteCounters::default()
    }

    pub fn total_bytes_in(&self) -> u64 {
        self.total_bytes_in.load(Ordering::Acquire)
    }

    pub fn total_bytes_out(&self) -> u64 {
        self.total_bytes_out.load(Ordering::Acquire)
    }

    pub fn total_bytes_dropped(&self) -> u64 {
        self.total_bytes_dropped.load(Ordering::Acquire)
    }

    pub fn queue_bytes_out(&self) -> u64 {
        self.queue_bytes_out.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ByteCountersSnapshot {
        ByteCountersSnapshot {
            total_bytes_in: self.total_bytes_in(),
            total_bytes_out: self.total_bytes_out(),
            total_bytes_dropped: self.total_bytes_dropped(),
            queue_bytes_out: self.queue_bytes_out(),
        }
    }

    pub(crate) fn add_bytes_in(&self, count: usize) {
        self.total_bytes_in.fetch_add(count as u64, Ordering::AcqRel);
    }

    pub(crate) fn add_bytes_out(&self, count: usize) {
        self.total_bytes_out.fetch_add(count as u64, Ordering::AcqRel);
    }

    pub(crate) fn add_bytes_dropped(&self, count: usize) {
        self.total_bytes_dropped.fetch_add(count as u64, Ordering::AcqRel);
    }

    pub(crate) fn add_queued(&self, count: usize) {
        self.queue_bytes_out.fetch_add(count as u64, Ordering::AcqRel);
    }

    /// Removes bytes from the queued counter, never letting it wrap below zero
    pub(crate) fn remove_queued(&self, count: usize) {
        let count = count as u64;
        let _ = self.queue_bytes_out.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_sub(count))
        });
    }
}
