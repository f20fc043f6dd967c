//! Accounting of accelerator memory held by the resident model.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct DeviceMemory {
    capacity_mb: Option<u64>,
    baseline_mb: u64,
    reserved_mb: AtomicU64,
}

impl DeviceMemory {
    /// `baseline_mb` covers whatever was on the device before any generative
    /// model (the speech-recognition model, the CUDA context).
    pub fn new(capacity_mb: Option<u64>, baseline_mb: u64) -> Self {
        Self { capacity_mb, baseline_mb, reserved_mb: AtomicU64::new(0) }
    }

    pub fn unbounded() -> Self {
        Self::new(None, 0)
    }

    pub fn baseline_mb(&self) -> u64 {
        self.baseline_mb
    }

    pub fn used_mb(&self) -> u64 {
        self.baseline_mb + self.reserved_mb.load(Ordering::Acquire)
    }

    pub fn capacity_mb(&self) -> Option<u64> {
        self.capacity_mb
    }

    pub fn free_mb(&self) -> Option<u64> {
        self.capacity_mb.map(|c| c.saturating_sub(self.used_mb()))
    }

    /// Whether `mb` more would fit. Always true without a known capacity.
    pub fn fits(&self, mb: u64) -> bool {
        self.free_mb().map_or(true, |free| mb <= free)
    }

    pub fn reserve(&self, mb: u64) {
        self.reserved_mb.fetch_add(mb, Ordering::AcqRel);
    }

    pub fn release(&self, mb: u64) {
        // saturating: a double release must not wrap
        let _ = self
            .reserved_mb
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| Some(cur.saturating_sub(mb)));
    }
}
