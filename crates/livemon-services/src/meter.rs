//! Output metering shared with the UI

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Shared metering state (lock-free reads from UI)
pub struct MeterState {
    peak_raw: AtomicU32,
    reduction_raw: AtomicU32,
    clipped: AtomicBool,
}

impl MeterState {
    pub fn new() -> Self {
        Self {
            peak_raw: AtomicU32::new(0),
            reduction_raw: AtomicU32::new(0),
            clipped: AtomicBool::new(false),
        }
    }

    /// Output peak, linear
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_raw.load(Ordering::Relaxed))
    }

    /// Current compressor gain reduction in dB (zero or negative)
    pub fn gain_reduction_db(&self) -> f32 {
        f32::from_bits(self.reduction_raw.load(Ordering::Relaxed))
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped.load(Ordering::Relaxed)
    }

    pub fn clear_clip(&self) {
        self.clipped.store(false, Ordering::Relaxed);
    }

    pub(crate) fn set_peak(&self, val: f32) {
        self.peak_raw.store(val.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_gain_reduction_db(&self, val: f32) {
        self.reduction_raw.store(val.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_clipped(&self) {
        self.clipped.store(true, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.set_peak(0.0);
        self.set_gain_reduction_db(0.0);
    }
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}
