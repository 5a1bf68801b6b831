//! Shared health state for the /api/health endpoint.
//! Updated by the analytics handlers after every report.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared health counters. Updated by handlers, read by the health endpoint.
#[derive(Default)]
pub struct HealthState {
    /// Reports returned successfully since startup.
    pub reports_served: AtomicU64,
    /// Reports aborted because the record source was unavailable.
    pub source_failures: AtomicU64,
    /// Millisecond timestamp of the last successful report (0 = none).
    pub last_report_at_ms: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_report(&self, at_ms: u64) {
        self.reports_served.fetch_add(1, Ordering::Relaxed);
        self.last_report_at_ms.store(at_ms, Ordering::Relaxed);
    }

    pub fn inc_source_failures(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reports_served(&self) -> u64 {
        self.reports_served.load(Ordering::Relaxed)
    }

    pub fn source_failures(&self) -> u64 {
        self.source_failures.load(Ordering::Relaxed)
    }

    pub fn last_report_at_ms(&self) -> u64 {
        self.last_report_at_ms.load(Ordering::Relaxed)
    }
}
