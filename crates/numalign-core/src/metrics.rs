//! # Admission Metrics
//!
//! Lock-free counters for the admission path. Updates are relaxed atomics;
//! reads via [`AdmissionMetrics::snapshot`] are eventually consistent, which
//! is fine for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the coordinator.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    pods_admitted: AtomicU64,
    pods_rejected: AtomicU64,
    merge_fallbacks: AtomicU64,
    provider_timeouts: AtomicU64,
}

impl AdmissionMetrics {
    /// Fresh zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self) {
        self.pods_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.pods_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_merge_fallback(&self) {
        self.merge_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_provider_timeout(&self) {
        self.provider_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time view of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pods_admitted: self.pods_admitted.load(Ordering::Relaxed),
            pods_rejected: self.pods_rejected.load(Ordering::Relaxed),
            merge_fallbacks: self.merge_fallbacks.load(Ordering::Relaxed),
            provider_timeouts: self.provider_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value snapshot of [`AdmissionMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Pods admitted, including non-guaranteed pass-throughs.
    pub pods_admitted: u64,
    /// Pods rejected by policy or provider failure.
    pub pods_rejected: u64,
    /// Merges that produced the unconstrained fallback hint.
    pub merge_fallbacks: u64,
    /// Provider calls cut off at the timeout bound.
    pub provider_timeouts: u64,
}
