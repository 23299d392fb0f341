//! Process-wide data-quality counters.
//!
//! Monotone and write-only from the request path; they never influence an
//! assessment.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct DataQualityCounters {
    alignments: AtomicU64,
    missing_filled: AtomicU64,
    coercion_fallbacks: AtomicU64,
    dropped_fields: AtomicU64,
    strict_rejections: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQualitySnapshot {
    pub alignments: u64,
    pub missing_filled: u64,
    pub coercion_fallbacks: u64,
    pub dropped_fields: u64,
    pub strict_rejections: u64,
}

impl DataQualitySnapshot {
    /// Total silent defaults applied so far.
    pub fn defaults(&self) -> u64 {
        self.missing_filled + self.coercion_fallbacks
    }
}

impl DataQualityCounters {
    pub fn record_alignment(&self) {
        self.alignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.missing_filled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coercion_fallback(&self) {
        self.coercion_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, n: usize) {
        self.dropped_fields.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_strict_rejection(&self) {
        self.strict_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DataQualitySnapshot {
        DataQualitySnapshot {
            alignments: self.alignments.load(Ordering::Relaxed),
            missing_filled: self.missing_filled.load(Ordering::Relaxed),
            coercion_fallbacks: self.coercion_fallbacks.load(Ordering::Relaxed),
            dropped_fields: self.dropped_fields.load(Ordering::Relaxed),
            strict_rejections: self.strict_rejections.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_totals_both_kinds_of_default() {
        let counters = DataQualityCounters::default();
        counters.record_alignment();
        counters.record_missing();
        counters.record_missing();
        counters.record_coercion_fallback();
        counters.record_strict_rejection();

        let snap = counters.snapshot();
        assert_eq!(snap.alignments, 1);
        assert_eq!(snap.defaults(), 3);
        assert_eq!(snap.strict_rejections, 1);
        assert_eq!(snap.dropped_fields, 0);
    }
}
