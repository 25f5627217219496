//! Boundary metrics for monitoring and leak detection.
//!
//! Counts boundary calls, captured failures by code, caught panics, and the
//! owning handles handed out and destroyed.

use crate::error::ErrorCode;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the boundary counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStats {
    /// Boundary calls made
    pub total_calls: u64,
    /// Calls that returned an error status
    pub failed_calls: u64,
    /// Panics caught at the boundary
    pub panics: u64,
    /// Owning handles handed out
    pub handles_created: u64,
    /// Owning handles destroyed
    pub handles_destroyed: u64,
}

impl BoundaryStats {
    /// Owning handles currently held by callers
    pub fn live_handles(&self) -> u64 {
        self.handles_created.saturating_sub(self.handles_destroyed)
    }
}

/// Metrics collector for boundary calls
pub struct BoundaryMetrics {
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
    panics: AtomicU64,
    handles_created: AtomicU64,
    handles_destroyed: AtomicU64,
    error_counts: Mutex<HashMap<ErrorCode, u64>>,
}

impl BoundaryMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            handles_created: AtomicU64::new(0),
            handles_destroyed: AtomicU64::new(0),
            error_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Record a boundary call
    pub fn record_call(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed call
    pub fn record_failure(&self, code: ErrorCode) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
        *self.error_counts.lock().entry(code).or_insert(0) += 1;
    }

    /// Record a caught panic
    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an owning handle handed to a caller
    pub fn record_handle_created(&self) {
        self.handles_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an owning handle destroyed by its receiver
    pub fn record_handle_destroyed(&self) {
        self.handles_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters
    pub fn stats(&self) -> BoundaryStats {
        BoundaryStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            handles_created: self.handles_created.load(Ordering::Relaxed),
            handles_destroyed: self.handles_destroyed.load(Ordering::Relaxed),
        }
    }

    /// Failure counts by error code
    pub fn error_counts(&self) -> HashMap<ErrorCode, u64> {
        self.error_counts.lock().clone()
    }

    /// Export Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let stats = self.stats();
        let mut output = String::new();

        output.push_str("# HELP dynet_c_calls_total Boundary calls\n");
        output.push_str("# TYPE dynet_c_calls_total counter\n");
        output.push_str(&format!(
            "dynet_c_calls_total{{status=\"ok\"}} {}\n",
            stats.total_calls.saturating_sub(stats.failed_calls)
        ));
        output.push_str(&format!(
            "dynet_c_calls_total{{status=\"error\"}} {}\n",
            stats.failed_calls
        ));

        output.push_str("\n# HELP dynet_c_panics_total Panics caught at the boundary\n");
        output.push_str("# TYPE dynet_c_panics_total counter\n");
        output.push_str(&format!("dynet_c_panics_total {}\n", stats.panics));

        output.push_str("\n# HELP dynet_c_live_handles Owning handles not yet destroyed\n");
        output.push_str("# TYPE dynet_c_live_handles gauge\n");
        output.push_str(&format!("dynet_c_live_handles {}\n", stats.live_handles()));

        output.push_str("\n# HELP dynet_c_errors_total Failures by code\n");
        output.push_str("# TYPE dynet_c_errors_total counter\n");
        let mut counts: Vec<_> = self.error_counts().into_iter().collect();
        counts.sort_by_key(|(code, _)| code.as_i32());
        for (code, count) in counts {
            output.push_str(&format!(
                "dynet_c_errors_total{{code=\"{}\"}} {}\n",
                code, count
            ));
        }

        output
    }
}

impl Default for BoundaryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<BoundaryMetrics> = Lazy::new(BoundaryMetrics::new);

/// Process-wide metrics shared by every boundary call
pub fn global() -> &'static BoundaryMetrics {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector() {
        let metrics = BoundaryMetrics::new();
        metrics.record_call();
        metrics.record_call();
        metrics.record_failure(ErrorCode::BufferTooSmall);

        let stats = metrics.stats();
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(metrics.error_counts()[&ErrorCode::BufferTooSmall], 1);
    }

    #[test]
    fn test_live_handles() {
        let metrics = BoundaryMetrics::new();
        metrics.record_handle_created();
        metrics.record_handle_created();
        metrics.record_handle_destroyed();
        assert_eq!(metrics.stats().live_handles(), 1);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = BoundaryMetrics::new();
        metrics.record_call();
        metrics.record_failure(ErrorCode::InvalidArgument);
        metrics.record_panic();

        let output = metrics.to_prometheus();
        assert!(output.contains("dynet_c_calls_total{status=\"error\"} 1"));
        assert!(output.contains("dynet_c_panics_total 1"));
        assert!(output.contains("dynet_c_errors_total{code=\"INVALID_ARGUMENT\"} 1"));
    }
}
