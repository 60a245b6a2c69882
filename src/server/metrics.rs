//! Service metrics tracking.
//!
//! This module provides metrics tracking for the gateway.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Tracks service metrics like request counts and in-flight dispatches.
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    /// Total number of requests processed
    total_requests: Arc<AtomicU64>,

    /// Number of currently in-flight requests
    active_requests: Arc<AtomicU32>,

    /// Maximum number of concurrent requests observed
    max_concurrent_requests: Arc<AtomicU32>,

    /// Number of requests that failed after dispatch
    errors: Arc<AtomicU64>,

    /// Server start time
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicU64::new(0)),
            active_requests: Arc::new(AtomicU32::new(0)),
            max_concurrent_requests: Arc::new(AtomicU32::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record the start of a request.
    pub fn increment_request(&self) {
        let active = self.active_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.total_requests.fetch_add(1, Ordering::SeqCst);
        self.max_concurrent_requests
            .fetch_max(active, Ordering::SeqCst);
    }

    /// Record the end of a request.
    pub fn decrement_request(&self) {
        self.active_requests.fetch_sub(1, Ordering::SeqCst);
    }

    /// Record a failed dispatch.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    /// Get all metrics as a serde_json::Value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "total_requests": self.total_requests.load(Ordering::SeqCst),
            "active_requests": self.active_requests.load(Ordering::SeqCst),
            "max_concurrent_requests": self.max_concurrent_requests.load(Ordering::SeqCst),
            "errors": self.errors.load(Ordering::SeqCst),
        })
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
