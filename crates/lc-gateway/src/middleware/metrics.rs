//! Gateway metrics.
//!
//! Plain atomic counters, exported as JSON on the metrics route.

use crate::domain::action::ActionCode;
use crate::domain::response::ResponseCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Gateway call metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Envelope counters, one per response code
    pub calls_total: AtomicU64,
    pub calls_success: AtomicU64,
    pub calls_fail: AtomicU64,
    pub calls_error: AtomicU64,
    pub calls_bad_request: AtomicU64,
    pub calls_not_login: AtomicU64,
    pub calls_no_right: AtomicU64,
    pub calls_no_command: AtomicU64,

    // Pipe counters
    pub pipe_interrupts: AtomicU64,
    pub pipes_skipped: AtomicU64,

    // Deadline counters
    pub calls_timed_out: AtomicU64,

    // Action counters
    pub actions_total: AtomicU64,
    pub actions_success: AtomicU64,

    // Stream counters
    pub streams_opened: AtomicU64,
    pub stream_frames_sent: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
    pub call_count_for_latency: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal envelope
    pub fn record_call(&self, code: ResponseCode, latency_ms: u64) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);

        let counter = match code {
            ResponseCode::Success => &self.calls_success,
            ResponseCode::Fail => &self.calls_fail,
            ResponseCode::Error => &self.calls_error,
            ResponseCode::BadRequest => &self.calls_bad_request,
            ResponseCode::NotLogin => &self.calls_not_login,
            ResponseCode::NoRight => &self.calls_no_right,
            ResponseCode::NoCommand => &self.calls_no_command,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.call_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupt(&self) {
        self.pipe_interrupts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipe_skipped(&self) {
        self.pipes_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.calls_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action(&self, code: ActionCode) {
        self.actions_total.fetch_add(1, Ordering::Relaxed);
        if code == ActionCode::Success {
            self.actions_success.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_frame(&self) {
        self.stream_frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.call_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "calls": {
                "total": self.calls_total.load(Ordering::Relaxed),
                "success": self.calls_success.load(Ordering::Relaxed),
                "fail": self.calls_fail.load(Ordering::Relaxed),
                "error": self.calls_error.load(Ordering::Relaxed),
                "bad_request": self.calls_bad_request.load(Ordering::Relaxed),
                "not_login": self.calls_not_login.load(Ordering::Relaxed),
                "no_right": self.calls_no_right.load(Ordering::Relaxed),
                "no_command": self.calls_no_command.load(Ordering::Relaxed),
                "timed_out": self.calls_timed_out.load(Ordering::Relaxed),
            },
            "pipes": {
                "interrupts": self.pipe_interrupts.load(Ordering::Relaxed),
                "skipped": self.pipes_skipped.load(Ordering::Relaxed),
            },
            "actions": {
                "total": self.actions_total.load(Ordering::Relaxed),
                "success": self.actions_success.load(Ordering::Relaxed),
            },
            "streams": {
                "opened": self.streams_opened.load(Ordering::Relaxed),
                "frames_sent": self.stream_frames_sent.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Call timing helper
pub struct CallTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl CallTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, code: ResponseCode) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_call(code, latency_ms);
    }
}
