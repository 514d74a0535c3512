//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Lock-free metrics for the PWM server
//!
//! Every recording method updates an in-process atomic counter (readable through
//! [`ServerMetrics::snapshot`]) and emits the matching `metrics` facade event, so an
//! installed exporter sees the same numbers.

use crate::CloseReason;
use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a consistent view
/// of all metrics at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Session counts
    total_sessions: AtomicU64,
    active_sessions: AtomicU64,

    // Requests
    requests_received: AtomicU64,
    requests_applied: AtomicU64,
    requests_rejected: AtomicU64,

    // Errors
    accept_errors: AtomicU64,
    sink_failures: AtomicU64,
    read_errors: AtomicU64,
    write_errors: AtomicU64,
    idle_timeouts: AtomicU64,

    // Backpressure
    pool_saturations: AtomicU64,

    // Timing (stored as nanoseconds)
    total_session_duration_ns: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_sessions: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            requests_received: AtomicU64::new(0),
            requests_applied: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            accept_errors: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            idle_timeouts: AtomicU64::new(0),
            pool_saturations: AtomicU64::new(0),
            total_session_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Session tracking

    /// Record a session starting
    pub fn session_opened(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.sessions.total").increment(1);
        gauge!("pulsewire.sessions.active").increment(1.0);
    }

    /// Record a session ending
    pub fn session_closed(&self, reason: CloseReason, duration: Duration) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        self.total_session_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        match reason {
            CloseReason::IdleTimeout => {
                self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            CloseReason::ReadError => {
                self.read_errors.fetch_add(1, Ordering::Relaxed);
            }
            CloseReason::WriteError => {
                self.write_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        gauge!("pulsewire.sessions.active").decrement(1.0);
        counter!("pulsewire.sessions.closed", "reason" => reason.as_str()).increment(1);
        histogram!("pulsewire.sessions.duration").record(duration.as_secs_f64());
    }

    /// Get the current number of active sessions
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Get the total number of sessions since server start
    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }

    // Request tracking

    /// Record a decoded request frame
    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.requests.received").increment(1);
    }

    /// Record a request applied by the sink
    pub fn request_applied(&self) {
        self.requests_applied.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.requests.applied").increment(1);
    }

    /// Record a request that failed validation
    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.requests.rejected").increment(1);
    }

    // Error tracking

    /// Record a failed accept
    pub fn accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.errors.accept").increment(1);
    }

    /// Record a hardware sink failure
    pub fn sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.errors.sink").increment(1);
    }

    /// Record the listener blocking on a full slot pool
    pub fn pool_saturated(&self) {
        self.pool_saturations.fetch_add(1, Ordering::Relaxed);
        counter!("pulsewire.pool.saturated").increment(1);
    }

    // Snapshot

    /// Get a consistent snapshot of all metrics
    ///
    /// The snapshot may not be perfectly consistent if metrics are being
    /// updated concurrently, but it is close enough for monitoring purposes.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_applied: self.requests_applied.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
            pool_saturations: self.pool_saturations.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_session_duration: self.average_session_duration(),
        }
    }

    fn average_session_duration(&self) -> Duration {
        let total = self.total_sessions.load(Ordering::Relaxed);
        if total == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_session_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / total)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Current active sessions
    pub active_sessions: u64,
    /// Request frames decoded
    pub requests_received: u64,
    /// Requests applied by the sink
    pub requests_applied: u64,
    /// Requests rejected by validation
    pub requests_rejected: u64,
    /// Failed accepts
    pub accept_errors: u64,
    /// Sink failures
    pub sink_failures: u64,
    /// Sessions ended by a read error
    pub read_errors: u64,
    /// Sessions ended by a write error
    pub write_errors: u64,
    /// Sessions ended by the idle timeout
    pub idle_timeouts: u64,
    /// Times the listener waited on a full pool
    pub pool_saturations: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average session duration
    pub avg_session_duration: Duration,
}

impl MetricsSnapshot {
    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.accept_errors + self.sink_failures + self.read_errors + self.write_errors
    }

    /// Calculate requests per second (received)
    pub fn requests_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.requests_received as f64 / self.uptime.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_session_tracking() {
        let metrics = ServerMetrics::new();

        metrics.session_opened();
        metrics.session_opened();
        assert_eq!(metrics.active_sessions(), 2);
        assert_eq!(metrics.total_sessions(), 2);

        metrics.session_closed(CloseReason::IdleTimeout, Duration::from_secs(60));
        assert_eq!(metrics.active_sessions(), 1);
        assert_eq!(metrics.total_sessions(), 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.idle_timeouts, 1);
        assert_eq!(snapshot.avg_session_duration, Duration::from_secs(30));
    }

    #[test]
    fn test_request_and_error_tracking() {
        let metrics = ServerMetrics::new();

        metrics.request_received();
        metrics.request_received();
        metrics.request_applied();
        metrics.request_rejected();
        metrics.accept_error();
        metrics.sink_failure();
        metrics.session_opened();
        metrics.session_closed(CloseReason::WriteError, Duration::ZERO);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_received, 2);
        assert_eq!(snapshot.requests_applied, 1);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.write_errors, 1);
        assert_eq!(snapshot.total_errors(), 3);

        let over_two_seconds = MetricsSnapshot {
            uptime: Duration::from_secs(2),
            ..snapshot
        };
        assert_eq!(over_two_seconds.requests_per_sec(), 1.0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = std::sync::Arc::new(ServerMetrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let metrics = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    metrics.session_opened();
                    metrics.request_received();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.total_sessions(), 1000);
        assert_eq!(metrics.snapshot().requests_received, 1000);
    }
}
