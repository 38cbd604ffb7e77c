// Copyright 2025 Crrow
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

//! Pipeline-wide metric counters.
//!
//! A single [`PipelineMetrics`] record is owned by the orchestrator and
//! shared (via `Arc`) with the ingress layer and the worker pool. All
//! mutation is relaxed atomic increments; readers take eventually-consistent
//! [`MetricsSnapshot`]s. There is no other synchronisation.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Atomic counters shared across ingress and workers.
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Raw bytes read off sockets by the ingress layer.
    pub bytes_received:     AtomicU64,
    /// Sequence bytes that made it through validate/encode/persist.
    pub bytes_processed:    AtomicU64,
    /// Records accepted by the ingress layer (pushed into the queue).
    pub sequences_accepted: AtomicU64,
    /// Records durably written to disk.
    pub sequences_stored:   AtomicU64,
    /// Records rejected for an out-of-alphabet byte.
    pub validation_errors:  AtomicU64,
    /// Records dropped by the frame parser (oversize, malformed framing).
    pub parsing_errors:     AtomicU64,
    /// Records lost to an I/O failure during persistence.
    pub storage_errors:     AtomicU64,
    /// Currently served client connections.
    pub active_connections: AtomicU64,
    /// Connections accepted since startup, including rejected ones.
    pub total_connections:  AtomicU64,
    /// When this metrics record was created.
    start:                  Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self { Self::new() }
}

impl PipelineMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes_received:     AtomicU64::new(0),
            bytes_processed:    AtomicU64::new(0),
            sequences_accepted: AtomicU64::new(0),
            sequences_stored:   AtomicU64::new(0),
            validation_errors:  AtomicU64::new(0),
            parsing_errors:     AtomicU64::new(0),
            storage_errors:     AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            total_connections:  AtomicU64::new(0),
            start:              Instant::now(),
        }
    }

    /// Take an eventually-consistent snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start.elapsed();
        let bytes_received = self.bytes_received.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let throughput_bps = if uptime.as_secs_f64() > 0.0 {
            bytes_received as f64 / uptime.as_secs_f64()
        } else {
            0.0
        };

        MetricsSnapshot {
            bytes_received,
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            sequences_accepted: self.sequences_accepted.load(Ordering::Relaxed),
            sequences_stored: self.sequences_stored.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            parsing_errors: self.parsing_errors.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            uptime,
            throughput_bps,
        }
    }
}

/// Point-in-time view of the pipeline counters.
///
/// The `Display` impl is the one-line status summary the server prints
/// periodically.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub bytes_received:     u64,
    pub bytes_processed:    u64,
    pub sequences_accepted: u64,
    pub sequences_stored:   u64,
    pub validation_errors:  u64,
    pub parsing_errors:     u64,
    pub storage_errors:     u64,
    pub active_connections: u64,
    pub total_connections:  u64,
    pub uptime:             Duration,
    pub throughput_bps:     f64,
}

impl MetricsSnapshot {
    #[must_use]
    pub const fn total_errors(&self) -> u64 {
        self.validation_errors + self.parsing_errors + self.storage_errors
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let throughput = human_bytes(self.throughput_bps as u64);
        write!(
            f,
            "conns {}/{} | seqs {} accepted, {} stored | {} recv | errs v:{} p:{} s:{} | {}/s | up {}s",
            self.active_connections,
            self.total_connections,
            self.sequences_accepted,
            self.sequences_stored,
            human_bytes(self.bytes_received),
            self.validation_errors,
            self.parsing_errors,
            self.storage_errors,
            throughput,
            self.uptime.as_secs(),
        )
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = PipelineMetrics::new();
        metrics.bytes_received.fetch_add(2048, Ordering::Relaxed);
        metrics.sequences_accepted.fetch_add(3, Ordering::Relaxed);
        metrics.validation_errors.fetch_add(1, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.bytes_received, 2048);
        assert_eq!(snap.sequences_accepted, 3);
        assert_eq!(snap.total_errors(), 1);
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn status_line_mentions_all_error_classes() {
        let snap = PipelineMetrics::new().snapshot();
        let line = snap.to_string();
        assert!(line.contains("errs v:0 p:0 s:0"));
        assert!(line.contains("conns 0/0"));
    }
}
