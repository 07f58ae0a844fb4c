//! Measurement samples and the benchmark report

use crate::types::{Mirror, PerformanceLevel, ProbeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Round to two decimals, the precision every measurement is reported with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of a single latency probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySample {
    pub mirror: Mirror,
    /// Round-trip time in milliseconds, `None` when the probe failed
    pub latency_ms: Option<f64>,
    /// HTTP status received, if any
    pub http_status: Option<u16>,
    pub status: ProbeStatus,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LatencySample {
    /// Create a successful sample
    pub fn success(mirror: Mirror, elapsed: Duration, http_status: u16) -> Self {
        Self {
            mirror,
            latency_ms: Some(round2(elapsed.as_secs_f64() * 1000.0)),
            http_status: Some(http_status),
            status: ProbeStatus::Success,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed sample
    pub fn failed(mirror: Mirror, http_status: Option<u16>, error_message: String) -> Self {
        Self {
            mirror,
            latency_ms: None,
            http_status,
            status: ProbeStatus::Failed,
            error_message: Some(error_message),
            timestamp: Utc::now(),
        }
    }

    /// Create a timed-out sample
    pub fn timeout(mirror: Mirror, limit: Duration) -> Self {
        Self {
            mirror,
            latency_ms: None,
            http_status: None,
            status: ProbeStatus::Timeout,
            error_message: Some(format!("Probe timed out after {}s", limit.as_secs())),
            timestamp: Utc::now(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == ProbeStatus::Success && self.latency_ms.is_some()
    }

    /// Colour-coding class, if the probe succeeded
    pub fn performance_level(&self) -> Option<PerformanceLevel> {
        self.latency_ms.map(PerformanceLevel::from_latency_ms)
    }
}

/// Result of a timed download from one mirror
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub mirror: Mirror,
    /// URL of the file that was downloaded
    pub package_url: Option<String>,
    /// Download speed in MB/s, `None` when the test failed
    pub speed_mbps: Option<f64>,
    /// Bytes received before the stream ended or the time limit hit
    pub bytes: u64,
    /// Seconds counted toward the speed (never above the test time)
    pub elapsed_secs: f64,
    pub status: ProbeStatus,
    pub error_message: Option<String>,
}

impl ThroughputSample {
    /// Create a measured sample
    pub fn measured(mirror: Mirror, package_url: String, bytes: u64, elapsed: Duration, speed_mbps: Option<f64>) -> Self {
        let status = if speed_mbps.is_some() { ProbeStatus::Success } else { ProbeStatus::Failed };
        let error_message = if speed_mbps.is_none() {
            Some("Download too short or empty".to_string())
        } else {
            None
        };
        Self {
            mirror,
            package_url: Some(package_url),
            speed_mbps,
            bytes,
            elapsed_secs: round2(elapsed.as_secs_f64()),
            status,
            error_message,
        }
    }

    /// Create a failed sample
    pub fn failed(mirror: Mirror, package_url: Option<String>, error_message: String) -> Self {
        Self {
            mirror,
            package_url,
            speed_mbps: None,
            bytes: 0,
            elapsed_secs: 0.0,
            status: ProbeStatus::Failed,
            error_message: Some(error_message),
        }
    }

    /// Create a skipped sample (no package link available)
    pub fn skipped(mirror: Mirror, reason: String) -> Self {
        Self {
            status: ProbeStatus::Skipped,
            ..Self::failed(mirror, None, reason)
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == ProbeStatus::Success && self.speed_mbps.is_some()
    }

    /// Megabytes received, for progress messages
    pub fn megabytes(&self) -> f64 {
        round2(self.bytes as f64 / 1024.0 / 1024.0)
    }
}

/// One row of the final ranking: a mirror with both measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRanking {
    pub name: String,
    pub url: String,
    pub latency_ms: Option<f64>,
    pub speed_mbps: Option<f64>,
}

/// Everything a benchmark run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Successful probes ascending by latency, then failures in catalogue order
    pub latency: Vec<LatencySample>,
    /// Download results (successful ones only), fastest first
    pub ranking: Vec<MirrorRanking>,
    /// Package file chosen for each tested mirror
    pub package_links: BTreeMap<String, String>,
    /// Raw throughput samples, including failures
    pub throughput: Vec<ThroughputSample>,
    /// Mirror selected as best, if any answered
    pub best: Option<Mirror>,
    /// Whether the download stage was skipped
    pub download_skipped: bool,
    /// Wall time of the latency stage in milliseconds
    pub latency_stage_ms: f64,
    /// Wall time of the whole run in milliseconds
    pub total_ms: f64,
}

impl BenchmarkReport {
    /// Successful latency samples, in ranked order
    pub fn reachable(&self) -> impl Iterator<Item = &LatencySample> {
        self.latency.iter().filter(|s| s.is_successful())
    }

    /// Probes that did not produce a latency
    pub fn unreachable(&self) -> impl Iterator<Item = &LatencySample> {
        self.latency.iter().filter(|s| !s.is_successful())
    }

    /// Name of the best mirror
    pub fn best_name(&self) -> Option<&str> {
        self.best.as_ref().map(|m| m.name.as_str())
    }
}
