//! Ranking of measurements and best-mirror selection

use crate::{
    models::{metrics::round2, LatencySample, MirrorRanking, ThroughputSample},
    types::Mirror,
};
use std::cmp::Ordering;
use std::time::Duration;

/// Lowest speed ever reported, so a finished but very slow download never reads as zero
pub const MIN_REPORTED_SPEED_MBPS: f64 = 0.01;

/// Successful probes ascending by latency. The sort is stable, so ties keep catalogue order.
pub fn rank_by_latency(samples: &[LatencySample]) -> Vec<LatencySample> {
    let mut ranked: Vec<LatencySample> = samples.iter().filter(|s| s.is_successful()).cloned().collect();
    ranked.sort_by(|a, b| compare_f64(a.latency_ms, b.latency_ms));
    ranked
}

/// The first `min(n, len)` entries of a ranking
pub fn select_top<T: Clone>(ranked: &[T], n: usize) -> Vec<T> {
    ranked.iter().take(n).cloned().collect()
}

/// Successful downloads, fastest first
pub fn rank_by_throughput(samples: &[ThroughputSample]) -> Vec<ThroughputSample> {
    let mut ranked: Vec<ThroughputSample> = samples.iter().filter(|s| s.is_successful()).cloned().collect();
    ranked.sort_by(|a, b| compare_f64(b.speed_mbps, a.speed_mbps));
    ranked
}

/// Join ranked downloads with the latency measured for the same mirror
pub fn merge_rankings(throughput: &[ThroughputSample], latency: &[LatencySample]) -> Vec<MirrorRanking> {
    throughput
        .iter()
        .map(|t| MirrorRanking {
            name: t.mirror.name.clone(),
            url: t.mirror.url.clone(),
            latency_ms: latency
                .iter()
                .find(|l| l.mirror.name == t.mirror.name)
                .and_then(|l| l.latency_ms),
            speed_mbps: t.speed_mbps,
        })
        .collect()
}

/// Download speed in MB/s.
///
/// `elapsed` is clamped to `limit` (the read loop can overshoot by one chunk).
/// Returns `None` if nothing was received or no time passed.
pub fn compute_speed_mbps(bytes: u64, elapsed: Duration, limit: Duration) -> Option<f64> {
    let secs = elapsed.min(limit).as_secs_f64();
    if secs <= 0.0 || bytes == 0 {
        return None;
    }
    let speed = (bytes as f64 / 1024.0 / 1024.0) / secs;
    Some(round2(speed.max(MIN_REPORTED_SPEED_MBPS)))
}

/// Pick the winner: fastest download, else lowest latency, else nobody
pub fn select_best(ranked_throughput: &[ThroughputSample], ranked_latency: &[LatencySample]) -> Option<Mirror> {
    ranked_throughput
        .first()
        .map(|t| t.mirror.clone())
        .or_else(|| ranked_latency.first().map(|l| l.mirror.clone()))
}

fn compare_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(f64::MAX);
    let b = b.unwrap_or(f64::MAX);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
