//! Timed download of one package file

use crate::{
    client::HttpClient,
    models::ThroughputSample,
    stats::compute_speed_mbps,
    types::Mirror,
};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Download `package_url` for at most `test_time` and report the speed.
///
/// `request_timeout` bounds the wait for the response head. The body is read
/// until it ends, the deadline passes or the connection drops; a chunk still
/// pending at the deadline is abandoned. Bytes received before a dropped
/// connection still count toward the speed. Every failure is folded into the
/// returned sample.
pub async fn measure_throughput(
    client: &dyn HttpClient,
    mirror: &Mirror,
    package_url: &str,
    request_timeout: Duration,
    test_time: Duration,
) -> ThroughputSample {
    let started = Instant::now();

    let download = match client.open_download(package_url, request_timeout).await {
        Ok(download) => download,
        Err(e) => return ThroughputSample::failed(mirror.clone(), Some(package_url.to_string()), e.to_string()),
    };

    if download.status != 200 {
        return ThroughputSample::failed(
            mirror.clone(),
            Some(package_url.to_string()),
            format!("HTTP {}", download.status),
        );
    }

    let deadline = started + test_time;
    let mut chunks = download.chunks;
    let mut bytes: u64 = 0;
    let mut dropped = None;

    loop {
        match timeout_at(deadline, chunks.next()).await {
            Ok(Some(Ok(size))) => bytes += size as u64,
            Ok(Some(Err(e))) => {
                dropped = Some(e);
                break;
            }
            // End of body or deadline reached
            Ok(None) | Err(_) => break,
        }
    }

    let elapsed = started.elapsed().min(test_time);
    let speed = compute_speed_mbps(bytes, elapsed, test_time);

    match dropped {
        Some(e) if speed.is_none() => {
            ThroughputSample::failed(mirror.clone(), Some(package_url.to_string()), e.to_string())
        }
        Some(e) => {
            let mut sample = ThroughputSample::measured(mirror.clone(), package_url.to_string(), bytes, elapsed, speed);
            sample.error_message = Some(format!("connection dropped after {} bytes: {}", bytes, e));
            sample
        }
        None => ThroughputSample::measured(mirror.clone(), package_url.to_string(), bytes, elapsed, speed),
    }
}
