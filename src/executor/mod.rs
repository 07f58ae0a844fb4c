//! Benchmark execution engine
//!
//! Runs the measurement pipeline against a set of mirrors:
//! - concurrent latency probes (bounded fan-out, one HEAD request per mirror)
//! - package-link discovery on the fastest candidates
//! - timed downloads, in parallel or one after another
//!
//! Progress is reported through [`BenchmarkObserver`] as each stage finishes.

pub mod throughput;

pub use throughput::measure_throughput;

use crate::{
    client::HttpClient,
    error::{AppError, Result},
    index::{LinkExtractor, PackageLocator},
    logging::{LogEntryBuilder, Logger},
    models::{BenchmarkReport, Config, LatencySample, ThroughputSample},
    stats,
    types::Mirror,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Callbacks fired as the pipeline progresses. Every method defaults to a no-op.
pub trait BenchmarkObserver {
    /// All latency probes finished; reachable mirrors first, fastest first
    fn on_latency_complete(&self, _samples: &[LatencySample]) {}

    /// Mirrors chosen for the download test
    fn on_candidates(&self, _top: &[LatencySample]) {}

    fn on_link_found(&self, _mirror: &Mirror, _url: &str) {}

    fn on_link_failed(&self, _mirror: &Mirror, _error: &AppError) {}

    fn on_download_start(&self, _mirror: &Mirror) {}

    fn on_throughput(&self, _sample: &ThroughputSample) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl BenchmarkObserver for NoopObserver {}

/// Knobs of a benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkSettings {
    pub probe_timeout: Duration,
    pub concurrency: usize,
    pub page_timeout: Duration,
    pub download_timeout: Duration,
    pub test_time: Duration,
    pub top_count: usize,
    pub test_package: String,
    pub sequential: bool,
    pub skip_download: bool,
}

impl From<&Config> for BenchmarkSettings {
    fn from(config: &Config) -> Self {
        Self {
            probe_timeout: config.probe_timeout(),
            concurrency: config.probe_concurrency,
            page_timeout: crate::defaults::DEFAULT_PAGE_TIMEOUT,
            download_timeout: crate::defaults::DEFAULT_DOWNLOAD_TIMEOUT,
            test_time: config.test_time(),
            top_count: config.top_count,
            test_package: config.test_package.clone(),
            sequential: config.sequential,
            skip_download: config.skip_download_test,
        }
    }
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Measures a set of mirrors and picks the best one
pub struct MirrorBenchmark {
    client: Arc<dyn HttpClient>,
    settings: BenchmarkSettings,
    locator: PackageLocator,
    logger: Logger,
}

impl MirrorBenchmark {
    pub fn new(client: Arc<dyn HttpClient>, settings: BenchmarkSettings, extractor: LinkExtractor, logger: Logger) -> Self {
        let locator = PackageLocator::new(extractor, settings.page_timeout);
        Self {
            client,
            settings,
            locator,
            logger,
        }
    }

    /// Benchmark configured from `config`, picking wheels for `python_version` on this host
    pub fn from_config(
        config: &Config,
        client: Arc<dyn HttpClient>,
        python_version: Option<(u32, u32)>,
        logger: Logger,
    ) -> Result<Self> {
        let extractor = LinkExtractor::for_host(python_version)?;
        Ok(Self::new(client, BenchmarkSettings::from(config), extractor, logger))
    }

    pub fn settings(&self) -> &BenchmarkSettings {
        &self.settings
    }

    /// Probe every mirror with a HEAD request, at most `concurrency` at a time.
    ///
    /// Returns the reachable mirrors ascending by latency followed by the
    /// failures in the order they were given.
    pub async fn probe_latencies(&self, mirrors: &[Mirror]) -> Result<Vec<LatencySample>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let limit = self.settings.probe_timeout;

        let tasks: Vec<_> = mirrors
            .iter()
            .cloned()
            .map(|mirror| {
                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return LatencySample::failed(mirror, None, "probe cancelled".to_string()),
                    };
                    Self::probe_mirror(client.as_ref(), mirror, limit).await
                })
            })
            .collect();

        let mut samples = Vec::with_capacity(mirrors.len());
        for joined in join_all(tasks).await {
            let sample = joined.map_err(|e| AppError::internal(format!("Probe task failed: {}", e)))?;
            self.logger.debug("Latency probe finished").latency(&sample).log().await;
            samples.push(sample);
        }

        let mut ordered = stats::rank_by_latency(&samples);
        ordered.extend(samples.into_iter().filter(|s| !s.is_successful()));
        Ok(ordered)
    }

    async fn probe_mirror(client: &dyn HttpClient, mirror: Mirror, limit: Duration) -> LatencySample {
        let started = Instant::now();
        match client.head(&mirror.url, limit).await {
            Ok(status) if (200..400).contains(&status) => LatencySample::success(mirror, started.elapsed(), status),
            Ok(status) => LatencySample::failed(mirror, Some(status), format!("HTTP {}", status)),
            Err(AppError::Timeout(_)) => LatencySample::timeout(mirror, limit),
            Err(e) => LatencySample::failed(mirror, None, e.to_string()),
        }
    }

    /// Find the test package on each candidate, one page at a time
    async fn discover_links(
        &self,
        candidates: &[LatencySample],
        observer: &dyn BenchmarkObserver,
    ) -> (Vec<(Mirror, String)>, Vec<ThroughputSample>) {
        let mut found = Vec::new();
        let mut skipped = Vec::new();

        for candidate in candidates {
            let mirror = &candidate.mirror;
            match self
                .locator
                .locate(self.client.as_ref(), mirror, &self.settings.test_package)
                .await
            {
                Ok(url) => {
                    observer.on_link_found(mirror, &url);
                    found.push((mirror.clone(), url));
                }
                Err(e) => {
                    self.link_failure_entry(mirror, &e).log().await;
                    observer.on_link_failed(mirror, &e);
                    skipped.push(ThroughputSample::skipped(mirror.clone(), e.to_string()));
                }
            }
        }

        (found, skipped)
    }

    /// Debug only: the observer already reports the failure to the user
    fn link_failure_entry(&self, mirror: &Mirror, error: &AppError) -> LogEntryBuilder<'_> {
        self.logger
            .debug("Package link discovery failed")
            .field("mirror", &mirror.name)
            .error_info(error)
    }

    /// Download from every discovered link
    async fn measure_downloads(
        &self,
        links: &[(Mirror, String)],
        observer: &dyn BenchmarkObserver,
    ) -> Vec<ThroughputSample> {
        let client = self.client.as_ref();
        let settings = &self.settings;

        let samples = if settings.sequential {
            let mut samples = Vec::with_capacity(links.len());
            for (mirror, url) in links {
                observer.on_download_start(mirror);
                let sample = measure_throughput(client, mirror, url, settings.download_timeout, settings.test_time).await;
                observer.on_throughput(&sample);
                samples.push(sample);
            }
            samples
        } else {
            for (mirror, _) in links {
                observer.on_download_start(mirror);
            }
            let samples = join_all(links.iter().map(|(mirror, url)| {
                measure_throughput(client, mirror, url, settings.download_timeout, settings.test_time)
            }))
            .await;
            for sample in &samples {
                observer.on_throughput(sample);
            }
            samples
        };

        for sample in &samples {
            self.logger.debug("Download test finished").throughput(sample).log().await;
        }
        samples
    }

    /// Run the whole pipeline.
    ///
    /// An empty result (no mirror reachable) is not an error here; the report's
    /// `best` is simply `None`.
    pub async fn run(&self, mirrors: &[Mirror], observer: &dyn BenchmarkObserver) -> Result<BenchmarkReport> {
        let started = Instant::now();

        let latency = self.probe_latencies(mirrors).await?;
        let latency_stage_ms = elapsed_ms(started.elapsed());
        observer.on_latency_complete(&latency);

        let ranked_latency = stats::rank_by_latency(&latency);
        self.logger
            .info("Latency stage complete")
            .field("reachable", ranked_latency.len())
            .field("total", latency.len())
            .field("elapsed_ms", latency_stage_ms)
            .log()
            .await;

        let mut report = BenchmarkReport {
            latency,
            ranking: Vec::new(),
            package_links: BTreeMap::new(),
            throughput: Vec::new(),
            best: None,
            download_skipped: self.settings.skip_download,
            latency_stage_ms,
            total_ms: 0.0,
        };

        if ranked_latency.is_empty() || self.settings.skip_download {
            report.best = stats::select_best(&[], &ranked_latency);
            report.total_ms = elapsed_ms(started.elapsed());
            return Ok(report);
        }

        let candidates = stats::select_top(&ranked_latency, self.settings.top_count);
        observer.on_candidates(&candidates);

        let (links, skipped) = self.discover_links(&candidates, observer).await;
        report.package_links = links
            .iter()
            .map(|(mirror, url)| (mirror.name.clone(), url.clone()))
            .collect();

        let mut samples = self.measure_downloads(&links, observer).await;
        samples.extend(skipped);

        let ranked_throughput = stats::rank_by_throughput(&samples);
        report.ranking = stats::merge_rankings(&ranked_throughput, &ranked_latency);
        report.best = stats::select_best(&ranked_throughput, &ranked_latency);
        report.throughput = samples;
        report.total_ms = elapsed_ms(started.elapsed());

        Ok(report)
    }
}

fn elapsed_ms(elapsed: Duration) -> f64 {
    crate::models::metrics::round2(elapsed.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientSettings, DownloadResponse, MirrorClient, PageResponse};
    use crate::logging::LogLevel;
    use crate::types::ProbeStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const PAGE: &str = r#"<a href="../../files/demo-1.0.0-py3-none-any.whl#sha256=0">demo</a>"#;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl BenchmarkObserver for RecordingObserver {
        fn on_latency_complete(&self, samples: &[LatencySample]) {
            self.push(format!("latency:{}", samples.len()));
        }
        fn on_candidates(&self, top: &[LatencySample]) {
            self.push(format!("candidates:{}", top.len()));
        }
        fn on_link_found(&self, mirror: &Mirror, _url: &str) {
            self.push(format!("link:{}", mirror.name));
        }
        fn on_link_failed(&self, mirror: &Mirror, _error: &AppError) {
            self.push(format!("nolink:{}", mirror.name));
        }
        fn on_download_start(&self, mirror: &Mirror) {
            self.push(format!("download:{}", mirror.name));
        }
        fn on_throughput(&self, sample: &ThroughputSample) {
            self.push(format!("speed:{}", sample.mirror.name));
        }
    }

    /// A mirror that answers probes and serves the `demo` package
    async fn serving_mirror(delay: Duration) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/simple"))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/simple/demo/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/demo-1.0.0-py3-none-any.whl"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 128 * 1024]))
            .mount(&server)
            .await;
        server
    }

    async fn status_mirror(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    fn mirror(name: &str, server: &MockServer) -> Mirror {
        Mirror::new(name, format!("{}/simple", server.uri()))
    }

    fn settings() -> BenchmarkSettings {
        BenchmarkSettings {
            probe_timeout: Duration::from_secs(2),
            concurrency: 4,
            page_timeout: Duration::from_secs(2),
            download_timeout: Duration::from_secs(2),
            test_time: Duration::from_secs(1),
            top_count: 3,
            test_package: "demo".to_string(),
            sequential: false,
            skip_download: false,
        }
    }

    fn benchmark(settings: BenchmarkSettings) -> MirrorBenchmark {
        let client = Arc::new(MirrorClient::new(&ClientSettings::default()).unwrap());
        let extractor =
            LinkExtractor::new(Some((3, 11)), crate::client::platform::platform_pattern_for("linux", "x86_64")).unwrap();
        let mut logger = Logger::new("test");
        logger.set_level(crate::logging::LogLevel::Error);
        MirrorBenchmark::new(client, settings, extractor, logger)
    }

    #[tokio::test]
    async fn test_probe_orders_reachable_then_failures() {
        let slow = serving_mirror(Duration::from_millis(300)).await;
        let fast = serving_mirror(Duration::ZERO).await;
        let broken = status_mirror(500).await;
        let moved = status_mirror(302).await;

        let mirrors = vec![
            mirror("broken", &broken),
            mirror("slow", &slow),
            Mirror::new("refused", "http://127.0.0.1:9/simple"),
            mirror("fast", &fast),
            mirror("moved", &moved),
        ];

        let samples = benchmark(settings()).probe_latencies(&mirrors).await.unwrap();
        let names: Vec<&str> = samples.iter().map(|s| s.mirror.name.as_str()).collect();

        // 3xx counts as reachable
        assert!(names[..2].contains(&"fast"));
        assert!(names[..2].contains(&"moved"));
        assert_eq!(names[2], "slow");
        assert_eq!(&names[3..], &["broken", "refused"]);

        let broken_sample = &samples[3];
        assert_eq!(broken_sample.http_status, Some(500));
        assert_eq!(broken_sample.error_message.as_deref(), Some("HTTP 500"));
        assert!(samples[4].latency_ms.is_none());
    }

    #[tokio::test]
    async fn test_probe_timeout_is_recorded() {
        let stalled = serving_mirror(Duration::from_secs(5)).await;
        let mut settings = settings();
        settings.probe_timeout = Duration::from_millis(200);

        let samples = benchmark(settings).probe_latencies(&[mirror("stalled", &stalled)]).await.unwrap();
        assert_eq!(samples[0].status, ProbeStatus::Timeout);
    }

    #[tokio::test]
    async fn test_probe_with_concurrency_one() {
        let a = serving_mirror(Duration::ZERO).await;
        let b = serving_mirror(Duration::ZERO).await;
        let mut settings = settings();
        settings.concurrency = 1;

        let samples = benchmark(settings)
            .probe_latencies(&[mirror("a", &a), mirror("b", &b)])
            .await
            .unwrap();
        assert!(samples.iter().all(|s| s.is_successful()));
    }

    /// Counts HEAD requests in flight and remembers the peak
    #[derive(Default)]
    struct InFlightCounter {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for InFlightCounter {
        async fn head(&self, _url: &str, _limit: Duration) -> Result<u16> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(200)
        }

        async fn get_text(&self, url: &str, _limit: Duration) -> Result<PageResponse> {
            Ok(PageResponse { status: 404, final_url: url.to_string(), body: String::new() })
        }

        async fn open_download(&self, url: &str, _limit: Duration) -> Result<DownloadResponse> {
            Err(AppError::network(format!("no downloads from {}", url)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_requests_never_exceed_concurrency() {
        let counter = Arc::new(InFlightCounter::default());
        let mut settings = settings();
        settings.concurrency = 2;
        let extractor = LinkExtractor::new(None, crate::client::platform::platform_pattern_for("linux", "x86_64")).unwrap();
        let mut logger = Logger::new("test");
        logger.set_level(LogLevel::Error);
        let bench = MirrorBenchmark::new(counter.clone(), settings, extractor, logger);

        let mirrors: Vec<Mirror> = (0..8)
            .map(|i| Mirror::new(format!("m{}", i), format!("https://m{}.example/simple", i)))
            .collect();
        let samples = bench.probe_latencies(&mirrors).await.unwrap();

        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|s| s.is_successful()));
        assert_eq!(counter.peak.load(Ordering::SeqCst), 2);
        assert_eq!(counter.current.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_link_failure_is_debug_only() {
        let bench = benchmark(settings());
        let failed = Mirror::new("nolink", "https://nolink.example/simple");
        let builder = bench.link_failure_entry(&failed, &AppError::network("HTTP 404"));
        let entry = builder.entry();

        assert_eq!(entry.level, LogLevel::Debug);
        assert_eq!(entry.fields["mirror"], "nolink");

        let mut warn_logger = Logger::new("benchmark");
        warn_logger.set_level(LogLevel::Warn);
        tokio_test::block_on(async {
            assert!(warn_logger.render(entry.clone()).await.is_none());
        });
    }

    #[tokio::test]
    async fn test_run_full_pipeline() {
        let fast = serving_mirror(Duration::ZERO).await;
        let other = serving_mirror(Duration::from_millis(100)).await;
        let observer = RecordingObserver::default();

        let report = benchmark(settings())
            .run(&[mirror("other", &other), mirror("fast", &fast)], &observer)
            .await
            .unwrap();

        assert!(!report.download_skipped);
        assert_eq!(report.ranking.len(), 2);
        assert_eq!(report.throughput.len(), 2);
        assert!(report.package_links["fast"].ends_with("/files/demo-1.0.0-py3-none-any.whl"));
        assert!(report.best.is_some());
        assert!(report.total_ms >= report.latency_stage_ms);

        let events = observer.events();
        assert_eq!(events[0], "latency:2");
        assert_eq!(events[1], "candidates:2");
        assert_eq!(events.iter().filter(|e| e.starts_with("speed:")).count(), 2);
    }

    #[tokio::test]
    async fn test_run_sequential_reports_each_download_in_turn() {
        let a = serving_mirror(Duration::ZERO).await;
        let b = serving_mirror(Duration::from_millis(100)).await;
        let observer = RecordingObserver::default();
        let mut settings = settings();
        settings.sequential = true;

        benchmark(settings)
            .run(&[mirror("a", &a), mirror("b", &b)], &observer)
            .await
            .unwrap();

        let downloads: Vec<String> = observer
            .events()
            .into_iter()
            .filter(|e| e.starts_with("download:") || e.starts_with("speed:"))
            .collect();
        assert_eq!(downloads, vec!["download:a", "speed:a", "download:b", "speed:b"]);
    }

    #[tokio::test]
    async fn test_run_limits_candidates_to_top_count() {
        let a = serving_mirror(Duration::ZERO).await;
        let b = serving_mirror(Duration::from_millis(200)).await;
        let mut settings = settings();
        settings.top_count = 1;

        let report = benchmark(settings)
            .run(&[mirror("b", &b), mirror("a", &a)], &NoopObserver)
            .await
            .unwrap();

        assert_eq!(report.throughput.len(), 1);
        assert_eq!(report.best_name(), Some("a"));
    }

    #[tokio::test]
    async fn test_run_missing_package_falls_back_to_latency() {
        // Answers probes but has no package page
        let bare = status_mirror(200).await;
        let observer = RecordingObserver::default();

        let report = benchmark(settings()).run(&[mirror("bare", &bare)], &observer).await.unwrap();

        assert!(report.ranking.is_empty());
        assert_eq!(report.throughput[0].status, ProbeStatus::Skipped);
        assert_eq!(report.best_name(), Some("bare"));
        assert!(observer.events().contains(&"nolink:bare".to_string()));
    }

    #[tokio::test]
    async fn test_run_skip_download_picks_lowest_latency() {
        let fast = serving_mirror(Duration::ZERO).await;
        let slow = serving_mirror(Duration::from_millis(300)).await;
        let observer = RecordingObserver::default();
        let mut settings = settings();
        settings.skip_download = true;

        let report = benchmark(settings)
            .run(&[mirror("slow", &slow), mirror("fast", &fast)], &observer)
            .await
            .unwrap();

        assert!(report.download_skipped);
        assert!(report.ranking.is_empty());
        assert_eq!(report.best_name(), Some("fast"));
        assert_eq!(observer.events(), vec!["latency:2"]);
    }

    #[tokio::test]
    async fn test_run_nothing_reachable() {
        let broken = status_mirror(503).await;
        let report = benchmark(settings())
            .run(&[mirror("broken", &broken)], &NoopObserver)
            .await
            .unwrap();

        assert!(report.best.is_none());
        assert_eq!(report.unreachable().count(), 1);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.test_time_seconds = 7;
        config.sequential = true;
        let settings = BenchmarkSettings::from(&config);
        assert_eq!(settings.test_time, Duration::from_secs(7));
        assert!(settings.sequential);
        assert_eq!(settings.top_count, crate::defaults::DEFAULT_TOP_COUNT);
    }
}
