//! tpip
//!
//! Benchmarks pip package-index mirrors for latency and download throughput
//! and switches pip's configured index URL to the fastest one.

pub mod app;
pub mod cli;
pub mod config;
pub mod client;
pub mod error;
pub mod executor;
pub mod index;
pub mod logging;
pub mod models;
pub mod output;
pub mod pip;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{BenchmarkReport, Config, LatencySample, MirrorRanking, ThroughputSample};
pub use types::Mirror;
pub use executor::{BenchmarkObserver, MirrorBenchmark};
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Long version string including build metadata
pub fn long_version() -> String {
    let commit = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let built = option_env!("BUILD_TIME").unwrap_or("unknown");
    format!("{} ({} built {})", VERSION, commit, built)
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Built-in mirror catalogue, in display order
    pub const MIRRORS: &[(&str, &str)] = &[
        ("tsinghua", "https://pypi.tuna.tsinghua.edu.cn/simple"),
        ("aliyun", "https://mirrors.aliyun.com/pypi/simple"),
        ("tencent", "https://mirrors.cloud.tencent.com/pypi/simple"),
        ("douban", "https://pypi.doubanio.com/simple"),
        ("huawei", "https://repo.huaweicloud.com/repository/pypi/simple"),
        ("ustc", "https://pypi.mirrors.ustc.edu.cn/simple"),
        ("bfsu", "https://mirrors.bfsu.edu.cn/pypi/web/simple"),
        ("nju", "https://mirror.nju.edu.cn/pypi/web/simple"),
        ("sjtu", "https://mirror.sjtu.edu.cn/pypi/web/simple"),
        ("pypi", "https://pypi.org/simple"),
    ];

    /// Package whose files are downloaded for throughput tests; nearly every mirror carries it
    pub const DEFAULT_TEST_PACKAGE: &str = "torch";

    /// Large, widely mirrored packages that make reasonable test subjects
    pub const POPULAR_PACKAGES: &[&str] = &[
        "torch", "pandas", "matplotlib", "scikit-learn", "tensorflow",
        "numpy", "django", "flask", "requests", "pillow",
    ];

    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_TEST_TIME_SECS: u64 = 5;
    pub const DEFAULT_TOP_COUNT: usize = 3;
    pub const DEFAULT_PROBE_CONCURRENCY: usize = 5;
    pub const FALLBACK_PIP_VERSION: &str = "21.0.1";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    #[cfg(windows)]
    pub const DEFAULT_PYTHON: &str = "python";
    #[cfg(not(windows))]
    pub const DEFAULT_PYTHON: &str = "python3";
}
