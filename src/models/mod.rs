//! Data models and structures for tpip

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use metrics::{BenchmarkReport, LatencySample, MirrorRanking, ThroughputSample};
