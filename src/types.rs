//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// A named package-index mirror
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mirror {
    /// Short name used on the command line (e.g. "tsinghua")
    pub name: String,
    /// Simple-index base URL, without a trailing slash
    pub url: String,
}

impl Mirror {
    /// Create a mirror, normalising away a trailing slash on the URL
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Host (and non-default port) of the mirror, as pip expects for `trusted-host`
    pub fn host(&self) -> Result<String> {
        let parsed = url::Url::parse(&self.url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::validation(format!("Mirror URL '{}' has no host", self.url)))?;
        Ok(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// URL of the simple-index page listing the files of `package`
    pub fn package_page_url(&self, package: &str) -> String {
        format!("{}/{}/", self.url, package)
    }

    /// The built-in catalogue
    pub fn builtin() -> Vec<Mirror> {
        crate::defaults::MIRRORS
            .iter()
            .map(|(name, url)| Mirror::new(*name, *url))
            .collect()
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Outcome of a single probe or download test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// Measurement completed
    Success,
    /// Request failed or returned an unacceptable status
    Failed,
    /// Request did not complete in time
    Timeout,
    /// Not attempted (e.g. no package link was found)
    Skipped,
}

/// Latency classification used for colour coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    /// Below 100 ms
    Good,
    /// 100 ms to 500 ms
    Moderate,
    /// Above 500 ms
    Poor,
}

impl PerformanceLevel {
    /// Classify a latency measurement in milliseconds
    pub fn from_latency_ms(latency_ms: f64) -> Self {
        if latency_ms < 100.0 {
            Self::Good
        } else if latency_ms < 500.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}
