//! Configuration data model and validation

use crate::config::env::EnvManager;
use crate::types::{AppError, Mirror, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the probe timeout and the download test time
pub const MAX_SECONDS: u64 = 300;

/// Upper bound for in-flight latency probes
pub const MAX_CONCURRENCY: usize = 64;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mirrors to benchmark, in catalogue order
    #[serde(default = "Mirror::builtin")]
    pub mirrors: Vec<Mirror>,

    /// Python executable used to run `-m pip`
    #[serde(default = "default_python")]
    pub python: String,

    /// Timeout for each latency probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_seconds: u64,

    /// Maximum number of latency probes in flight
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Package whose files are downloaded in the throughput test
    #[serde(default = "default_test_package")]
    pub test_package: String,

    /// Download time limit per mirror
    #[serde(default = "default_test_time_secs")]
    pub test_time_seconds: u64,

    /// Number of lowest-latency mirrors that get a download test
    #[serde(default = "default_top_count")]
    pub top_count: usize,

    /// Run download tests one after another instead of concurrently
    #[serde(default)]
    pub sequential: bool,

    /// Stop after the latency probe
    #[serde(default)]
    pub skip_download_test: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Emit the report as JSON instead of tables
    #[serde(default)]
    pub json: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirrors: Mirror::builtin(),
            python: default_python(),
            probe_timeout_seconds: default_probe_timeout_secs(),
            probe_concurrency: default_probe_concurrency(),
            test_package: default_test_package(),
            test_time_seconds: default_test_time_secs(),
            top_count: default_top_count(),
            sequential: false,
            skip_download_test: false,
            enable_color: default_enable_color(),
            json: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Download test time as Duration
    pub fn test_time(&self) -> Duration {
        Duration::from_secs(self.test_time_seconds)
    }

    /// Look up a mirror by its catalogue name
    pub fn find_mirror(&self, name: &str) -> Result<&Mirror> {
        self.mirrors
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| AppError::mirror_not_found(name))
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.mirrors.is_empty() {
            return Err(AppError::config("Mirror list cannot be empty"));
        }

        let mut seen = HashSet::new();
        for mirror in &self.mirrors {
            if mirror.name.is_empty() {
                return Err(AppError::config(format!("Mirror '{}' has an empty name", mirror.url)));
            }
            if !seen.insert(mirror.name.as_str()) {
                return Err(AppError::config(format!("Duplicate mirror name: {}", mirror.name)));
            }

            match url::Url::parse(&mirror.url) {
                Ok(parsed) => {
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        return Err(AppError::config(format!(
                            "Mirror '{}' must use http or https: {}", mirror.name, mirror.url
                        )));
                    }
                    if parsed.host_str().is_none() {
                        return Err(AppError::config(format!("Mirror '{}' has no host", mirror.name)));
                    }
                }
                Err(e) => {
                    return Err(AppError::config(format!(
                        "Invalid URL for mirror '{}' ({}): {}", mirror.name, mirror.url, e
                    )));
                }
            }
        }

        if self.python.trim().is_empty() {
            return Err(AppError::config("Python executable cannot be empty"));
        }

        if self.test_package.trim().is_empty() {
            return Err(AppError::config("Test package name cannot be empty"));
        }

        if self.probe_timeout_seconds == 0 || self.probe_timeout_seconds > MAX_SECONDS {
            return Err(AppError::config(format!(
                "Probe timeout must be between 1 and {} seconds", MAX_SECONDS
            )));
        }

        if self.test_time_seconds == 0 || self.test_time_seconds > MAX_SECONDS {
            return Err(AppError::config(format!(
                "Download test time must be between 1 and {} seconds", MAX_SECONDS
            )));
        }

        if self.probe_concurrency == 0 || self.probe_concurrency > MAX_CONCURRENCY {
            return Err(AppError::config(format!(
                "Probe concurrency must be between 1 and {}", MAX_CONCURRENCY
            )));
        }

        if self.top_count == 0 {
            return Err(AppError::config("Top count must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration.
    ///
    /// Each variable is checked by [`EnvManager::validate_env_var`] first, so
    /// a bad value is reported under its variable name.
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(mirrors) = validated_env("TPIP_MIRRORS")? {
            self.mirrors = parse_mirror_list(&mirrors)?;
        }

        if let Some(python) = validated_env("TPIP_PYTHON")? {
            self.python = python;
        }

        if let Some(timeout) = validated_env("TPIP_TIMEOUT_SECONDS")? {
            self.probe_timeout_seconds = parse_env("TPIP_TIMEOUT_SECONDS", &timeout)?;
        }

        if let Some(concurrency) = validated_env("TPIP_CONCURRENCY")? {
            self.probe_concurrency = parse_env("TPIP_CONCURRENCY", &concurrency)?;
        }

        if let Some(package) = validated_env("TPIP_TEST_PACKAGE")? {
            self.test_package = package;
        }

        if let Some(test_time) = validated_env("TPIP_TEST_TIME")? {
            self.test_time_seconds = parse_env("TPIP_TEST_TIME", &test_time)?;
        }

        if let Some(top_count) = validated_env("TPIP_TOP_COUNT")? {
            self.top_count = parse_env("TPIP_TOP_COUNT", &top_count)?;
        }

        if let Some(enable_color) = validated_env("ENABLE_COLOR")? {
            self.enable_color = parse_env("ENABLE_COLOR", &enable_color)?;
        }

        Ok(())
    }
}

/// Trimmed value of `key`, if set and valid
fn validated_env(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) => {
            EnvManager::validate_env_var(key, &value)?;
            Ok(Some(value.trim().to_string()))
        }
        Err(_) => Ok(None),
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

/// Parse a `name=url,name=url` list into mirrors
pub fn parse_mirror_list(raw: &str) -> Result<Vec<Mirror>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                AppError::config(format!("Mirror entry '{}' must look like name=url", entry))
            })?;
            Ok(Mirror::new(name.trim(), url.trim()))
        })
        .collect()
}

// Default value functions for serde
fn default_python() -> String {
    crate::defaults::DEFAULT_PYTHON.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_probe_concurrency() -> usize {
    crate::defaults::DEFAULT_PROBE_CONCURRENCY
}

fn default_test_package() -> String {
    crate::defaults::DEFAULT_TEST_PACKAGE.to_string()
}

fn default_test_time_secs() -> u64 {
    crate::defaults::DEFAULT_TEST_TIME_SECS
}

fn default_top_count() -> usize {
    crate::defaults::DEFAULT_TOP_COUNT
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_merge_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("TPIP_TEST_TIME", "12");
        std::env::set_var("TPIP_PYTHON", " py -3 ");
        std::env::set_var("ENABLE_COLOR", "false");

        let mut config = Config::default();
        config.merge_from_env().unwrap();
        assert_eq!(config.test_time_seconds, 12);
        assert_eq!(config.python, "py -3");
        assert!(!config.enable_color);

        std::env::set_var("TPIP_TOP_COUNT", "three");
        assert!(Config::default().merge_from_env().is_err());

        for var in ["TPIP_TEST_TIME", "TPIP_PYTHON", "ENABLE_COLOR", "TPIP_TOP_COUNT"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_env_range_errors_name_the_variable() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        std::env::set_var("TPIP_CONCURRENCY", "1000");
        let err = Config::default().merge_from_env().unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("TPIP_CONCURRENCY must be between 1 and 64"));
        std::env::remove_var("TPIP_CONCURRENCY");

        std::env::set_var("TPIP_TEST_TIME", "0");
        let err = Config::default().merge_from_env().unwrap_err();
        assert!(err.to_string().contains("TPIP_TEST_TIME"));
        std::env::remove_var("TPIP_TEST_TIME");

        std::env::set_var("TPIP_MIRRORS", "broken=not a url");
        let err = Config::default().merge_from_env().unwrap_err();
        assert!(err.to_string().contains("Invalid TPIP_MIRRORS entry 'broken'"));
        std::env::remove_var("TPIP_MIRRORS");

        std::env::set_var("TPIP_PYTHON", "  ");
        let err = Config::default().merge_from_env().unwrap_err();
        assert!(err.to_string().contains("TPIP_PYTHON cannot be empty"));
        std::env::remove_var("TPIP_PYTHON");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.test_package, "torch");
        assert_eq!(config.top_count, 3);
        assert_eq!(config.test_time(), Duration::from_secs(5));
    }

    #[test]
    fn test_empty_mirror_list_invalid() {
        let mut config = Config::default();
        config.mirrors.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_mirror_name_invalid() {
        let mut config = Config::default();
        config.mirrors.push(Mirror::new("tsinghua", "https://example.com/simple"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate mirror name"));
    }

    #[test]
    fn test_non_http_mirror_invalid() {
        let mut config = Config::default();
        config.mirrors = vec![Mirror::new("ftp", "ftp://example.com/simple")];
        assert!(config.validate().is_err());

        config.mirrors = vec![Mirror::new("junk", "not-a-url")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_numeric_bounds() {
        let mut config = Config::default();
        config.test_time_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probe_timeout_seconds = MAX_SECONDS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probe_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.top_count = 0;
        assert!(config.validate().is_err());

        // A top count larger than the catalogue is clamped later, not rejected
        let mut config = Config::default();
        config.top_count = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_find_mirror() {
        let config = Config::default();
        assert_eq!(config.find_mirror("aliyun").unwrap().url, "https://mirrors.aliyun.com/pypi/simple");
        assert!(matches!(config.find_mirror("nope"), Err(AppError::MirrorNotFound(_))));
    }

    #[test]
    fn test_parse_mirror_list() {
        let mirrors = parse_mirror_list(" a=http://127.0.0.1:1/simple/ , b=https://b.example/simple,").unwrap();
        assert_eq!(mirrors.len(), 2);
        assert_eq!(mirrors[0], Mirror::new("a", "http://127.0.0.1:1/simple"));
        assert_eq!(mirrors[1].name, "b");

        assert!(parse_mirror_list("just-a-name").is_err());
    }
}
