//! Non-fatal configuration checks
//!
//! `Config::validate` rejects configurations that cannot run. The checks here
//! accept the configuration but point out settings that are likely mistakes.

use crate::{error::Result, models::Config, types::Mirror};

/// Configuration validator producing warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run `Config::validate`, then collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        for mirror in &config.mirrors {
            warnings.extend(Self::validate_mirror(mirror));
        }
        warnings.extend(Self::validate_benchmark_settings(config));
        Ok(warnings)
    }

    fn validate_mirror(mirror: &Mirror) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let Ok(parsed) = url::Url::parse(&mirror.url) else {
            return warnings;
        };

        if parsed.scheme() == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Mirror '{}' uses plain HTTP; pip will need it as a trusted host", mirror.name),
            ));
        }

        if parsed.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Mirror '{}' has a query string, package page URLs will not resolve", mirror.name),
            ));
        }

        if !parsed.path().trim_end_matches('/').ends_with("simple") {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Mirror '{}' does not end in /simple; is it a simple index?", mirror.name),
            ));
        }

        if let Some(url::Host::Ipv4(ip)) = parsed.host() {
            if ip.is_loopback() || ip.is_private() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Mirror '{}' is on a local network", mirror.name),
                ));
            }
        }

        warnings
    }

    fn validate_benchmark_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.top_count > config.mirrors.len() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Top count {} exceeds the {} configured mirrors; all reachable mirrors will be tested",
                    config.top_count,
                    config.mirrors.len()
                ),
            ));
        }

        if !config.skip_download_test && config.test_time_seconds > 60 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Download test time of {}s per mirror will make the benchmark slow",
                    config.test_time_seconds
                ),
            ));
        }

        if config.probe_timeout_seconds < 2 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Probe timeout of {}s may mark distant mirrors as unreachable",
                    config.probe_timeout_seconds
                ),
            ));
        }

        if config.probe_concurrency > config.mirrors.len() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Concurrency {} is higher than the number of mirrors ({})",
                    config.probe_concurrency,
                    config.mirrors.len()
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self) -> String {
        format!("[{}] {}", self.level.as_str(), self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
