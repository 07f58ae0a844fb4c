//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::config::{parse_mirror_list, MAX_CONCURRENCY, MAX_SECONDS};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the current directory if it exists
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load a specific env file; `Ok(false)` when it does not exist.
    /// Variables already set in the environment win over the file.
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# tpip configuration
#
# Values here are defaults; environment variables and command-line
# arguments override them.

# Replace the built-in mirror catalogue (comma-separated name=url pairs)
# TPIP_MIRRORS=tsinghua=https://pypi.tuna.tsinghua.edu.cn/simple,aliyun=https://mirrors.aliyun.com/pypi/simple

# Interpreter whose pip gets configured (may include launcher arguments)
# TPIP_PYTHON=python3

# Latency probe timeout in seconds
# TPIP_TIMEOUT_SECONDS=10

# Maximum number of latency probes in flight
# TPIP_CONCURRENCY=5

# Package downloaded in the speed test
# TPIP_TEST_PACKAGE=torch

# Download time limit per mirror in seconds
# TPIP_TEST_TIME=5

# Number of lowest-latency mirrors that get a download test
# TPIP_TOP_COUNT=3

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "TPIP_MIRRORS" => {
                let mirrors = parse_mirror_list(value)?;
                if mirrors.is_empty() {
                    return Err(AppError::config("TPIP_MIRRORS must name at least one mirror"));
                }
                for mirror in &mirrors {
                    url::Url::parse(&mirror.url).map_err(|e| {
                        AppError::config(format!("Invalid TPIP_MIRRORS entry '{}': {}", mirror.name, e))
                    })?;
                }
            }
            "TPIP_PYTHON" | "TPIP_TEST_PACKAGE" => {
                if value.is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "TPIP_TIMEOUT_SECONDS" | "TPIP_TEST_TIME" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if secs == 0 || secs > MAX_SECONDS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}", key, MAX_SECONDS, secs
                    )));
                }
            }
            "TPIP_CONCURRENCY" => {
                let n: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if n == 0 || n > MAX_CONCURRENCY {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}", key, MAX_CONCURRENCY, n
                    )));
                }
            }
            "TPIP_TOP_COUNT" => {
                let n: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if n == 0 {
                    return Err(AppError::config("TPIP_TOP_COUNT must be at least 1"));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported environment variables as (name, description, example)
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TPIP_MIRRORS", "Mirror catalogue as name=url pairs", "local=http://127.0.0.1:3141/simple"),
            ("TPIP_PYTHON", "Interpreter used to run pip", "python3"),
            ("TPIP_TIMEOUT_SECONDS", "Latency probe timeout in seconds (1-300)", "10"),
            ("TPIP_CONCURRENCY", "Latency probes in flight (1-64)", "5"),
            ("TPIP_TEST_PACKAGE", "Package downloaded in the speed test", "torch"),
            ("TPIP_TEST_TIME", "Download time limit in seconds (1-300)", "5"),
            ("TPIP_TOP_COUNT", "Mirrors that get a download test", "3"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_content_mentions_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("TPIP_MIRRORS", "a=https://a.example/simple").is_ok());
        assert!(EnvManager::validate_env_var("TPIP_TIMEOUT_SECONDS", "10").is_ok());
        assert!(EnvManager::validate_env_var("TPIP_TEST_TIME", " 300 ").is_ok());
        assert!(EnvManager::validate_env_var("TPIP_CONCURRENCY", "64").is_ok());
        assert!(EnvManager::validate_env_var("TPIP_TOP_COUNT", "1").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("TPIP_MIRRORS", "no-equals-sign").is_err());
        assert!(EnvManager::validate_env_var("TPIP_MIRRORS", "a=not a url").is_err());
        assert!(EnvManager::validate_env_var("TPIP_MIRRORS", " , ").is_err());
        assert!(EnvManager::validate_env_var("TPIP_PYTHON", "  ").is_err());
        assert!(EnvManager::validate_env_var("TPIP_TIMEOUT_SECONDS", "0").is_err());
        assert!(EnvManager::validate_env_var("TPIP_TEST_TIME", "301").is_err());
        assert!(EnvManager::validate_env_var("TPIP_CONCURRENCY", "65").is_err());
        assert!(EnvManager::validate_env_var("TPIP_TOP_COUNT", "zero").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_load_missing_env_file() {
        assert!(!EnvManager::load_env_file_from(Path::new("/nonexistent/.env")).unwrap());
    }
}
