//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{Cli, ProbeArgs},
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Builds the configuration: defaults, then `.env`, then the environment, then CLI flags
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file()?;
        self.parse_without_env_file()
    }

    /// Same as [`parse`](Self::parse) but ignores any `.env` file
    pub fn parse_without_env_file(&self) -> Result<Config> {
        let mut config = Config::default();
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(probe) = self.cli.probe_args() {
            apply_probe_args(config, probe);
        }

        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        config.json = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;
    }
}

/// Copy every benchmark option given on the command line into the config
pub fn apply_probe_args(config: &mut Config, probe: &ProbeArgs) {
    if probe.no_download_test {
        config.skip_download_test = true;
    }
    if probe.sequential {
        config.sequential = true;
    }
    if let Some(top_count) = probe.top_count {
        config.top_count = top_count;
    }
    if let Some(package) = &probe.package {
        config.test_package = package.trim().to_string();
    }
    if let Some(test_time) = probe.test_time {
        config.test_time_seconds = test_time;
    }
    if let Some(timeout) = probe.timeout {
        config.probe_timeout_seconds = timeout;
    }
    if let Some(concurrency) = probe.concurrency {
        config.probe_concurrency = concurrency;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Human-readable configuration summary for debug output
pub fn display_config_summary(config: &Config) -> String {
    let names: Vec<&str> = config.mirrors.iter().map(|m| m.name.as_str()).collect();
    [
        format!("Mirrors: {}", names.join(", ")),
        format!("Python: {}", config.python),
        format!("Probe timeout: {}s", config.probe_timeout_seconds),
        format!("Probe concurrency: {}", config.probe_concurrency),
        format!("Test package: {}", config.test_package),
        format!("Test time: {}s", config.test_time_seconds),
        format!("Top count: {}", config.top_count),
        format!("Sequential downloads: {}", config.sequential),
        format!("Download test: {}", if config.skip_download_test { "skipped" } else { "enabled" }),
        format!("Color output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ]
    .join("\n")
}
