//! Command-line interface module with topic help

pub mod help;

pub use help::HelpSystem;

use clap::{Args, Parser, Subcommand};

/// tpip - find the fastest pip mirror and switch to it
#[derive(Parser, Debug, Clone)]
#[command(name = "tpip")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Force colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print the benchmark report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Show help for a specific topic (env, examples, mirrors, output)
    #[arg(long, value_name = "TOPIC")]
    pub help_topic: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Benchmark every mirror and show the fastest
    List(ProbeArgs),

    /// Point pip at a mirror; benchmarks and picks the fastest when no name is given
    Set {
        /// Mirror name from the catalogue (see `tpip mirrors`)
        mirror: Option<String>,

        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Remove the mirror from pip's configuration
    Unset,

    /// Print the mirror catalogue without probing
    Mirrors,
}

impl Commands {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List(_) => "list",
            Commands::Set { .. } => "set",
            Commands::Unset => "unset",
            Commands::Mirrors => "mirrors",
        }
    }
}

/// Options of a benchmark run
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ProbeArgs {
    /// Skip the download speed test
    #[arg(long)]
    pub no_download_test: bool,

    /// Number of lowest-latency mirrors that get a download test
    #[arg(long, value_name = "N", value_parser = parse_count)]
    pub top_count: Option<usize>,

    /// Package downloaded in the speed test
    #[arg(long, value_name = "NAME")]
    pub package: Option<String>,

    /// Download time limit per mirror in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_duration)]
    pub test_time: Option<u64>,

    /// Test downloads one mirror at a time
    #[arg(long)]
    pub sequential: bool,

    /// Latency probe timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Maximum number of latency probes in flight
    #[arg(long, value_name = "N", value_parser = parse_count)]
    pub concurrency: Option<usize>,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(topic) = &self.help_topic {
            if HelpSystem::resolve_topic(topic).is_none() {
                return Err(format!(
                    "Unknown help topic: '{}'. Available topics: {}",
                    topic,
                    HelpSystem::TOPICS.join(", ")
                ));
            }
        }

        if let Some(Commands::Set { mirror: Some(name), .. }) = &self.command {
            if name.trim().is_empty() {
                return Err("Mirror name cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Benchmark options of the chosen subcommand, if it benchmarks
    pub fn probe_args(&self) -> Option<&ProbeArgs> {
        match &self.command {
            Some(Commands::List(probe)) | Some(Commands::Set { probe, .. }) => Some(probe),
            _ => None,
        }
    }

    /// Check if help should be displayed for a specific topic
    pub fn should_show_topic_help(&self) -> bool {
        self.help_topic.is_some()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Display help for the requested topic
    pub fn display_help(&self) -> String {
        let help_system = HelpSystem::new();
        let use_colors = self.use_colors();

        match &self.help_topic {
            // unknown topics are rejected by `validate`
            Some(topic) => help_system.display_topic_help(topic, use_colors).unwrap_or_default(),
            None => help_system.display_topic_help("examples", use_colors).unwrap_or_default(),
        }
    }
}

/// Parse a positive number of seconds, at most 300
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::models::config::MAX_SECONDS {
                Err(format!("Duration cannot exceed {} seconds", crate::models::config::MAX_SECONDS))
            } else {
                Ok(secs)
            }
        })
}

/// Parse a count that must be at least 1
fn parse_count(s: &str) -> Result<usize, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid number: {}", s));
    }

    match s.parse::<usize>() {
        Ok(0) => Err("Value must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("Invalid number: {}", s)),
    }
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
