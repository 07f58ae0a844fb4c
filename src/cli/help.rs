//! Topic help: environment variables, usage examples, the mirror catalogue and output

use crate::{client::platform, config::env::EnvManager};
use colored::*;

/// Topic help printed by `--help-topic`
pub struct HelpSystem {
    platform: String,
}

impl HelpSystem {
    /// Topics accepted by [`HelpSystem::display_topic_help`]
    pub const TOPICS: &'static [&'static str] = &["env", "examples", "mirrors", "output"];

    pub fn new() -> Self {
        Self {
            platform: format!("{} {}", platform::system_name(), platform::machine_name()),
        }
    }

    /// Canonical topic name for `topic` or one of its aliases
    pub fn resolve_topic(topic: &str) -> Option<&'static str> {
        match topic.to_lowercase().as_str() {
            "env" | "environment" | "config" => Some("env"),
            "examples" => Some("examples"),
            "mirrors" => Some("mirrors"),
            "output" | "formatting" => Some("output"),
            _ => None,
        }
    }

    /// Help for one topic, `None` if the topic is unknown
    pub fn display_topic_help(&self, topic: &str, use_colors: bool) -> Option<String> {
        match Self::resolve_topic(topic)? {
            "env" => Some(self.format_environment_help(use_colors)),
            "examples" => Some(self.format_examples_help(use_colors)),
            "mirrors" => Some(self.format_mirrors_help(use_colors)),
            _ => Some(self.format_output_help(use_colors)),
        }
    }

    fn header(title: &str, use_colors: bool) -> String {
        if use_colors {
            title.bright_green().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn format_environment_help(&self, use_colors: bool) -> String {
        let mut output = format!("{}\n", Self::header("ENVIRONMENT VARIABLES:", use_colors));
        output.push_str("Configuration priority: CLI arguments > environment > .env file > defaults\n\n");

        for (var_name, description, example) in EnvManager::get_supported_env_vars() {
            if use_colors {
                output.push_str(&format!("  {}: {}\n", var_name.bright_yellow().bold(), description.white()));
                output.push_str(&format!("      {}\n", format!("Example: {}", example).bright_blue()));
            } else {
                output.push_str(&format!("  {}: {}\n", var_name, description));
                output.push_str(&format!("      Example: {}\n", example));
            }
        }

        output.push_str(&format!(
            "\nThe default interpreter on {} is `{}`.\n",
            self.platform,
            crate::defaults::DEFAULT_PYTHON
        ));
        output.push_str(&format!("\n{}\n", Self::header("EXAMPLE .env FILE:", use_colors)));
        output.push_str(&EnvManager::create_example_env_content());
        output
    }

    fn format_examples_help(&self, use_colors: bool) -> String {
        let examples = [
            ExampleHelp {
                title: "Benchmark all mirrors",
                command: "tpip list",
                description: "Probe latency, then test download speed on the 3 fastest",
            },
            ExampleHelp {
                title: "Latency only",
                command: "tpip list --no-download-test",
                description: "Skip the download test and rank by latency",
            },
            ExampleHelp {
                title: "Custom download test",
                command: "tpip list --package numpy --top-count 5 --test-time 10 --sequential",
                description: "Download numpy from the 5 fastest mirrors, one at a time, 10s each",
            },
            ExampleHelp {
                title: "Switch to the fastest mirror",
                command: "tpip set",
                description: "Benchmark and write the winner into pip's configuration",
            },
            ExampleHelp {
                title: "Switch to a named mirror",
                command: "tpip set tsinghua",
                description: "Skip the benchmark and configure the named mirror",
            },
            ExampleHelp {
                title: "Restore the default index",
                command: "tpip unset",
                description: "Remove global.index-url and global.trusted-host",
            },
            ExampleHelp {
                title: "Machine-readable report",
                command: "tpip list --json --no-download-test",
                description: "Print the benchmark report as JSON",
            },
        ];

        let mut output = format!("{}\n", Self::header("EXAMPLES:", use_colors));
        for example in &examples {
            output.push_str(&example.format(use_colors));
            output.push('\n');
        }
        output.push_str(&format!(
            "Other packages worth testing with --package: {}\n",
            crate::defaults::POPULAR_PACKAGES.join(", ")
        ));
        output
    }

    fn format_mirrors_help(&self, use_colors: bool) -> String {
        let mut output = format!("{}\n", Self::header("BUILT-IN MIRRORS:", use_colors));
        for (name, url) in crate::defaults::MIRRORS {
            if use_colors {
                output.push_str(&format!("  {:<10} {}\n", name.bright_cyan(), url));
            } else {
                output.push_str(&format!("  {:<10} {}\n", name, url));
            }
        }
        output.push_str("\nReplace the catalogue with TPIP_MIRRORS=name=url,name=url\n");
        output
    }

    fn format_output_help(&self, use_colors: bool) -> String {
        let mut output = format!("{}\n", Self::header("OUTPUT:", use_colors));
        output.push_str("  Latency table   reachable mirrors, fastest first\n");
        output.push_str("  Final table     mirrors with a completed download test, fastest first\n");
        output.push_str("  Best mirror     fastest download, or lowest latency without one\n\n");
        output.push_str("Latency colours: green < 100ms, yellow < 500ms, red otherwise.\n");
        output.push_str("Tables go to stdout, progress and logs to stderr. --json prints the\n");
        output.push_str("whole report as a single JSON document.\n");
        output
    }
}

impl Default for HelpSystem {
    fn default() -> Self {
        Self::new()
    }
}

struct ExampleHelp {
    title: &'static str,
    command: &'static str,
    description: &'static str,
}

impl ExampleHelp {
    fn format(&self, use_colors: bool) -> String {
        if use_colors {
            format!(
                "  {}:\n    {}\n    {}\n",
                self.title.bright_yellow().bold(),
                self.command.bright_white(),
                self.description.bright_blue().italic()
            )
        } else {
            format!("  {}:\n    {}\n    {}\n", self.title, self.command, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_topic_renders() {
        let help = HelpSystem::new();
        for topic in HelpSystem::TOPICS {
            let plain = help.display_topic_help(topic, false).unwrap();
            assert!(!plain.is_empty());
            assert!(help.display_topic_help(topic, true).is_some());
        }
        assert!(help.display_topic_help("proxy", false).is_none());
    }

    #[test]
    fn test_topic_aliases() {
        assert_eq!(HelpSystem::resolve_topic("Environment"), Some("env"));
        assert_eq!(HelpSystem::resolve_topic("formatting"), Some("output"));
        assert_eq!(HelpSystem::resolve_topic("proxy"), None);
    }

    #[test]
    fn test_topics_are_case_insensitive() {
        let help = HelpSystem::new();
        assert!(help.display_topic_help("ENV", false).unwrap().contains("ENVIRONMENT VARIABLES:"));
    }

    #[test]
    fn test_mirror_topic_lists_catalogue() {
        let text = HelpSystem::new().display_topic_help("mirrors", false).unwrap();
        assert!(text.contains("tsinghua"));
        assert!(text.contains("https://pypi.org/simple"));
    }

    #[test]
    fn test_examples_plain_has_no_escape_codes() {
        let text = HelpSystem::new().display_topic_help("examples", false).unwrap();
        assert!(text.contains("tpip set tsinghua"));
        assert!(!text.contains('\u{1b}'));
    }
}
