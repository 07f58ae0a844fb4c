//! Main application orchestration and execution

use crate::{
    cli::{supports_color, Cli, Commands},
    client::{ClientSettings, MirrorClient},
    config::{display_config_summary, load_config, validate_config, ValidationLevel},
    error::{AppError, Result},
    executor::{BenchmarkObserver, MirrorBenchmark},
    logging::Logger,
    models::{BenchmarkReport, Config, LatencySample, ThroughputSample},
    output::{OutputCoordinator, OutputFormatterFactory},
    pip::{PipCommand, PipConfigurator},
    types::Mirror,
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        Ok(Self { cli })
    }

    /// Run the chosen subcommand
    pub async fn run(self) -> Result<()> {
        let mut config = load_config(self.cli.clone())?;
        config.enable_color = config.enable_color && (self.cli.color || supports_color());

        let Some(command) = self.cli.command.clone() else {
            return Ok(());
        };

        let logger = Logger::with_config("tpip", &config);
        let session = logger.start_session().await;
        logger.add_context_field("command", command.name()).await;
        logger
            .debug("Configuration loaded")
            .field("session", &session)
            .field("version", crate::long_version())
            .field("summary", display_config_summary(&config))
            .log()
            .await;

        let output = OutputCoordinator::new(
            OutputFormatterFactory::create_formatter(config.enable_color, config.verbose),
            config.json,
        );

        for warning in validate_config(&config)? {
            if warning.level == ValidationLevel::Warning || config.verbose {
                eprintln!("{}", output.formatter().format_warning(&warning.message)?);
            }
        }

        match command {
            Commands::Mirrors => {
                println!("{}", output.display_mirrors(&config.mirrors)?);
                Ok(())
            }
            Commands::List(_) => {
                let pip = PipCommand::new(&config.python, logger.child("pip"))?;
                Self::benchmark(&config, &pip, &logger, &output).await?;
                Ok(())
            }
            Commands::Set { mirror, .. } => Self::set(&config, mirror.as_deref(), &logger, &output).await,
            Commands::Unset => Self::unset(&config, &logger, &output).await,
        }
    }

    /// Run the benchmark, printing progress and the result tables
    async fn benchmark(
        config: &Config,
        pip: &PipCommand,
        logger: &Logger,
        output: &OutputCoordinator,
    ) -> Result<BenchmarkReport> {
        let environment = pip.detect_environment().await;
        logger
            .debug("Detected Python environment")
            .field("pip_version", &environment.pip_version)
            .field("python_version", environment.python_version)
            .log()
            .await;

        let settings = ClientSettings {
            user_agent: environment.user_agent(),
            ..ClientSettings::default()
        };
        let client = Arc::new(MirrorClient::new(&settings)?);
        let benchmark = MirrorBenchmark::from_config(config, client, environment.python_version, logger.child("benchmark"))?;

        if !output.is_json() {
            eprintln!(
                "{}",
                output.formatter().format_info(&format!(
                    "Probing {} mirrors, please wait...",
                    config.mirrors.len()
                ))?
            );
        }

        let observer = ConsoleObserver::new(output, config);
        let report = benchmark.run(&config.mirrors, &observer).await?;

        println!("{}", output.display_summary(&report)?);
        Ok(report)
    }

    async fn set(config: &Config, name: Option<&str>, logger: &Logger, output: &OutputCoordinator) -> Result<()> {
        let named = name.map(|n| config.find_mirror(n.trim()).cloned()).transpose()?;

        let pip = PipCommand::new(&config.python, logger.child("pip"))?;
        Self::require_pip(&pip, config).await?;

        let mirror = match named {
            Some(mirror) => mirror,
            None => {
                let report = Self::benchmark(config, &pip, logger, output).await?;
                report
                    .best
                    .ok_or_else(|| AppError::no_reachable_mirror("every latency probe failed"))?
            }
        };

        pip.set_index(&mirror).await?;
        Self::status(
            output,
            output.formatter().format_success(&format!(
                "pip now uses '{}' ({}) with trusted host '{}'",
                mirror.name,
                mirror.url,
                mirror.host()?
            ))?,
        );
        Ok(())
    }

    async fn unset(config: &Config, logger: &Logger, output: &OutputCoordinator) -> Result<()> {
        let pip = PipCommand::new(&config.python, logger.child("pip"))?;
        Self::require_pip(&pip, config).await?;

        for key in pip.unset_index().await? {
            eprintln!("{}", output.formatter().format_warning(&format!("{} was not set", key))?);
        }

        Self::status(
            output,
            output
                .formatter()
                .format_success("Mirror removed from pip's configuration; pip uses its default index again")?,
        );
        Ok(())
    }

    async fn require_pip(pip: &PipCommand, config: &Config) -> Result<()> {
        if pip.is_installed().await {
            Ok(())
        } else {
            Err(AppError::package_manager(format!(
                "pip is not available for '{}'",
                config.python
            )))
        }
    }

    /// Status lines go to stdout, or to stderr when stdout carries JSON
    fn status(output: &OutputCoordinator, line: String) {
        if output.is_json() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Prints the latency table as soon as probing ends and download progress to stderr
struct ConsoleObserver<'a> {
    output: &'a OutputCoordinator,
    sequential: bool,
    test_time_seconds: u64,
    package: String,
}

impl<'a> ConsoleObserver<'a> {
    fn new(output: &'a OutputCoordinator, config: &Config) -> Self {
        Self {
            output,
            sequential: config.sequential,
            test_time_seconds: config.test_time_seconds,
            package: config.test_package.clone(),
        }
    }

    fn progress(&self, line: Result<String>) {
        if self.output.is_json() {
            return;
        }
        if let Ok(line) = line {
            eprintln!("{}", line);
        }
    }
}

impl BenchmarkObserver for ConsoleObserver<'_> {
    fn on_latency_complete(&self, samples: &[LatencySample]) {
        if let Ok(table) = self.output.display_latency(samples) {
            if !table.is_empty() {
                println!("{}\n", table);
            }
        }
    }

    fn on_candidates(&self, top: &[LatencySample]) {
        let mode = if self.sequential { "one at a time" } else { "in parallel" };
        self.progress(self.output.formatter().format_info(&format!(
            "Testing download speed of the {} lowest-latency mirrors {} ({}s limit, package '{}')",
            top.len(),
            mode,
            self.test_time_seconds,
            self.package
        )));
    }

    fn on_link_found(&self, mirror: &Mirror, url: &str) {
        self.progress(Ok(format!("{}: package link {}", mirror.name, url)));
    }

    fn on_link_failed(&self, mirror: &Mirror, error: &AppError) {
        self.progress(
            self.output
                .formatter()
                .format_warning(&format!("{}: no package link ({})", mirror.name, error)),
        );
    }

    fn on_download_start(&self, mirror: &Mirror) {
        if self.sequential {
            self.progress(Ok(format!("Downloading from {}...", mirror.name)));
        }
    }

    fn on_throughput(&self, sample: &ThroughputSample) {
        self.progress(self.output.formatter().format_throughput(sample));
    }
}
