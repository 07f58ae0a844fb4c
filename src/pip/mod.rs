//! pip integration: environment detection and index configuration
//!
//! Everything goes through `<python> -m pip`, so the pip that gets configured
//! is the one belonging to the chosen interpreter.

use crate::{
    client::platform,
    defaults::FALLBACK_PIP_VERSION,
    error::{AppError, Result},
    logging::Logger,
    types::Mirror,
};
use async_trait::async_trait;
use serde::Serialize;
use std::process::Output;
use tokio::process::Command;

/// pip configuration keys written by `set` and removed by `unset`
pub const INDEX_URL_KEY: &str = "global.index-url";
pub const TRUSTED_HOST_KEY: &str = "global.trusted-host";

/// Versions reported by `python -m pip --version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonEnvironment {
    pub pip_version: String,
    /// `(major, minor)` of the interpreter pip runs under, when known
    pub python_version: Option<(u32, u32)>,
}

impl Default for PythonEnvironment {
    fn default() -> Self {
        Self {
            pip_version: FALLBACK_PIP_VERSION.to_string(),
            python_version: None,
        }
    }
}

impl PythonEnvironment {
    /// User-Agent that mirrors see from this pip
    pub fn user_agent(&self) -> String {
        platform::pip_user_agent(&self.pip_version, self.python_version)
    }
}

/// Parse `pip 23.1.2 from /usr/lib/python3/dist-packages/pip (python 3.11)`
pub fn parse_pip_version_output(output: &str) -> Option<PythonEnvironment> {
    let line = output.lines().find(|l| l.trim_start().starts_with("pip "))?;
    let mut words = line.split_whitespace();
    words.next()?;
    let pip_version = words.next()?.to_string();

    let python_version = line
        .rfind("(python ")
        .map(|start| &line[start + "(python ".len()..])
        .and_then(|rest| rest.split(')').next())
        .and_then(|version| {
            let mut parts = version.trim().split('.');
            let major = parts.next()?.parse().ok()?;
            let minor = parts.next()?.parse().ok()?;
            Some((major, minor))
        });

    Some(PythonEnvironment { pip_version, python_version })
}

/// Reads and writes pip's index configuration
#[async_trait]
pub trait PipConfigurator: Send + Sync {
    /// Whether `python -m pip` runs at all
    async fn is_installed(&self) -> bool;

    /// pip and interpreter versions, falling back to defaults when pip cannot tell
    async fn detect_environment(&self) -> PythonEnvironment;

    /// Point `global.index-url` at the mirror and trust its host
    async fn set_index(&self, mirror: &Mirror) -> Result<()>;

    /// Remove both keys. Returns the keys that were not set in the first place.
    async fn unset_index(&self) -> Result<Vec<&'static str>>;
}

/// Runs pip through a Python interpreter
pub struct PipCommand {
    program: String,
    /// Arguments placed before `-m pip`, e.g. `-3` for the Windows `py` launcher
    leading_args: Vec<String>,
    logger: Logger,
}

impl PipCommand {
    /// `python` may carry launcher arguments, e.g. `py -3`
    pub fn new(python: &str, logger: Logger) -> Result<Self> {
        let mut words = python.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| AppError::config("Python executable must not be empty"))?;
        Ok(Self {
            program,
            leading_args: words.collect(),
            logger,
        })
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.leading_args.iter().map(String::as_str));
        parts.extend(["-m", "pip"]);
        parts.extend(args);
        parts.join(" ")
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        self.logger
            .debug("Running pip")
            .field("command", self.describe(args))
            .log()
            .await;

        Command::new(&self.program)
            .args(&self.leading_args)
            .args(["-m", "pip"])
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::package_manager(format!("Failed to run `{}`: {}", self.describe(args), e)))
    }

    /// Run pip and fail with its stderr if it exits unsuccessfully
    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(Self::failure(&self.describe(args), &output))
    }

    fn failure(command: &str, output: &Output) -> AppError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if detail.is_empty() {
            AppError::package_manager(format!("`{}` exited with status {}", command, code))
        } else {
            AppError::package_manager(format!("`{}` exited with status {}: {}", command, code, detail))
        }
    }

    /// Unset one key; `Ok(false)` when pip says the key does not exist
    async fn unset_key(&self, key: &'static str) -> Result<bool> {
        let args = ["config", "unset", key];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(true);
        }
        if String::from_utf8_lossy(&output.stderr).contains("No such key") {
            return Ok(false);
        }
        Err(Self::failure(&self.describe(&args), &output))
    }
}

#[async_trait]
impl PipConfigurator for PipCommand {
    async fn is_installed(&self) -> bool {
        matches!(self.run(&["--version"]).await, Ok(output) if output.status.success())
    }

    async fn detect_environment(&self) -> PythonEnvironment {
        match self.run_checked(&["--version"]).await {
            Ok(stdout) => parse_pip_version_output(&stdout).unwrap_or_default(),
            Err(e) => {
                self.logger
                    .debug("pip version unavailable, using fallback")
                    .error_info(&e)
                    .log()
                    .await;
                PythonEnvironment::default()
            }
        }
    }

    async fn set_index(&self, mirror: &Mirror) -> Result<()> {
        let host = mirror.host()?;
        self.run_checked(&["config", "set", INDEX_URL_KEY, &mirror.url]).await?;
        self.run_checked(&["config", "set", TRUSTED_HOST_KEY, &host]).await?;
        self.logger
            .info("pip index configured")
            .field("mirror", &mirror.name)
            .field("index_url", &mirror.url)
            .field("trusted_host", &host)
            .log()
            .await;
        Ok(())
    }

    async fn unset_index(&self) -> Result<Vec<&'static str>> {
        let mut missing = Vec::new();
        for key in [INDEX_URL_KEY, TRUSTED_HOST_KEY] {
            if !self.unset_key(key).await? {
                missing.push(key);
            }
        }
        Ok(missing)
    }
}
