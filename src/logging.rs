//! Structured logging for tpip
//!
//! Every entry carries a timestamp, a level, the component that emitted it
//! and a map of structured fields. `--debug` switches to one JSON object per
//! line. All of it goes to stderr; stdout belongs to tables and `--json`.

use crate::error::AppError;
use crate::models::{Config, LatencySample, ThroughputSample};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

/// One log line before rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Component name, e.g. `pip` or `benchmark`
    pub logger: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// `12:00:01.250  INFO [pip] message {key=value}`
    Console,
    /// One JSON object per line
    Json,
}

/// State shared between a logger and its children
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Console logger at Info level without colours
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: false,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::default(),
        }
    }

    /// Warn by default, Info with `--verbose`, Debug as JSON with `--debug`
    pub fn with_config(name: &str, config: &Config) -> Self {
        let (min_level, format) = match (config.debug, config.verbose) {
            (true, _) => (LogLevel::Debug, LogFormat::Json),
            (false, true) => (LogLevel::Info, LogFormat::Console),
            (false, false) => (LogLevel::Warn, LogFormat::Console),
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format,
            ..Self::new(name)
        }
    }

    /// Same settings and context, different component name
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Tag every following entry with a fresh session id and return it
    pub async fn start_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.context.write().await.session_id = Some(id.clone());
        id
    }

    /// Attach `key` to every following entry of this logger and its children
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.write().await.fields.insert(key.to_string(), value);
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.to_string(),
                logger: self.name.clone(),
                fields: BTreeMap::new(),
            },
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    /// The rendered line, or `None` below the minimum level
    pub async fn render(&self, mut entry: LogEntry) -> Option<String> {
        if entry.level < self.min_level {
            return None;
        }

        {
            let context = self.context.read().await;
            if let Some(id) = &context.session_id {
                entry.fields.insert("session_id".to_string(), id.clone().into());
            }
            for (key, value) in &context.fields {
                entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Some(match self.format {
            LogFormat::Console => self.console_line(&entry),
            LogFormat::Json => serde_json::to_string(&entry)
                .unwrap_or_else(|e| format!("{{\"message\":{:?},\"error\":\"{}\"}}", entry.message, e)),
        })
    }

    fn console_line(&self, entry: &LogEntry) -> String {
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color {
            level.color(entry.level.color()).to_string()
        } else {
            level
        };

        let mut line = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );

        // the session id only matters when correlating JSON lines
        let fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != "session_id")
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if !fields.is_empty() {
            line.push_str(&format!(" {{{}}}", fields.join(", ")));
        }
        line
    }
}

/// Collects fields for one entry; nothing is written until [`LogEntryBuilder::log`]
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl LogEntryBuilder<'_> {
    /// Values that fail to serialize are dropped
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn latency(self, sample: &LatencySample) -> Self {
        self.field("mirror", &sample.mirror.name)
            .field("url", &sample.mirror.url)
            .field("latency_ms", sample.latency_ms)
            .field("http_status", sample.http_status)
            .field("status", sample.status)
    }

    pub fn throughput(self, sample: &ThroughputSample) -> Self {
        self.field("mirror", &sample.mirror.name)
            .field("package_url", &sample.package_url)
            .field("bytes", sample.bytes)
            .field("elapsed_secs", sample.elapsed_secs)
            .field("speed_mbps", sample.speed_mbps)
            .field("status", sample.status)
            .field("error", &sample.error_message)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error", error.to_string())
    }

    pub fn entry(&self) -> &LogEntry {
        &self.entry
    }

    pub async fn log(self) {
        if let Some(line) = self.logger.render(self.entry).await {
            let _ = writeln!(io::stderr(), "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mirror;
    use std::time::Duration;

    async fn rendered(logger: &Logger, level: LogLevel) -> bool {
        let entry = logger.log(level, "ping").entry().clone();
        logger.render(entry).await.is_some()
    }

    #[tokio::test]
    async fn test_level_follows_flags() {
        let mut config = Config::default();
        let quiet = Logger::with_config("tpip", &config);
        assert!(!rendered(&quiet, LogLevel::Info).await);
        assert!(rendered(&quiet, LogLevel::Warn).await);

        config.verbose = true;
        let verbose = Logger::with_config("tpip", &config);
        assert!(rendered(&verbose, LogLevel::Info).await);
        assert!(!rendered(&verbose, LogLevel::Debug).await);

        config.debug = true;
        let debug = Logger::with_config("tpip", &config);
        assert!(rendered(&debug, LogLevel::Debug).await);
        assert_eq!(debug.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_latency_fields_on_console() {
        let logger = Logger::new("benchmark");
        let sample = LatencySample::success(Mirror::new("aliyun", "https://a.example/simple"), Duration::from_millis(42), 200);
        let entry = logger.info("latency measured").latency(&sample).entry().clone();

        let line = logger.render(entry).await.unwrap();
        assert!(line.contains(" INFO [benchmark] latency measured"));
        assert!(line.contains("mirror=\"aliyun\""));
        assert!(line.contains("latency_ms=42.0"));
    }

    #[test]
    fn test_filtered_entries_render_nothing() {
        let logger = Logger::new("benchmark");
        let entry = logger.debug("hidden").entry().clone();
        tokio_test::block_on(async {
            assert!(logger.render(entry).await.is_none());
        });
    }

    #[tokio::test]
    async fn test_json_lines_carry_session_and_command() {
        let mut config = Config::default();
        config.debug = true;
        let logger = Logger::with_config("pip", &config);
        let session = logger.start_session().await;
        logger.add_context_field("command", "unset").await;

        let entry = logger.warn("key missing").field("key", "global.trusted-host").entry().clone();
        let value: serde_json::Value = serde_json::from_str(&logger.render(entry).await.unwrap()).unwrap();
        assert_eq!(value["level"], "Warn");
        assert_eq!(value["logger"], "pip");
        assert_eq!(value["fields"]["session_id"], session.as_str());
        assert_eq!(value["fields"]["command"], "unset");
        assert_eq!(value["fields"]["key"], "global.trusted-host");
    }

    #[tokio::test]
    async fn test_child_sees_parent_context() {
        let parent = Logger::new("tpip");
        parent.add_context_field("command", "list").await;
        let child = parent.child("index");
        let entry = child.info("page fetched").entry().clone();
        let line = child.render(entry).await.unwrap();
        assert!(line.contains("[index]"));
        assert!(line.contains("command=\"list\""));
    }

    #[test]
    fn test_error_fields() {
        let logger = Logger::new("pip");
        let entry = logger
            .warn("pip failed")
            .error_info(&AppError::package_manager("exit 1"))
            .entry()
            .clone();
        assert_eq!(entry.fields["error_category"], "PIP");
    }
}
