//! Error handling for tpip

use thiserror::Error;

/// Custom error types for tpip
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors (bad status, malformed response)
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (subprocess spawning, file access)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, regexes)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// pip invocation failed
    #[error("Package manager error: {0}")]
    PackageManager(String),

    /// A mirror name that is not in the catalogue
    #[error("Unknown mirror: {0}")]
    MirrorNotFound(String),

    /// Benchmarking found no mirror that answered
    #[error("No reachable mirror: {0}")]
    NoReachableMirror(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    // Constructors, one per variant

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    pub fn package_manager<S: Into<String>>(message: S) -> Self {
        Self::PackageManager(message.into())
    }

    pub fn mirror_not_found<S: Into<String>>(name: S) -> Self {
        Self::MirrorNotFound(name.into())
    }

    pub fn no_reachable_mirror<S: Into<String>>(message: S) -> Self {
        Self::NoReachableMirror(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Short tag shown in brackets before the message
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::PackageManager(_) => "PIP",
            Self::MirrorNotFound(_) => "MIRROR",
            Self::NoReachableMirror(_) => "UNREACHABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if running the command again might succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::NoReachableMirror(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::MirrorNotFound(_) => false,
            Self::Io(_) | Self::PackageManager(_) | Self::Internal(_) => false,
        }
    }

    /// Longer explanation with a hint, shown with --verbose
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file, TPIP_* environment variables or command line arguments.", msg)
            }
            Self::Network(msg) => {
                format!("Could not talk to the mirror: {}\n\nSuggestion: Check your connection or HTTPS_PROXY settings.", msg)
            }
            Self::HttpRequest(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: The mirror may be down or rate limiting. Try again later or pick another mirror.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the timeout with --timeout or check your network connection.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the mirror URLs and numeric options.", msg)
            }
            Self::Io(msg) => {
                format!("Operation failed: {}\n\nSuggestion: Check that Python is installed and on your PATH (or set TPIP_PYTHON).", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input or configuration values.", msg)
            }
            Self::PackageManager(msg) => {
                format!("pip reported an error: {}\n\nSuggestion: Run 'python -m pip config list' to inspect the current configuration.", msg)
            }
            Self::MirrorNotFound(name) => {
                format!("Mirror '{}' is not in the catalogue.\n\nSuggestion: Run 'tpip mirrors' to see the available names.", name)
            }
            Self::NoReachableMirror(msg) => {
                format!("Could not reach any mirror: {}\n\nSuggestion: Check your internet connection or proxy settings.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is a tpip bug; please report it at https://github.com/caoergou/tpip/issues", msg)
            }
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::MirrorNotFound(_) => 1,
            Self::Network(_) | Self::HttpRequest(_) | Self::NoReachableMirror(_) => 2,
            Self::Timeout(_) => 3,
            Self::PackageManager(_) => 4,
            Self::Io(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// `[CATEGORY] message`, coloured by severity when `use_color` is set
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();
        if !use_color {
            return format!("[{}] {}", category, message);
        }

        use colored::{Color, Colorize};
        let color = match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::MirrorNotFound(_) => Color::Red,
            Self::Network(_) | Self::HttpRequest(_) | Self::NoReachableMirror(_) => Color::Yellow,
            Self::Timeout(_) => Color::Blue,
            Self::PackageManager(_) => Color::Magenta,
            Self::Io(_) => Color::Cyan,
            Self::Internal(_) => Color::BrightRed,
        };
        format!("[{}] {}", category.color(color).bold(), message.color(color))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("bad URL: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", error))
    }
}

impl From<regex::Error> for AppError {
    fn from(error: regex::Error) -> Self {
        Self::internal(format!("Invalid pattern: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("cannot read .env: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("expected a whole number: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("expected true or false: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user-facing error output
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Print the rendered error to stderr
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }

    /// Render the report without printing it
    pub fn render(&self, error: &AppError) -> String {
        let mut out = error.format_for_console(self.use_color);

        if self.verbose {
            out.push_str("\n\n");
            out.push_str(&error.user_friendly_message());

            if error.is_recoverable() {
                let hint = "This error might be temporary. You can try running the command again.";
                out.push_str("\n\n");
                if self.use_color {
                    use colored::Colorize;
                    out.push_str(&hint.green().to_string());
                } else {
                    out.push_str(hint);
                }
            }
        }

        out
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
