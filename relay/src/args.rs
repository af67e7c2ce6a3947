use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, str::FromStr};

use clap::{Parser, ValueEnum};
use config::{CliValues, Config};
use logforth::filter::EnvFilter;
use secrecy::SecretString;
use url::Url;

/// Command-line surface of the relay binary.
///
/// Every option except the logging ones can also be set through a
/// `RELAY_*` environment variable; where both are present, the environment
/// value wins.
#[derive(Debug, Parser)]
#[command(name = "Relay", version, long_about = concat!("Relay v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// Access token for the wrapped upstream platform. Required; also read
    /// from RELAY_ACCESS_TOKEN.
    #[arg(long)]
    pub access_token: Option<String>,
    /// Scope the upstream server to one project. Also RELAY_PROJECT_REF.
    #[arg(long)]
    pub project_ref: Option<String>,
    /// Restrict the upstream server to read-only operations. Also
    /// RELAY_READ_ONLY (true/false/1/0).
    #[arg(long)]
    pub read_only: bool,
    /// Override the upstream platform API base URL. Also RELAY_API_URL.
    #[arg(long)]
    pub api_url: Option<Url>,
    /// IP address and port the server listens on. Also RELAY_LISTEN_ADDRESS.
    /// Default: 127.0.0.1:3002
    #[arg(short, long)]
    pub listen_address: Option<SocketAddr>,
    /// Path serving the SSE event stream. Also RELAY_SSE_PATH.
    /// Default: /sse
    #[arg(long)]
    pub sse_path: Option<String>,
    /// Path accepting posted protocol messages. Also RELAY_MESSAGES_PATH.
    /// Default: /mcp-messages
    #[arg(long)]
    pub messages_path: Option<String>,
    /// Set the logging level, this applies to all spans, logs and trace events.
    #[arg(long = "log", env = "RELAY_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "RELAY_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    pub fn config(&self) -> anyhow::Result<Config> {
        let cli = CliValues {
            access_token: self.access_token.clone().map(SecretString::from),
            project_ref: self.project_ref.clone(),
            read_only: self.read_only,
            api_url: self.api_url.clone(),
            listen_address: self.listen_address,
            sse_path: self.sse_path.clone(),
            messages_path: self.messages_path.clone(),
        };

        Config::from_sources(cli)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    pub fn env_filter(self) -> EnvFilter {
        let filter_str = match self {
            LogLevel::Off => Cow::Borrowed("off"),
            // For other levels, set the default to 'warn' for all crates,
            // but use the selected level for workspace crates
            level => Cow::Owned(format!("warn,relay={level},server={level},mcp={level},config={level}")),
        };

        EnvFilter::from_str(&filter_str).expect("These all are valid env filters.")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
