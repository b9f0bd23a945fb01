//! Shared configuration for the call monitor client and its CLI.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! TOML file named by `--config-path` or `CALLMON_CONFIG_PATH`, then
//! `CALLMON_*` environment variables, then command-line flags.

use std::borrow::Cow;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_LINE_DELIMITER, DEFAULT_LOG_FILTER,
    DEFAULT_MONITOR_PORT, default_host, default_line_delimiter, default_log_filter_string,
    default_log_format,
};
pub use endpoint::{EndpointParseError, MonitorEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for connecting to a call-monitor port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CALLMON")]
pub struct Config {
    /// Host name or address of the device exposing the monitor port.
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// TCP port of the call-monitor service.
    #[ortho_config(default = defaults::DEFAULT_MONITOR_PORT)]
    pub port: u16,
    /// Record delimiter; `\r`, `\n`, `\t` and `\\` escapes are expanded.
    #[ortho_config(default = defaults::default_line_delimiter())]
    pub line_delimiter: String,
    /// Seconds to wait for the TCP handshake.
    #[ortho_config(default = defaults::DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,
    /// Idle period after which a `timeout` notification is raised.
    pub idle_timeout_secs: Option<u64>,
    /// `tracing` filter expression for the binaries.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_MONITOR_PORT,
            line_delimiter: default_line_delimiter(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint named by `host`, falling back to `port`.
    ///
    /// `host` may carry its own port (`fritz.box:2000`, `[::1]:2000` or
    /// `tcp://fritz.box:2000`), which then wins over `port`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError`] when `host` cannot be parsed.
    pub fn endpoint(&self) -> Result<MonitorEndpoint, EndpointParseError> {
        MonitorEndpoint::parse_with_port(&self.host, self.port)
    }

    /// Delimiter with escape sequences expanded.
    #[must_use]
    pub fn line_delimiter(&self) -> Cow<'_, str> {
        unescape_delimiter(&self.line_delimiter)
    }

    /// Timeout applied while establishing the connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Idle read timeout, if one is configured and non-zero.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Filter expression used when installing the log subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Structured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn unescape_delimiter(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut expanded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(current) = chars.next() {
        if current != '\\' {
            expanded.push(current);
            continue;
        }
        match chars.next() {
            Some('r') => expanded.push('\r'),
            Some('n') => expanded.push('\n'),
            Some('t') => expanded.push('\t'),
            Some('\\') => expanded.push('\\'),
            Some(other) => {
                expanded.push('\\');
                expanded.push(other);
            }
            None => expanded.push('\\'),
        }
    }
    Cow::Owned(expanded)
}
