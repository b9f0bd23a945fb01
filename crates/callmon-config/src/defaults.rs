use crate::logging::LogFormat;

/// Port the call-monitor service listens on unless configured otherwise.
pub const DEFAULT_MONITOR_PORT: u16 = 1012;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "192.168.178.1";

/// Records are terminated by CRLF on the wire.
pub const DEFAULT_LINE_DELIMITER: &str = "\r\n";

/// Seconds allowed for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned default host.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Owned default delimiter.
#[must_use]
pub fn default_line_delimiter() -> String {
    DEFAULT_LINE_DELIMITER.to_owned()
}
