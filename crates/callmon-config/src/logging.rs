use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the binaries render their diagnostic log lines.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per log line.
    Json,
    /// Terse single-line text.
    #[default]
    Compact,
}

/// Raised when text names no known [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
