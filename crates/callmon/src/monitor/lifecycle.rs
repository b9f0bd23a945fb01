//! Socket lifecycle notifications forwarded to subscribers.

use std::io;

use callmon_config::MonitorEndpoint;
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use crate::dispatch::{Routed, Topic};

/// Kinds of transport notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportKind {
    /// Connection established.
    Connect,
    /// The device closed its side of the stream.
    End,
    /// No data arrived within the configured idle period.
    Timeout,
    /// The socket reported an error.
    Error,
    /// The connection is fully closed.
    Close,
}

impl Topic for TransportKind {
    const CATCH_ALL: &'static str = "transport";
}

/// A socket lifecycle notification, forwarded without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransportEvent {
    /// Connection established to `endpoint`.
    Connect {
        /// Endpoint that accepted the connection.
        #[serde(serialize_with = "serialize_display")]
        endpoint: MonitorEndpoint,
    },
    /// The device closed its side of the stream.
    End,
    /// The idle read timeout elapsed; reading continues.
    Timeout,
    /// The socket failed; a `Close` follows.
    Error(TransportFault),
    /// The connection is closed; `had_error` is set after an `Error`.
    Close {
        /// Whether the connection closed because of an error.
        had_error: bool,
    },
}

impl Routed for TransportEvent {
    type Kind = TransportKind;

    fn kind(&self) -> TransportKind {
        match self {
            Self::Connect { .. } => TransportKind::Connect,
            Self::End => TransportKind::End,
            Self::Timeout => TransportKind::Timeout,
            Self::Error(_) => TransportKind::Error,
            Self::Close { .. } => TransportKind::Close,
        }
    }
}

/// Cloneable snapshot of an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportFault {
    /// Error category.
    #[serde(rename = "errorKind", serialize_with = "serialize_display")]
    pub kind: io::ErrorKind,
    /// Error message.
    pub message: String,
}

impl From<&io::Error> for TransportFault {
    fn from(error: &io::Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<&super::MonitorError> for TransportFault {
    fn from(error: &super::MonitorError) -> Self {
        Self {
            kind: error.io_kind(),
            message: error.to_string(),
        }
    }
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
