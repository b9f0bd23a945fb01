//! Error types for the call monitor connection.

use std::io;

use thiserror::Error;

use callmon_config::EndpointParseError;

use crate::assembler::AssemblerError;

/// Errors surfaced while configuring or running a [`super::CallMonitor`].
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The monitor was configured with unusable framing.
    #[error("invalid monitor configuration: {0}")]
    Configuration(#[from] AssemblerError),
    /// The configured host could not be read as an endpoint.
    #[error("invalid monitor endpoint: {0}")]
    Endpoint(#[from] EndpointParseError),
    /// Host name resolution failed.
    #[error("failed to resolve monitor address {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but yielded no addresses.
    #[error("no addresses resolved for {endpoint}")]
    ResolveEmpty {
        /// Endpoint being resolved.
        endpoint: String,
    },
    /// Every resolved address refused or timed out.
    #[error("failed to connect to call monitor at {endpoint}: {source}")]
    Connect {
        /// Endpoint being connected to.
        endpoint: String,
        /// Error from the last address tried.
        #[source]
        source: io::Error,
    },
    /// Socket options could not be applied after connecting.
    #[error("failed to configure monitor socket: {source}")]
    Socket {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The reader thread could not be started.
    #[error("failed to spawn monitor reader: {source}")]
    Spawn {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The reader thread panicked outside of a handler.
    #[error("monitor reader thread panicked")]
    ReaderPanicked,
}

impl MonitorError {
    /// I/O error kind closest to this failure, for transport notifications.
    #[must_use]
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Configuration(_) | Self::Endpoint(_) => io::ErrorKind::InvalidInput,
            Self::ResolveEmpty { .. } => io::ErrorKind::AddrNotAvailable,
            Self::Resolve { source, .. }
            | Self::Connect { source, .. }
            | Self::Socket { source }
            | Self::Spawn { source } => source.kind(),
            Self::ReaderPanicked => io::ErrorKind::Other,
        }
    }
}
