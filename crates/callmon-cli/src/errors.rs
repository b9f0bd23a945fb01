//! Error type for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use callmon::MonitorError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Failures that end a CLI invocation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration layers could not be merged.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    /// Command-line arguments were rejected.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// Logging could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The monitor could not be configured or connected.
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    /// The device connection failed after it was established.
    #[error("call monitor connection closed with an error")]
    StreamFailed,
    /// A capture file could not be opened.
    #[error("failed to open capture {}: {source}", path.display())]
    OpenCapture {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading the capture failed.
    #[error("failed to read capture: {0}")]
    ReadCapture(#[source] io::Error),
    /// Writing an event to stdout failed.
    #[error("failed to write event: {0}")]
    WriteOutput(#[source] io::Error),
    /// An event could not be serialised as JSON.
    #[error("failed to serialise event: {0}")]
    SerialiseEvent(#[source] serde_json::Error),
    /// An event timestamp could not be rendered.
    #[error("failed to format event date: {0}")]
    FormatDate(#[source] time::error::Format),
}
