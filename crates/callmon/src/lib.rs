//! Client for a telephony device's TCP call-monitor feed.
//!
//! The device streams one `;`-separated record per `\r\n`-terminated line.
//! This crate turns that stream into typed [`PhoneEvent`]s:
//!
//! - [`assembler`] rebuilds lines from arbitrarily chunked bytes,
//! - [`record`] decodes a line into an event, degrading rather than failing,
//! - [`dispatch`] routes events to subscribers by kind,
//! - [`monitor`] ties them to a TCP connection and its lifecycle.
//!
//! [`reader::LineReader`] applies the same framing to any [`std::io::Read`],
//! which is how recorded traffic is replayed.

pub mod assembler;
pub mod dispatch;
pub mod event;
pub mod monitor;
pub mod reader;
pub mod record;

pub use assembler::{AssemblerError, CRLF, LineAssembler};
pub use dispatch::{
    Dispatcher, FailureReason, HandlerError, HandlerFailure, PublishError, Routed, Subscription,
    SubscriptionId, Topic, UnknownTopic,
};
pub use event::{CallRecord, EventKind, PhoneEvent, format_date};
pub use monitor::{
    CallMonitor, MonitorError, MonitorOptions, TransportEvent, TransportFault, TransportKind,
};
pub use reader::LineReader;
pub use record::{Clock, SystemClock, decode, decode_with_clock};

#[cfg(test)]
mod tests;
