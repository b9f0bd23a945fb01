//! Rendering of phone events and transport notifications.
//!
//! Human output is one aligned line per event; JSON output is one object per
//! line using the events' own serialisation.

use std::io::Write;

use callmon::{CallRecord, PhoneEvent, TransportEvent, format_date};
use serde::Serialize;

use crate::AppError;
use crate::cli::ResolvedOutputFormat;

/// Writes events to an output stream in the selected format.
pub(crate) struct EventWriter<'a, W: Write> {
    out: &'a mut W,
    format: ResolvedOutputFormat,
}

impl<'a, W: Write> EventWriter<'a, W> {
    pub(crate) const fn new(out: &'a mut W, format: ResolvedOutputFormat) -> Self {
        Self { out, format }
    }

    pub(crate) fn phone(&mut self, event: &PhoneEvent) -> Result<(), AppError> {
        match self.format {
            ResolvedOutputFormat::Json => self.json(event),
            ResolvedOutputFormat::Human => {
                let line = human_phone(event)?;
                self.line(&line)
            }
        }
    }

    pub(crate) fn transport(&mut self, event: &TransportEvent) -> Result<(), AppError> {
        match self.format {
            ResolvedOutputFormat::Json => self.json(event),
            ResolvedOutputFormat::Human => self.line(&human_transport(event)),
        }
    }

    fn json<T: Serialize>(&mut self, value: &T) -> Result<(), AppError> {
        let text = serde_json::to_string(value).map_err(AppError::SerialiseEvent)?;
        self.line(&text)
    }

    fn line(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.out, "{text}")
            .and_then(|()| self.out.flush())
            .map_err(AppError::WriteOutput)
    }
}

fn human_phone(event: &PhoneEvent) -> Result<String, AppError> {
    let date = format_date(&event.date).map_err(AppError::FormatDate)?;
    let connection = event
        .connection_id
        .map_or_else(|| String::from("#?"), |id| format!("#{id}"));
    let detail = match &event.record {
        CallRecord::Ring { caller, callee } => format!("from {caller} to {callee}"),
        CallRecord::Call {
            extension,
            caller,
            callee,
        } => format!("extension {extension} dials {callee} as {caller}"),
        CallRecord::PickUp {
            extension,
            phone_number,
        } => format!("extension {extension} answered {phone_number}"),
        CallRecord::HangUp {
            call_duration: Some(seconds),
        } => format!("ended after {seconds}s"),
        CallRecord::HangUp {
            call_duration: None,
        } => String::from("ended"),
    };
    Ok(format!(
        "{date}  {kind:<7} {connection:<4} {detail}",
        kind = event.kind().to_string()
    ))
}

fn human_transport(event: &TransportEvent) -> String {
    match event {
        TransportEvent::Connect { endpoint } => format!("-- connected to {endpoint}"),
        TransportEvent::End => String::from("-- device closed the stream"),
        TransportEvent::Timeout => String::from("-- no data within the idle timeout"),
        TransportEvent::Error(fault) => format!("-- connection error: {}", fault.message),
        TransportEvent::Close { had_error: false } => String::from("-- connection closed"),
        TransportEvent::Close { had_error: true } => {
            String::from("-- connection closed after an error")
        }
    }
}
