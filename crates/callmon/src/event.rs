//! Typed telephony events decoded from call-monitor records.

use serde::{Serialize, Serializer};
use strum::{Display, EnumString};
use time::PrimitiveDateTime;
use time::macros::format_description;

use crate::dispatch::{Routed, Topic};

/// Closed set of record kinds reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EventKind {
    /// Incoming call is ringing.
    Ring,
    /// Outgoing call was dialled from an extension.
    Call,
    /// A call leg was answered.
    #[strum(to_string = "pickup", serialize = "pick_up")]
    PickUp,
    /// A call leg ended.
    #[strum(to_string = "hangup", serialize = "hang_up")]
    HangUp,
}

impl Topic for EventKind {
    const CATCH_ALL: &'static str = "phone";
}

/// One decoded call-monitor record.
///
/// Fields shared by every kind live on the struct; kind-specific fields live
/// in [`CallRecord`], so a hang-up can never carry a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneEvent {
    /// Device timestamp, or the decode-time wall clock when unreadable.
    #[serde(serialize_with = "serialize_date")]
    pub date: PrimitiveDateTime,
    /// Device-assigned call-leg id; `None` when the field is not a number.
    pub connection_id: Option<i64>,
    /// The record exactly as received.
    pub raw_data: String,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub record: CallRecord,
}

/// Kind-specific payload of a [`PhoneEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CallRecord {
    /// Incoming call.
    Ring {
        /// Number of the calling party.
        caller: String,
        /// Local number being called.
        callee: String,
    },
    /// Outgoing call.
    Call {
        /// Internal extension placing the call.
        extension: String,
        /// Local number used to place the call.
        caller: String,
        /// Dialled number.
        callee: String,
    },
    /// Call answered.
    PickUp {
        /// Internal extension that answered.
        extension: String,
        /// Number of the remote party.
        phone_number: String,
    },
    /// Call ended.
    HangUp {
        /// Duration in seconds; `None` when the field is not a number.
        call_duration: Option<i64>,
    },
}

impl PhoneEvent {
    /// Kind tag of the payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.record.kind()
    }
}

impl CallRecord {
    /// Kind tag of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ring { .. } => EventKind::Ring,
            Self::Call { .. } => EventKind::Call,
            Self::PickUp { .. } => EventKind::PickUp,
            Self::HangUp { .. } => EventKind::HangUp,
        }
    }
}

impl Routed for PhoneEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        self.record.kind()
    }
}

/// Renders a timestamp as `YYYY-MM-DDTHH:MM:SS` without an offset; the
/// device reports local time.
///
/// # Errors
///
/// Returns the formatter error if the date cannot be rendered.
pub fn format_date(date: &PrimitiveDateTime) -> Result<String, time::error::Format> {
    date.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]"
    ))
}

fn serialize_date<S>(date: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = format_date(date).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}
