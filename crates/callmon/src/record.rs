//! Decoding of call-monitor records into [`PhoneEvent`]s.
//!
//! Records are `;`-separated:
//!
//! ```text
//! DD.MM.YY HH:mm:ss;RING;<connId>;<caller>;<callee>;
//! DD.MM.YY HH:mm:ss;CALL;<connId>;<extension>;<caller>;<callee>;
//! DD.MM.YY HH:mm:ss;CONNECT;<connId>;<extension>;<number>;
//! DD.MM.YY HH:mm:ss;DISCONNECT;<connId>;<durationSeconds>;
//! ```
//!
//! Decoding never fails. Lines that are too short or carry an unknown record
//! type are dropped; unreadable timestamps and numbers degrade to the wall
//! clock and `None` respectively so the record is not lost.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::{debug, trace};

use crate::event::{CallRecord, EventKind, PhoneEvent};

const RECORD_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::record");
const FIELD_SEPARATOR: char = ';';
const MIN_FIELDS: usize = 4;
const CENTURY: i32 = 2000;

/// Source of the timestamp used when a record's own is unreadable.
pub trait Clock {
    /// Current wall-clock time.
    fn now(&self) -> PrimitiveDateTime;
}

/// Reads the system clock in the local offset, or UTC when the local
/// offset cannot be determined.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Decodes `line`, using the system clock as the timestamp fallback.
#[must_use]
pub fn decode(line: &str) -> Option<PhoneEvent> {
    decode_with_clock(line, &SystemClock)
}

/// Decodes `line`, drawing fallback timestamps from `clock`.
#[must_use]
pub fn decode_with_clock<C: Clock + ?Sized>(line: &str, clock: &C) -> Option<PhoneEvent> {
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < MIN_FIELDS {
        trace!(target: RECORD_TARGET, line, "dropping short record");
        return None;
    }
    let field = |index: usize| fields.get(index).copied().unwrap_or_default();

    let Some(kind) = parse_kind(field(1)) else {
        trace!(target: RECORD_TARGET, line, "dropping record of unknown type");
        return None;
    };

    let date = parse_timestamp(field(0)).unwrap_or_else(|| {
        debug!(
            target: RECORD_TARGET,
            timestamp = field(0),
            "unreadable record timestamp, using wall clock"
        );
        clock.now()
    });

    let record = match kind {
        EventKind::Ring => CallRecord::Ring {
            caller: field(3).to_owned(),
            callee: field(4).to_owned(),
        },
        EventKind::Call => CallRecord::Call {
            extension: field(3).to_owned(),
            caller: field(4).to_owned(),
            callee: field(5).to_owned(),
        },
        EventKind::PickUp => CallRecord::PickUp {
            extension: field(3).to_owned(),
            phone_number: field(4).to_owned(),
        },
        EventKind::HangUp => CallRecord::HangUp {
            call_duration: parse_integer(field(3)),
        },
    };

    Some(PhoneEvent {
        date,
        connection_id: parse_integer(field(2)),
        raw_data: line.to_owned(),
        record,
    })
}

/// Maps a record-type token to its kind, ignoring ASCII case.
#[must_use]
pub fn parse_kind(token: &str) -> Option<EventKind> {
    const TOKENS: [(&str, EventKind); 4] = [
        ("RING", EventKind::Ring),
        ("CALL", EventKind::Call),
        ("CONNECT", EventKind::PickUp),
        ("DISCONNECT", EventKind::HangUp),
    ];
    TOKENS
        .iter()
        .find(|(name, _)| token.eq_ignore_ascii_case(name))
        .map(|(_, kind)| *kind)
}

/// Parses the device timestamp `DD.MM.YY HH:mm:ss`; years are `2000 + YY`.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<PrimitiveDateTime> {
    let (date_part, time_part) = text.trim().split_once(' ')?;

    let [day, month, year] = split_numbers(date_part, '.')?;
    let [hour, minute, second] = split_numbers(time_part.trim_start(), ':')?;

    let calendar_month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    let date = Date::from_calendar_date(
        CENTURY + i32::from(year),
        calendar_month,
        u8::try_from(day).ok()?,
    )
    .ok()?;
    let time = Time::from_hms(
        u8::try_from(hour).ok()?,
        u8::try_from(minute).ok()?,
        u8::try_from(second).ok()?,
    )
    .ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

// Exactly three components of one or two ASCII digits each.
fn split_numbers(text: &str, separator: char) -> Option<[u16; 3]> {
    let mut parts = text.split(separator);
    let mut values = [0_u16; 3];
    for value in &mut values {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        *value = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(values)
}

/// Reads a leading integer the way the device's reference client does.
///
/// Leading whitespace is skipped, then an optional sign and the longest run
/// of decimal digits are read; anything after the digits is ignored. Returns
/// `None` when no digit is present or the value overflows.
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed.get(1..)?),
        Some(b'+') => (false, trimmed.get(1..)?),
        _ => (false, trimmed),
    };

    let length = digits
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if length == 0 {
        return None;
    }

    let magnitude: i64 = digits.get(..length)?.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
