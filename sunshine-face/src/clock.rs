//! Wall-clock access and time decoding

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::ClockError;

/// Source of wall-clock time
pub trait Clock {
    /// Milliseconds since the Unix epoch (UTC)
    fn now_millis(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Convert a UTC offset in seconds, rejecting anything beyond ±24h
pub fn utc_offset(secs: i32) -> Result<FixedOffset, ClockError> {
    FixedOffset::east_opt(secs).ok_or(ClockError::OffsetOutOfRange)
}

/// Local date and time for an epoch timestamp
///
/// Timestamps chrono cannot represent collapse to the epoch.
pub fn local_time(millis: i64, offset: FixedOffset) -> NaiveDateTime {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&offset)
        .naive_local()
}

/// Decode a Current Time Service "Current Time" characteristic (0x2A2B)
///
/// Layout: year (u16 LE), month, day, hours, minutes, seconds,
/// day of week, fractions of 1/256 s, adjust reason.
pub fn decode_current_time(bytes: &[u8]) -> Result<NaiveDateTime, ClockError> {
    let [y0, y1, month, day, hour, min, sec, _weekday, fractions, ..] = *bytes else {
        return Err(ClockError::InvalidTime);
    };
    let year = u16::from_le_bytes([y0, y1]) as i32;
    // Convert fractions_256 to milliseconds
    let milli = fractions as u32 * 1000 / 256;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|date| date.and_hms_milli_opt(hour as u32, min as u32, sec as u32, milli))
        .ok_or(ClockError::InvalidTime)
}

/// Decode a "Local Time Information" characteristic (0x2A0F) into an offset
///
/// Both the time zone and the DST offset are given in quarter hours. A DST
/// value of 255 means unknown and is treated as zero.
pub fn decode_local_time_info(bytes: &[u8]) -> Result<FixedOffset, ClockError> {
    let [zone, dst, ..] = *bytes else {
        return Err(ClockError::OffsetOutOfRange);
    };
    let zone = zone as i8;
    if zone == -128 {
        return Err(ClockError::OffsetOutOfRange);
    }
    let dst = if dst == 255 { 0 } else { dst as i32 };

    utc_offset((zone as i32 + dst) * 15 * 60)
}
