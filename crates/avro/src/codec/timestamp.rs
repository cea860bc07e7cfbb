//! Timestamp logical types: milliseconds or microseconds since the unix epoch.
//!
//! `timestamp-*` values are instants in UTC, `local-timestamp-*` values are
//! wall-clock date-times without a zone. Both share the same arithmetic:
//! seconds are floored toward negative infinity and the sub-second part is
//! always a non-negative offset, so pre-epoch instants round-trip exactly.

use super::Error;
use chrono::{DateTime, NaiveDateTime, Utc};

const MILLIS_PER_SECOND: i64 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;
const NANOS_PER_MILLI: u32 = 1_000_000;
const NANOS_PER_MICRO: u32 = 1_000;

/// Splits an instant into floored epoch seconds and a non-negative nano offset.
fn split(instant: &DateTime<Utc>) -> (i64, u32) {
    (
        instant.timestamp(),
        instant.timestamp_subsec_nanos().min(999_999_999),
    )
}

/// Returns the milliseconds since the epoch, negative before 1970.
pub fn encode_instant_millis(instant: &DateTime<Utc>) -> i64 {
    let (seconds, nanos) = split(instant);
    seconds * MILLIS_PER_SECOND + i64::from(nanos / NANOS_PER_MILLI)
}

/// Returns the instant `millis` milliseconds after (or before) the epoch.
pub fn decode_instant_millis(millis: i64) -> Result<DateTime<Utc>, Error> {
    let seconds = millis.div_euclid(MILLIS_PER_SECOND);
    let nanos = millis.rem_euclid(MILLIS_PER_SECOND) as u32 * NANOS_PER_MILLI;
    DateTime::from_timestamp(seconds, nanos).ok_or(Error::OutOfRange {
        kind: crate::TIMESTAMP_MILLIS,
        value: millis,
    })
}

/// Returns the microseconds since the epoch, negative before 1970.
///
/// A pre-epoch instant with a fractional part is measured from the next
/// whole second, so the intermediate product stays one second closer to zero.
pub fn encode_instant_micros(instant: &DateTime<Utc>) -> i64 {
    let (seconds, nanos) = split(instant);
    if seconds < 0 && nanos > 0 {
        let micros = (seconds + 1) * MICROS_PER_SECOND;
        let adjustment = i64::from(nanos / NANOS_PER_MICRO) - MICROS_PER_SECOND;
        micros + adjustment
    } else {
        seconds * MICROS_PER_SECOND + i64::from(nanos / NANOS_PER_MICRO)
    }
}

/// Returns the instant `micros` microseconds after (or before) the epoch.
pub fn decode_instant_micros(micros: i64) -> Result<DateTime<Utc>, Error> {
    let seconds = micros.div_euclid(MICROS_PER_SECOND);
    let nanos = micros.rem_euclid(MICROS_PER_SECOND) as u32 * NANOS_PER_MICRO;
    DateTime::from_timestamp(seconds, nanos).ok_or(Error::OutOfRange {
        kind: crate::TIMESTAMP_MICROS,
        value: micros,
    })
}

/// Returns the zone-less milliseconds since `1970-01-01T00:00:00`.
pub fn encode_local_timestamp_millis(datetime: &NaiveDateTime) -> i64 {
    encode_instant_millis(&datetime.and_utc())
}

/// Returns the wall-clock date-time `millis` milliseconds from the epoch.
pub fn decode_local_timestamp_millis(millis: i64) -> Result<NaiveDateTime, Error> {
    decode_instant_millis(millis)
        .map(|instant| instant.naive_utc())
        .map_err(|_| Error::OutOfRange {
            kind: crate::LOCAL_TIMESTAMP_MILLIS,
            value: millis,
        })
}

/// Returns the zone-less microseconds since `1970-01-01T00:00:00`.
pub fn encode_local_timestamp_micros(datetime: &NaiveDateTime) -> i64 {
    encode_instant_micros(&datetime.and_utc())
}

/// Returns the wall-clock date-time `micros` microseconds from the epoch.
pub fn decode_local_timestamp_micros(micros: i64) -> Result<NaiveDateTime, Error> {
    decode_instant_micros(micros)
        .map(|instant| instant.naive_utc())
        .map_err(|_| Error::OutOfRange {
            kind: crate::LOCAL_TIMESTAMP_MICROS,
            value: micros,
        })
}
