//! `time-millis` and `time-micros` logical types: time elapsed since midnight.
//!
//! Sub-unit precision is truncated, never rounded. A chrono leap-second value
//! (`nanosecond() >= 1_000_000_000`) saturates to the last instant of its
//! second, since Avro times have no leap seconds.

use super::Error;
use chrono::{NaiveTime, Timelike};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_MICRO: i64 = 1_000;
const MILLIS_PER_SECOND: i32 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;

/// Milliseconds in one day, the exclusive upper bound of `time-millis`.
pub const MILLIS_PER_DAY: i32 = 86_400_000;
/// Microseconds in one day, the exclusive upper bound of `time-micros`.
pub const MICROS_PER_DAY: i64 = 86_400_000_000;

fn nanos_of_day(time: NaiveTime) -> i64 {
    let nanos = time.nanosecond().min(999_999_999);
    i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(nanos)
}

/// Returns the milliseconds elapsed since midnight.
pub fn encode_time_millis(time: NaiveTime) -> i32 {
    // Bounded by MILLIS_PER_DAY, always fits.
    (nanos_of_day(time) / NANOS_PER_MILLI) as i32
}

/// Returns the time of day `millis` milliseconds after midnight.
pub fn decode_time_millis(millis: i32) -> Result<NaiveTime, Error> {
    let out_of_range = Error::OutOfRange {
        kind: crate::TIME_MILLIS,
        value: millis.into(),
    };
    if !(0..MILLIS_PER_DAY).contains(&millis) {
        return Err(out_of_range);
    }
    let secs = (millis / MILLIS_PER_SECOND) as u32;
    let nanos = (millis % MILLIS_PER_SECOND) as u32 * NANOS_PER_MILLI as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or(out_of_range)
}

/// Returns the microseconds elapsed since midnight.
pub fn encode_time_micros(time: NaiveTime) -> i64 {
    nanos_of_day(time) / NANOS_PER_MICRO
}

/// Returns the time of day `micros` microseconds after midnight.
pub fn decode_time_micros(micros: i64) -> Result<NaiveTime, Error> {
    let out_of_range = Error::OutOfRange {
        kind: crate::TIME_MICROS,
        value: micros,
    };
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return Err(out_of_range);
    }
    let secs = (micros / MICROS_PER_SECOND) as u32;
    let nanos = ((micros % MICROS_PER_SECOND) * NANOS_PER_MICRO) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms_nano(h: u32, m: u32, s: u32, n: u32) -> NaiveTime {
        NaiveTime::from_hms_nano_opt(h, m, s, n).unwrap()
    }

    #[test]
    fn test_encode_birth_time() {
        let time = hms_nano(0, 59, 0, 0);
        assert_eq!(encode_time_millis(time), 3_540_000);
        assert_eq!(encode_time_micros(time), 3_540_000_000);
    }

    #[test]
    fn test_midnight_and_last_instant() {
        assert_eq!(encode_time_millis(NaiveTime::MIN), 0);
        assert_eq!(encode_time_millis(hms_nano(23, 59, 59, 999_000_000)), MILLIS_PER_DAY - 1);
        assert_eq!(encode_time_micros(hms_nano(23, 59, 59, 999_999_000)), MICROS_PER_DAY - 1);
    }

    #[test]
    fn test_encode_truncates() {
        let time = hms_nano(12, 0, 0, 1_999_999);
        assert_eq!(encode_time_millis(time), 43_200_001);
        assert_eq!(encode_time_micros(time), 43_200_001_999);
    }

    #[test]
    fn test_round_trip_millis() {
        for time in [
            NaiveTime::MIN,
            hms_nano(0, 59, 0, 0),
            hms_nano(13, 37, 42, 123_000_000),
            hms_nano(23, 59, 59, 999_000_000),
        ] {
            assert_eq!(decode_time_millis(encode_time_millis(time)).unwrap(), time);
        }
    }

    #[test]
    fn test_round_trip_micros() {
        for time in [
            NaiveTime::MIN,
            hms_nano(0, 59, 0, 0),
            hms_nano(13, 37, 42, 123_456_000),
            hms_nano(23, 59, 59, 999_999_000),
        ] {
            assert_eq!(decode_time_micros(encode_time_micros(time)).unwrap(), time);
        }
    }

    #[test]
    fn test_leap_second_saturates() {
        let leap = NaiveTime::from_hms_milli_opt(23, 59, 59, 1_500).unwrap();
        assert_eq!(encode_time_millis(leap), MILLIS_PER_DAY - 1);
        assert_eq!(encode_time_micros(leap), MICROS_PER_DAY - 1);
    }

    #[test]
    fn test_decode_out_of_range() {
        assert!(decode_time_millis(-1).is_err());
        assert!(decode_time_millis(MILLIS_PER_DAY).is_err());
        assert!(decode_time_micros(-1).is_err());
        assert!(matches!(
            decode_time_micros(MICROS_PER_DAY).unwrap_err(),
            Error::OutOfRange { kind: "time-micros", .. }
        ));
    }
}
