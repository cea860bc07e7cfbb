//! `date` logical type: signed days since 1970-01-01.

use super::Error;
use chrono::{Datelike, NaiveDate};

/// Day number of 1970-01-01 counted from 0001-01-01 (proleptic Gregorian).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Returns the number of days from the unix epoch, negative before 1970.
pub fn encode_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Returns the calendar date `days` after (or before) the unix epoch.
pub fn decode_date(days: i32) -> Result<NaiveDate, Error> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or(Error::OutOfRange {
            kind: crate::DATE,
            value: days.into(),
        })
}
