//! Validating converters for `date` fields.

use super::{read, resolve, unexpected, write, Error};
use crate::codec::date::{decode_date, encode_date};
use crate::record::GenericRecord;
use crate::schema::{FieldSchema, LogicalType};
use apache_avro::types::Value;
use apache_avro::Schema;
use chrono::NaiveDate;

fn resolve_date(schema: &Schema, field: &str) -> Result<FieldSchema, Error> {
    resolve(schema, field, crate::DATE, |lt| *lt == LogicalType::Date)
}

/// Reads `field` as a calendar date.
pub fn get_date(record: &GenericRecord, field: &str) -> Result<Option<NaiveDate>, Error> {
    resolve_date(record.schema(), field)?;
    match read(record, field)? {
        None => Ok(None),
        Some(Value::Date(days) | Value::Int(days)) => Ok(Some(decode_date(*days)?)),
        Some(other) => Err(unexpected(field, "int", other)),
    }
}

/// Writes `date` into `field`, `None` selecting the null branch.
pub fn set_date(
    record: &mut GenericRecord,
    field: &str,
    date: Option<NaiveDate>,
) -> Result<(), Error> {
    let resolved = resolve_date(record.schema(), field)?;
    write(record, &resolved, date.map(|d| Value::Date(encode_date(d))))
}

/// Encodes `date` for `field` of `schema` without writing it anywhere.
pub fn date_to_avro(schema: &Schema, field: &str, date: NaiveDate) -> Result<Value, Error> {
    resolve_date(schema, field)?;
    Ok(Value::Date(encode_date(date)))
}
