//! Validating converters for `timestamp-*` and `local-timestamp-*` fields.

use super::{read, resolve, unexpected, write, Error};
use crate::codec::timestamp::{
    decode_instant_micros, decode_instant_millis, decode_local_timestamp_micros,
    decode_local_timestamp_millis, encode_instant_micros, encode_instant_millis,
    encode_local_timestamp_micros, encode_local_timestamp_millis,
};
use crate::record::GenericRecord;
use crate::schema::{FieldSchema, LogicalType};
use apache_avro::types::Value;
use apache_avro::Schema;
use chrono::{DateTime, NaiveDateTime, Utc};

const INSTANT: &str = "timestamp-millis or timestamp-micros";
const LOCAL_TIMESTAMP: &str = "local-timestamp-millis or local-timestamp-micros";

fn resolve_instant(schema: &Schema, field: &str) -> Result<FieldSchema, Error> {
    resolve(schema, field, INSTANT, |lt| {
        matches!(lt, LogicalType::TimestampMillis | LogicalType::TimestampMicros)
    })
}

fn resolve_local(schema: &Schema, field: &str) -> Result<FieldSchema, Error> {
    resolve(schema, field, LOCAL_TIMESTAMP, |lt| {
        matches!(
            lt,
            LogicalType::LocalTimestampMillis | LogicalType::LocalTimestampMicros
        )
    })
}

fn encode_instant(logical_type: LogicalType, instant: &DateTime<Utc>) -> Value {
    match logical_type {
        LogicalType::TimestampMicros => Value::TimestampMicros(encode_instant_micros(instant)),
        _ => Value::TimestampMillis(encode_instant_millis(instant)),
    }
}

fn encode_local(logical_type: LogicalType, datetime: &NaiveDateTime) -> Value {
    match logical_type {
        LogicalType::LocalTimestampMicros => {
            Value::LocalTimestampMicros(encode_local_timestamp_micros(datetime))
        }
        _ => Value::LocalTimestampMillis(encode_local_timestamp_millis(datetime)),
    }
}

/// Reads `field` as a UTC instant.
pub fn get_instant(record: &GenericRecord, field: &str) -> Result<Option<DateTime<Utc>>, Error> {
    let resolved = resolve_instant(record.schema(), field)?;
    let instant = match (resolved.logical_type, read(record, field)?) {
        (_, None) => return Ok(None),
        (LogicalType::TimestampMillis, Some(Value::TimestampMillis(millis) | Value::Long(millis))) => {
            decode_instant_millis(*millis)?
        }
        (LogicalType::TimestampMicros, Some(Value::TimestampMicros(micros) | Value::Long(micros))) => {
            decode_instant_micros(*micros)?
        }
        (_, Some(other)) => return Err(unexpected(field, "long", other)),
    };
    Ok(Some(instant))
}

/// Writes `instant` into `field` at the field's precision.
pub fn set_instant(
    record: &mut GenericRecord,
    field: &str,
    instant: Option<DateTime<Utc>>,
) -> Result<(), Error> {
    let resolved = resolve_instant(record.schema(), field)?;
    let value = instant.map(|i| encode_instant(resolved.logical_type, &i));
    write(record, &resolved, value)
}

/// Encodes `instant` at the precision of `field` of `schema`.
pub fn instant_to_avro(
    schema: &Schema,
    field: &str,
    instant: &DateTime<Utc>,
) -> Result<Value, Error> {
    let resolved = resolve_instant(schema, field)?;
    Ok(encode_instant(resolved.logical_type, instant))
}

/// Reads `field` as a zone-less date-time.
pub fn get_local_timestamp(
    record: &GenericRecord,
    field: &str,
) -> Result<Option<NaiveDateTime>, Error> {
    let resolved = resolve_local(record.schema(), field)?;
    let datetime = match (resolved.logical_type, read(record, field)?) {
        (_, None) => return Ok(None),
        (
            LogicalType::LocalTimestampMillis,
            Some(Value::LocalTimestampMillis(millis) | Value::Long(millis)),
        ) => decode_local_timestamp_millis(*millis)?,
        (
            LogicalType::LocalTimestampMicros,
            Some(Value::LocalTimestampMicros(micros) | Value::Long(micros)),
        ) => decode_local_timestamp_micros(*micros)?,
        (_, Some(other)) => return Err(unexpected(field, "long", other)),
    };
    Ok(Some(datetime))
}

/// Writes `datetime` into `field` at the field's precision.
pub fn set_local_timestamp(
    record: &mut GenericRecord,
    field: &str,
    datetime: Option<NaiveDateTime>,
) -> Result<(), Error> {
    let resolved = resolve_local(record.schema(), field)?;
    let value = datetime.map(|d| encode_local(resolved.logical_type, &d));
    write(record, &resolved, value)
}

/// Encodes `datetime` at the precision of `field` of `schema`.
pub fn local_timestamp_to_avro(
    schema: &Schema,
    field: &str,
    datetime: &NaiveDateTime,
) -> Result<Value, Error> {
    let resolved = resolve_local(schema, field)?;
    Ok(encode_local(resolved.logical_type, datetime))
}
