//! Validating converters for `time-millis` and `time-micros` fields.

use super::{read, resolve, unexpected, write, Error};
use crate::codec::time::{
    decode_time_micros, decode_time_millis, encode_time_micros, encode_time_millis,
};
use crate::record::GenericRecord;
use crate::schema::{FieldSchema, LogicalType};
use apache_avro::types::Value;
use apache_avro::Schema;
use chrono::NaiveTime;

const TIME: &str = "time-millis or time-micros";

fn resolve_time(schema: &Schema, field: &str) -> Result<FieldSchema, Error> {
    resolve(schema, field, TIME, |lt| {
        matches!(lt, LogicalType::TimeMillis | LogicalType::TimeMicros)
    })
}

fn encode(logical_type: LogicalType, time: NaiveTime) -> Value {
    match logical_type {
        LogicalType::TimeMicros => Value::TimeMicros(encode_time_micros(time)),
        _ => Value::TimeMillis(encode_time_millis(time)),
    }
}

/// Reads `field` as a time of day, whichever precision it is stored at.
pub fn get_time(record: &GenericRecord, field: &str) -> Result<Option<NaiveTime>, Error> {
    let resolved = resolve_time(record.schema(), field)?;
    let time = match (resolved.logical_type, read(record, field)?) {
        (_, None) => return Ok(None),
        (LogicalType::TimeMillis, Some(Value::TimeMillis(millis) | Value::Int(millis))) => {
            decode_time_millis(*millis)?
        }
        (LogicalType::TimeMillis, Some(other)) => return Err(unexpected(field, "int", other)),
        (_, Some(Value::TimeMicros(micros) | Value::Long(micros))) => decode_time_micros(*micros)?,
        (_, Some(other)) => return Err(unexpected(field, "long", other)),
    };
    Ok(Some(time))
}

/// Writes `time` into `field` at the field's precision, truncating.
pub fn set_time(
    record: &mut GenericRecord,
    field: &str,
    time: Option<NaiveTime>,
) -> Result<(), Error> {
    let resolved = resolve_time(record.schema(), field)?;
    let value = time.map(|t| encode(resolved.logical_type, t));
    write(record, &resolved, value)
}

/// Encodes `time` at the precision of `field` of `schema`.
pub fn time_to_avro(schema: &Schema, field: &str, time: NaiveTime) -> Result<Value, Error> {
    let resolved = resolve_time(schema, field)?;
    Ok(encode(resolved.logical_type, time))
}

/// Encodes `time` as milliseconds, `field` must be `time-millis`.
pub fn time_to_millis(schema: &Schema, field: &str, time: NaiveTime) -> Result<i32, Error> {
    resolve(schema, field, crate::TIME_MILLIS, |lt| *lt == LogicalType::TimeMillis)?;
    Ok(encode_time_millis(time))
}

/// Encodes `time` as microseconds, `field` must be `time-micros`.
pub fn time_to_micros(schema: &Schema, field: &str, time: NaiveTime) -> Result<i64, Error> {
    resolve(schema, field, crate::TIME_MICROS, |lt| *lt == LogicalType::TimeMicros)?;
    Ok(encode_time_micros(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    const SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "Birth",
        "fields": [
            {"name": "millis", "type": {"type": "int", "logicalType": "time-millis"}},
            {"name": "micros", "type": ["null", {"type": "long", "logicalType": "time-micros"}], "default": null},
            {"name": "date", "type": {"type": "int", "logicalType": "date"}}
        ]
    }"#;

    fn schema() -> Schema {
        Schema::parse_str(SCHEMA).unwrap()
    }

    fn birth_time() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 59, 0).unwrap()
    }

    #[test]
    fn test_dispatch_on_precision() {
        assert_eq!(
            time_to_avro(&schema(), "millis", birth_time()).unwrap(),
            Value::TimeMillis(3_540_000)
        );
        assert_eq!(
            time_to_avro(&schema(), "micros", birth_time()).unwrap(),
            Value::TimeMicros(3_540_000_000)
        );
    }

    #[test]
    fn test_exact_precision_helpers() {
        assert_eq!(time_to_millis(&schema(), "millis", birth_time()).unwrap(), 3_540_000);
        assert_eq!(
            time_to_micros(&schema(), "micros", birth_time()).unwrap(),
            3_540_000_000
        );
        assert!(matches!(
            time_to_millis(&schema(), "micros", birth_time()).unwrap_err(),
            Error::Schema(schema::Error::InvalidLogicalType { expected: "time-millis", .. })
        ));
        assert!(time_to_micros(&schema(), "millis", birth_time()).is_err());
    }

    #[test]
    fn test_set_and_get_both_precisions() {
        let mut record = GenericRecord::new(schema()).unwrap();
        let time = NaiveTime::from_hms_micro_opt(13, 37, 42, 123_456).unwrap();

        set_time(&mut record, "millis", Some(time)).unwrap();
        set_time(&mut record, "micros", Some(time)).unwrap();

        assert_eq!(
            get_time(&record, "millis").unwrap(),
            NaiveTime::from_hms_milli_opt(13, 37, 42, 123)
        );
        assert_eq!(get_time(&record, "micros").unwrap(), Some(time));
    }

    #[test]
    fn test_wrong_field_kind() {
        let mut record = GenericRecord::new(schema()).unwrap();
        assert!(set_time(&mut record, "date", Some(birth_time())).is_err());
        assert!(get_time(&record, "date").is_err());
    }

    #[test]
    fn test_reads_union_wrapped_value() {
        let mut record = GenericRecord::new(schema()).unwrap();
        record
            .put("micros", Value::Union(1, Box::new(Value::TimeMicros(1))))
            .unwrap();
        assert_eq!(
            get_time(&record, "micros").unwrap(),
            NaiveTime::from_hms_micro_opt(0, 0, 0, 1)
        );
    }
}
