//! Validating converters for `decimal` fields.
//!
//! Scale and precision come from the field's schema. Values are rescaled with
//! [`codec::decimal::rescale`](crate::codec::decimal::rescale) and rejected when
//! the rescaled value has more digits than the declared precision.

use super::{read, resolve, unexpected, write, Error};
use crate::codec::decimal::{decode_decimal, encode_decimal, rescale};
use crate::record::GenericRecord;
use crate::schema::{self, FieldSchema, LogicalType};
use apache_avro::types::Value;
use apache_avro::{Decimal, Schema};
use bigdecimal::{BigDecimal, RoundingMode};

struct DecimalField {
    field: FieldSchema,
    precision: usize,
    scale: i64,
}

fn resolve_decimal(schema: &Schema, field: &str) -> Result<DecimalField, Error> {
    let resolved = resolve(schema, field, crate::DECIMAL, |lt| {
        matches!(lt, LogicalType::Decimal { .. })
    })?;
    match resolved.logical_type {
        LogicalType::Decimal { precision, scale } => Ok(DecimalField {
            field: resolved,
            precision,
            scale: scale as i64,
        }),
        _ => Err(schema::Error::InvalidLogicalType {
            field: field.to_string(),
            expected: crate::DECIMAL,
        }
        .into()),
    }
}

fn encode(
    decimal: &DecimalField,
    value: &BigDecimal,
    rounding: Option<RoundingMode>,
) -> Result<Value, Error> {
    let rescaled = rescale(value, decimal.scale, rounding)?;
    let digits = rescaled.digits();
    if digits > decimal.precision as u64 {
        return Err(Error::PrecisionExceeded {
            field: decimal.field.name.clone(),
            value: value.to_string(),
            digits,
            precision: decimal.precision,
        });
    }
    let bytes = encode_decimal(&rescaled, decimal.scale, None)?;
    Ok(Value::Decimal(Decimal::from(bytes)))
}

/// Reads `field` as a decimal at the field's scale.
pub fn get_decimal(record: &GenericRecord, field: &str) -> Result<Option<BigDecimal>, Error> {
    let decimal = resolve_decimal(record.schema(), field)?;
    let bytes = match read(record, field)? {
        None => return Ok(None),
        Some(Value::Decimal(stored)) => {
            Vec::<u8>::try_from(stored).map_err(|source| Error::DecimalBytes {
                field: field.to_string(),
                source,
            })?
        }
        Some(Value::Bytes(bytes) | Value::Fixed(_, bytes)) => bytes.clone(),
        Some(other) => return Err(unexpected(field, "bytes", other)),
    };
    Ok(Some(decode_decimal(&bytes, decimal.scale)))
}

/// Writes `value` into `field`, rescaled to the field's scale.
///
/// A lossy rescale needs `rounding`; see [`rescale`].
pub fn set_decimal(
    record: &mut GenericRecord,
    field: &str,
    value: Option<&BigDecimal>,
    rounding: Option<RoundingMode>,
) -> Result<(), Error> {
    let decimal = resolve_decimal(record.schema(), field)?;
    let value = value.map(|v| encode(&decimal, v, rounding)).transpose()?;
    write(record, &decimal.field, value)
}

/// Encodes `value` for `field` of `schema` without writing it anywhere.
pub fn decimal_to_avro(
    schema: &Schema,
    field: &str,
    value: &BigDecimal,
    rounding: Option<RoundingMode>,
) -> Result<Value, Error> {
    let decimal = resolve_decimal(schema, field)?;
    encode(&decimal, value, rounding)
}
