//! Validating logical-type converters.
//!
//! Every function here resolves the field's logical type from the record
//! schema before touching a value, and refuses to apply a codec to a field of
//! another kind. Optional fields read as `None` when they hold the null branch,
//! and writing `None` selects it.

use crate::codec;
use crate::record::{self, GenericRecord};
use crate::schema::{self, FieldSchema, LogicalType};
use apache_avro::schema::SchemaKind;
use apache_avro::types::Value;
use apache_avro::Schema;

pub mod date;
pub mod decimal;
pub mod time;
pub mod timestamp;

/// Errors that can occur in a validating conversion.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Field lookup failed or the field has the wrong logical type.
    #[error(transparent)]
    Schema(#[from] schema::Error),
    /// The encoded value could not be converted.
    #[error(transparent)]
    Codec(#[from] codec::Error),
    /// Reading or writing the record failed.
    #[error(transparent)]
    Record(#[from] record::Error),
    /// `None` was written to a field without a null alternative.
    #[error("Field {field} is not nullable")]
    NotNullable { field: String },
    /// The stored value has a type the field's logical type cannot hold.
    #[error("Field {field} holds a {found} value, expected {expected}")]
    UnexpectedValue {
        field: String,
        expected: &'static str,
        found: String,
    },
    /// The decimal has more digits than the field's declared precision.
    #[error("Decimal {value} has {digits} digits, field {field} allows {precision}")]
    PrecisionExceeded {
        field: String,
        value: String,
        digits: u64,
        precision: usize,
    },
    /// The stored decimal bytes could not be read.
    #[error("Decimal bytes of field {field} are invalid: {source}")]
    DecimalBytes {
        field: String,
        #[source]
        source: apache_avro::Error,
    },
}

/// Resolves `field` and checks that its logical type is one of `accepted`.
///
/// `expected` names the accepted kinds in the error.
pub(crate) fn resolve(
    schema: &Schema,
    field: &str,
    expected: &'static str,
    accepted: impl Fn(&LogicalType) -> bool,
) -> Result<FieldSchema, Error> {
    let invalid = || {
        Error::Schema(schema::Error::InvalidLogicalType {
            field: field.to_string(),
            expected,
        })
    };
    match schema::resolve_logical_field(schema, field) {
        Ok(resolved) if accepted(&resolved.logical_type) => Ok(resolved),
        Ok(_) | Err(schema::Error::InvalidLogicalType { .. }) => Err(invalid()),
        Err(other) => Err(other.into()),
    }
}

/// Strips the union wrapper from a stored value.
pub(crate) fn unwrap_union(value: &Value) -> &Value {
    match value {
        Value::Union(_, inner) => inner,
        other => other,
    }
}

/// Wraps an encoded value for storage in `field`.
///
/// `Value::Null` selects the null alternative; anything else the alternative
/// carrying the logical type.
pub(crate) fn wrap(field: &FieldSchema, value: Value) -> Result<Value, Error> {
    match (value, field.union_branch) {
        (Value::Null, _) => match field.null_branch {
            Some(branch) => Ok(Value::Union(branch as u32, Box::new(Value::Null))),
            None => Err(Error::NotNullable {
                field: field.name.clone(),
            }),
        },
        (value, Some(branch)) => Ok(Value::Union(branch as u32, Box::new(value))),
        (value, None) => Ok(value),
    }
}

/// Reads the stored value of a resolved field, unwrapped, `None` when null.
pub(crate) fn read<'a>(record: &'a GenericRecord, field: &str) -> Result<Option<&'a Value>, Error> {
    match unwrap_union(record.get(field)?) {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

/// Writes an encoded value, or null for `None`, into a resolved field.
pub(crate) fn write(
    record: &mut GenericRecord,
    field: &FieldSchema,
    value: Option<Value>,
) -> Result<(), Error> {
    let value = wrap(field, value.unwrap_or(Value::Null))?;
    record.put(&field.name, value)?;
    Ok(())
}

pub(crate) fn unexpected(field: &str, expected: &'static str, found: &Value) -> Error {
    Error::UnexpectedValue {
        field: field.to_string(),
        expected,
        found: format!("{:?}", SchemaKind::from(found)),
    }
}
