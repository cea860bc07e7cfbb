//! Resolves record fields to the logical type they carry.
//!
//! Optional fields are declared as unions (`["null", {"type": "int",
//! "logicalType": "date"}]`). The resolver scans the union alternatives and
//! reports the first one tagged with a recognised logical type, together with
//! the branch indexes needed to write a value back into the union.

use apache_avro::schema::{DecimalSchema, RecordField, RecordSchema};
use apache_avro::Schema;

/// Errors that can occur while resolving a field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The record schema has no field with the requested name.
    #[error("Field {field} not found in schema {schema}")]
    FieldNotFound { schema: String, field: String },
    /// The field carries no logical type the caller can handle.
    #[error("Field {field} has no {expected} logical type")]
    InvalidLogicalType { field: String, expected: &'static str },
    /// Field lookup was attempted on a schema that is not a record.
    #[error("Schema {}: not a record", _0)]
    NotARecord(String),
}

/// Logical types understood by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
    Decimal { precision: usize, scale: usize },
    Uuid,
}

impl LogicalType {
    /// Returns the logical type tag as written in a schema.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::Date => crate::DATE,
            LogicalType::TimeMillis => crate::TIME_MILLIS,
            LogicalType::TimeMicros => crate::TIME_MICROS,
            LogicalType::TimestampMillis => crate::TIMESTAMP_MILLIS,
            LogicalType::TimestampMicros => crate::TIMESTAMP_MICROS,
            LogicalType::LocalTimestampMillis => crate::LOCAL_TIMESTAMP_MILLIS,
            LogicalType::LocalTimestampMicros => crate::LOCAL_TIMESTAMP_MICROS,
            LogicalType::Decimal { .. } => crate::DECIMAL,
            LogicalType::Uuid => crate::UUID,
        }
    }

    /// Returns the logical type of `schema`, if it carries one.
    pub fn from_schema(schema: &Schema) -> Option<LogicalType> {
        let logical_type = match schema {
            Schema::Date => LogicalType::Date,
            Schema::TimeMillis => LogicalType::TimeMillis,
            Schema::TimeMicros => LogicalType::TimeMicros,
            Schema::TimestampMillis => LogicalType::TimestampMillis,
            Schema::TimestampMicros => LogicalType::TimestampMicros,
            Schema::LocalTimestampMillis => LogicalType::LocalTimestampMillis,
            Schema::LocalTimestampMicros => LogicalType::LocalTimestampMicros,
            Schema::Decimal(DecimalSchema {
                precision, scale, ..
            }) => LogicalType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            Schema::Uuid => LogicalType::Uuid,
            _ => return None,
        };
        Some(logical_type)
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalType::Decimal { precision, scale } => {
                write!(f, "{}({precision},{scale})", self.name())
            }
            other => f.write_str(other.name()),
        }
    }
}

/// A record field resolved to its logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Position of the field within the record.
    pub position: usize,
    /// Logical type carried by the field or by one of its union alternatives.
    pub logical_type: LogicalType,
    /// Schema of the alternative carrying the logical type.
    pub schema: Schema,
    /// Index of that alternative when the field is a union.
    pub union_branch: Option<usize>,
    /// Index of the `null` alternative when the field is a union containing one.
    pub null_branch: Option<usize>,
}

impl FieldSchema {
    /// Returns true if the field accepts a null value.
    pub fn is_nullable(&self) -> bool {
        self.null_branch.is_some()
    }
}

/// Returns the record view of `schema`.
pub fn record_schema(schema: &Schema) -> Result<&RecordSchema, Error> {
    match schema {
        Schema::Record(record) => Ok(record),
        other => Err(Error::NotARecord(schema_name(other))),
    }
}

/// Looks up a field by name, returning its position and declaration.
pub fn lookup_field<'a>(schema: &'a Schema, field: &str) -> Result<(usize, &'a RecordField), Error> {
    let record = record_schema(schema)?;
    record
        .fields
        .iter()
        .enumerate()
        .find(|(_, f)| f.name == field)
        .ok_or_else(|| Error::FieldNotFound {
            schema: record.name.fullname(None),
            field: field.to_string(),
        })
}

/// Resolves `field` of the record `schema` to its logical type.
///
/// A union field resolves to its first alternative carrying a logical type.
pub fn resolve_logical_field(schema: &Schema, field: &str) -> Result<FieldSchema, Error> {
    let (position, record_field) = lookup_field(schema, field)?;
    let invalid = || Error::InvalidLogicalType {
        field: field.to_string(),
        expected: "supported",
    };

    match &record_field.schema {
        Schema::Union(union) => {
            let variants = union.variants();
            let null_branch = variants.iter().position(|v| matches!(v, Schema::Null));
            let (branch, variant, logical_type) = variants
                .iter()
                .enumerate()
                .find_map(|(i, v)| LogicalType::from_schema(v).map(|lt| (i, v, lt)))
                .ok_or_else(invalid)?;
            Ok(FieldSchema {
                name: record_field.name.clone(),
                position,
                logical_type,
                schema: variant.clone(),
                union_branch: Some(branch),
                null_branch,
            })
        }
        other => {
            let logical_type = LogicalType::from_schema(other).ok_or_else(invalid)?;
            Ok(FieldSchema {
                name: record_field.name.clone(),
                position,
                logical_type,
                schema: other.clone(),
                union_branch: None,
                null_branch: None,
            })
        }
    }
}

fn schema_name(schema: &Schema) -> String {
    match schema.name() {
        Some(name) => name.fullname(None),
        None => format!("{:?}", apache_avro::schema::SchemaKind::from(schema)),
    }
}
