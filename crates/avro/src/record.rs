//! By-name generic record over `apache_avro` values.
//!
//! `apache_avro` exposes a decoded record as a `Vec<(String, Value)>`. The
//! converters need to read and write single fields by name against a known
//! schema, which is what [`GenericRecord`] offers.

use crate::schema;
use apache_avro::{
    from_avro_datum, schema::ResolvedSchema, to_avro_datum, types::Value, Schema,
};
use serde_json::{json, Value as JsonValue};

/// Errors that can occur while working with a generic record.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Schema lookup failed.
    #[error(transparent)]
    Schema(#[from] schema::Error),
    /// The value does not match the schema of the field it was written to.
    #[error("Value for field {field} does not match its schema")]
    InvalidValue { field: String },
    /// The declared default of a field could not be resolved against its schema.
    #[error("Default value of field {field} is invalid: {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: apache_avro::Error,
    },
    /// Avro encoding or decoding failed.
    #[error("Avro operation failed: {source}")]
    Avro {
        #[source]
        source: apache_avro::Error,
    },
    /// A datum decoded with a record schema did not yield a record.
    #[error("Decoded datum is not a record")]
    NotARecordDatum,
}

/// A record schema together with one value per field.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Schema,
    values: Vec<Value>,
}

impl GenericRecord {
    /// Creates a record with every field at its declared default.
    ///
    /// Fields without a default start as `null`, wrapped in the null branch
    /// when the field is an optional union.
    pub fn new(schema: Schema) -> Result<Self, Error> {
        let record = schema::record_schema(&schema)?;
        let mut values = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let value = match &field.default {
                Some(default) => Value::from(default.clone())
                    .resolve_schemata(&field.schema, vec![&schema])
                    .map_err(|source| Error::InvalidDefault {
                        field: field.name.clone(),
                        source,
                    })?,
                None => null_value(&field.schema),
            };
            values.push(value);
        }
        Ok(GenericRecord { schema, values })
    }

    /// Returns the record schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the raw value of `field`, union wrapper included.
    pub fn get(&self, field: &str) -> Result<&Value, Error> {
        let (position, _) = schema::lookup_field(&self.schema, field)?;
        Ok(&self.values[position])
    }

    /// Replaces the value of `field`.
    ///
    /// A bare value written into a union field is wrapped in the first
    /// alternative it validates against. Nothing is written on error.
    pub fn put(&mut self, field: &str, value: Value) -> Result<(), Error> {
        let (position, record_field) = schema::lookup_field(&self.schema, field)?;
        let invalid = || Error::InvalidValue {
            field: field.to_string(),
        };

        let value = match (&record_field.schema, value) {
            (Schema::Union(union), value) if !matches!(value, Value::Union(..)) => {
                let branches = union.variants().len() as u32;
                (0..branches)
                    .map(|branch| Value::Union(branch, Box::new(value.clone())))
                    .find(|candidate| self.conforms(position, &record_field.schema, candidate))
                    .ok_or_else(invalid)?
            }
            (field_schema, value) => {
                if !self.conforms(position, field_schema, &value) {
                    return Err(invalid());
                }
                value
            }
        };

        self.values[position] = value;
        Ok(())
    }

    /// Checks `value` against the schema of the field at `position`.
    ///
    /// A field referring to named types declared by other fields is checked
    /// inside a copy of the whole record, where those names are known.
    fn conforms(&self, position: usize, field_schema: &Schema, value: &Value) -> bool {
        if ResolvedSchema::try_from(field_schema).is_ok() {
            return value.validate(field_schema);
        }
        match scoped_record(&self.schema, position) {
            Some((scoped, mut fields)) => {
                fields[position].1 = value.clone();
                Value::Record(fields).validate(&scoped)
            }
            None => false,
        }
    }

    /// Encodes the record as a binary Avro datum, without a container header.
    pub fn to_datum(&self) -> Result<Vec<u8>, Error> {
        to_avro_datum(&self.schema, self.to_value()).map_err(|source| Error::Avro { source })
    }

    /// Decodes a binary Avro datum written with `schema`.
    pub fn from_datum(schema: Schema, mut bytes: &[u8]) -> Result<Self, Error> {
        let value =
            from_avro_datum(&schema, &mut bytes, None).map_err(|source| Error::Avro { source })?;
        Self::from_value(schema, value)
    }

    /// Builds a record from a decoded `Value::Record` in schema field order.
    pub fn from_value(schema: Schema, value: Value) -> Result<Self, Error> {
        let Value::Record(fields) = value else {
            return Err(Error::NotARecordDatum);
        };
        let mut record = GenericRecord::new(schema)?;
        for (name, value) in fields {
            record.put(&name, value)?;
        }
        Ok(record)
    }

    /// Returns the record as an `apache_avro` record value.
    pub fn to_value(&self) -> Value {
        Value::Record(self.field_names().zip(self.values.iter().cloned()).collect())
    }

    /// Consumes the record and returns it as an `apache_avro` record value.
    pub fn into_value(self) -> Value {
        let names: Vec<String> = self.field_names().collect();
        Value::Record(names.into_iter().zip(self.values).collect())
    }

    fn field_names(&self) -> impl Iterator<Item = String> + '_ {
        let fields = match &self.schema {
            Schema::Record(record) => record.fields.as_slice(),
            _ => &[],
        };
        fields.iter().map(|f| f.name.clone())
    }
}

/// Copies a record schema with every field but `position` made nullable,
/// returning it with a record value holding null in those fields.
fn scoped_record(schema: &Schema, position: usize) -> Option<(Schema, Vec<(String, Value)>)> {
    let mut json = serde_json::to_value(schema).ok()?;
    let fields = json.get_mut("fields")?.as_array_mut()?;

    let mut values = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter_mut().enumerate() {
        let field = field.as_object_mut()?;
        let name = field.get("name")?.as_str()?.to_string();
        if index == position {
            values.push((name, Value::Null));
            continue;
        }

        field.remove("default");
        let branch = match field.get_mut("type")? {
            JsonValue::Array(variants) => match variants.iter().position(|v| *v == "null") {
                Some(branch) => branch,
                None => {
                    variants.insert(0, json!("null"));
                    0
                }
            },
            other if *other == "null" => {
                values.push((name, Value::Null));
                continue;
            }
            other => {
                let inner = other.take();
                *other = json!(["null", inner]);
                0
            }
        };
        values.push((name, Value::Union(branch as u32, Box::new(Value::Null))));
    }

    let scoped = Schema::parse(&json).ok()?;
    Some((scoped, values))
}

fn null_value(schema: &Schema) -> Value {
    if let Schema::Union(union) = schema {
        if let Some(branch) = union
            .variants()
            .iter()
            .position(|v| matches!(v, Schema::Null))
        {
            return Value::Union(branch as u32, Box::new(Value::Null));
        }
    }
    Value::Null
}

/// Builder for records whose fields are set one after another.
#[derive(Debug)]
pub struct GenericRecordBuilder {
    schema: Schema,
    fields: Vec<(String, Value)>,
}

impl GenericRecordBuilder {
    pub fn new(schema: Schema) -> Self {
        GenericRecordBuilder {
            schema,
            fields: Vec::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.push((field.to_string(), value.into()));
        self
    }

    pub fn build(self) -> Result<GenericRecord, Error> {
        let mut record = GenericRecord::new(self.schema)?;
        for (field, value) in self.fields {
            record.put(&field, value)?;
        }
        Ok(record)
    }
}
