//! Avro logical-type support for avroflow pipelines.
//!
//! Avro stores dates, times, timestamps and decimals as plain `int`, `long`
//! and `bytes` values tagged with a logical type in the schema. This crate
//! converts between those encoded forms and chrono / bigdecimal values in two
//! flavours:
//!
//! - [`codec`]: non-validating conversions that never look at a schema.
//! - [`convert`]: schema-aware conversions that resolve the field's logical
//!   type first and refuse to apply the wrong codec to a field.
//!
//! [`schema`] resolves a record field to its logical type (unwrapping
//! optional unions) and [`record`] provides a by-name generic record on top of
//! `apache_avro` values.

pub mod codec;
pub mod convert;
pub mod record;
pub mod schema;

pub use bigdecimal::{BigDecimal, RoundingMode};

/// Logical type tag for arbitrary-precision decimals.
pub const DECIMAL: &str = "decimal";
/// Logical type tag for RFC 4122 UUID strings.
pub const UUID: &str = "uuid";
/// Logical type tag for days since the unix epoch.
pub const DATE: &str = "date";
/// Logical type tag for milliseconds after midnight.
pub const TIME_MILLIS: &str = "time-millis";
/// Logical type tag for microseconds after midnight.
pub const TIME_MICROS: &str = "time-micros";
/// Logical type tag for UTC milliseconds since the unix epoch.
pub const TIMESTAMP_MILLIS: &str = "timestamp-millis";
/// Logical type tag for UTC microseconds since the unix epoch.
pub const TIMESTAMP_MICROS: &str = "timestamp-micros";
/// Logical type tag for zone-less milliseconds since the unix epoch.
pub const LOCAL_TIMESTAMP_MILLIS: &str = "local-timestamp-millis";
/// Logical type tag for zone-less microseconds since the unix epoch.
pub const LOCAL_TIMESTAMP_MICROS: &str = "local-timestamp-micros";
