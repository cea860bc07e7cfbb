//! Non-validating logical-type codecs.
//!
//! Plain conversions between Avro's encoded primitives and chrono / bigdecimal
//! values. Nothing here looks at a schema: callers pick the function matching
//! the field and supply the decimal scale themselves. All functions are pure
//! and safe to call from any thread.
//!
//! See <https://avro.apache.org/docs/1.11.1/specification/#logical-types>.

pub mod date;
pub mod decimal;
pub mod time;
pub mod timestamp;

/// Errors that can occur while encoding or decoding a logical value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Encoded value lies outside the range chrono can represent for the kind.
    #[error("Encoded {kind} value {value} is out of range")]
    OutOfRange { kind: &'static str, value: i64 },
    /// Decimal rescale would drop digits and no rounding mode was given.
    #[error("Rescaling {value} to scale {scale} loses precision, a rounding mode is required")]
    PrecisionLoss { value: String, scale: i64 },
}
