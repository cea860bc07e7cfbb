//! `decimal` logical type: a scaled, arbitrary-precision decimal.
//!
//! The bytes hold the unscaled integer as minimal two's-complement big-endian.
//! The scale lives in the schema, never in the bytes, so both directions take
//! it as an argument.

use super::Error;
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use tracing::debug;

/// Brings `value` to exactly `scale` fractional digits.
///
/// Raising the scale, or lowering it over trailing zeros, never loses digits
/// and always succeeds. Dropping non-zero digits needs a rounding mode and
/// fails with [`Error::PrecisionLoss`] without one.
pub fn rescale(
    value: &BigDecimal,
    scale: i64,
    rounding: Option<RoundingMode>,
) -> Result<BigDecimal, Error> {
    let (_, current) = value.as_bigint_and_exponent();
    if current == scale {
        return Ok(value.clone());
    }

    let truncated = value.with_scale(scale);
    if current < scale || truncated == *value {
        return Ok(truncated);
    }

    match rounding {
        Some(mode) => {
            let rounded = value.with_scale_round(scale, mode);
            debug!(%value, %rounded, scale, ?mode, "decimal rounded to schema scale");
            Ok(rounded)
        }
        None => Err(Error::PrecisionLoss {
            value: value.to_string(),
            scale,
        }),
    }
}

/// Encodes `value` at `scale` as two's-complement big-endian bytes.
pub fn encode_decimal(
    value: &BigDecimal,
    scale: i64,
    rounding: Option<RoundingMode>,
) -> Result<Vec<u8>, Error> {
    let (unscaled, _) = rescale(value, scale, rounding)?.into_bigint_and_exponent();
    Ok(unscaled.to_signed_bytes_be())
}

/// Decodes two's-complement big-endian bytes as an unscaled integer at `scale`.
///
/// An empty slice decodes to zero.
pub fn decode_decimal(bytes: &[u8], scale: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from_signed_bytes_be(bytes), scale)
}
