//! Configuration for the convert processor.

use avroflow_avro::RoundingMode;
use serde::{Deserialize, Serialize};

/// Converts event payloads between JSON and Avro.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize, Default)]
pub struct Processor {
    /// Task name identifier.
    pub name: String,
    /// Format the payload leaves the processor in.
    pub target_format: TargetFormat,
    /// Avro record schema used when converting JSON to Avro.
    pub schema: Option<String>,
    /// Rounding applied when a decimal has more fraction digits than its field's scale.
    pub rounding: Option<Rounding>,
}

/// Payload format produced by the convert processor.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Avro,
    Json,
}

/// Decimal rounding modes.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    Up,
    Down,
    Ceiling,
    Floor,
    HalfUp,
    HalfDown,
    HalfEven,
}

impl From<Rounding> for RoundingMode {
    fn from(rounding: Rounding) -> Self {
        match rounding {
            Rounding::Up => RoundingMode::Up,
            Rounding::Down => RoundingMode::Down,
            Rounding::Ceiling => RoundingMode::Ceiling,
            Rounding::Floor => RoundingMode::Floor,
            Rounding::HalfUp => RoundingMode::HalfUp,
            Rounding::HalfDown => RoundingMode::HalfDown,
            Rounding::HalfEven => RoundingMode::HalfEven,
        }
    }
}
