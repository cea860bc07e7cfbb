//! Configuration for the filter processor.

use serde::{Deserialize, Serialize};

/// Keeps events whose numeric field compares true against a constant.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Processor {
    /// Task name identifier.
    pub name: String,
    /// Top-level field of the payload to compare. JSON numbers and numeric
    /// strings (Avro decimals render as strings) are compared exactly.
    pub field: String,
    /// Comparison operator, field on the left.
    #[serde(default)]
    pub op: Operator,
    /// Constant on the right of the comparison.
    pub value: serde_json::Number,
}

/// Comparison operators.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Operator {
    /// Returns `lhs <op> rhs`.
    pub fn apply<T: PartialOrd + ?Sized>(&self, lhs: &T, rhs: &T) -> bool {
        match self {
            Operator::Gt => lhs > rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Lt => lhs < rhs,
            Operator::Le => lhs <= rhs,
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }
}
