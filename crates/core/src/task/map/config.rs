//! Configuration for the map processor.

use serde::{Deserialize, Serialize};

/// Rewrites fields of JSON object payloads.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize, Default)]
pub struct Processor {
    /// Task name identifier.
    pub name: String,
    /// String fields to upper-case in place.
    #[serde(default)]
    pub uppercase: Vec<String>,
    /// Optional concatenation of fields into a new field.
    pub concat: Option<Concat>,
}

/// Joins the string forms of `fields` into `target`.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Concat {
    pub fields: Vec<String>,
    pub target: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    " ".to_string()
}
