//! Log processor configuration.

use serde::{Deserialize, Serialize};

/// Log processor that outputs event data to logs.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize, Default)]
pub struct Processor {
    /// Task name identifier.
    pub name: String,
    /// Log level for output.
    #[serde(default)]
    pub level: LogLevel,
    /// Log the payload as a structured `data` field instead of pretty-printed text.
    #[serde(default)]
    pub structured: bool,
}

/// Log level options.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}
