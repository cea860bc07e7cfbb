//! Configuration structures for the avroflow application and its flows.
//!
//! The application configuration is read from a file and overridden by
//! `AVROFLOW__*` environment variables. Flows are described in their own
//! files, one flow per file.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Prefix of environment variables overriding the application configuration.
pub const ENV_PREFIX: &str = "AVROFLOW";

/// Top-level configuration for an individual flow.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct FlowConfig {
    /// Flow definition containing name and tasks.
    pub flow: Flow,
}

/// Flow definition with name and task list.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct Flow {
    /// Unique name for this flow.
    pub name: String,
    /// Optional labels for logging.
    pub labels: Option<Map<String, Value>>,
    /// Tasks in pipeline order. The first task is the source.
    pub tasks: Vec<TaskType>,
}

/// Available task types. Task configurations are embedded within each variant.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
#[allow(non_camel_case_types)]
pub enum TaskType {
    /// Record generation source.
    generate(avroflow_core::task::generate::config::Subscriber),
    /// Numeric field filter.
    filter(avroflow_core::task::filter::config::Processor),
    /// Field rewriting.
    map(avroflow_core::task::map::config::Processor),
    /// JSON and Avro conversion.
    convert(avroflow_core::task::convert::config::Processor),
    /// Log output.
    log(avroflow_core::task::log::config::Processor),
}

impl TaskType {
    /// Returns the task type name used in events and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::generate(_) => "generate",
            TaskType::filter(_) => "filter",
            TaskType::map(_) => "map",
            TaskType::convert(_) => "convert",
            TaskType::log(_) => "log",
        }
    }

    /// Returns the configured task name.
    pub fn name(&self) -> &str {
        match self {
            TaskType::generate(config) => &config.name,
            TaskType::filter(config) => &config.name,
            TaskType::map(config) => &config.name,
            TaskType::convert(config) => &config.name,
            TaskType::log(config) => &config.name,
        }
    }
}

/// Main application configuration.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Flow discovery options.
    pub flows: FlowOptions,
    /// Event channel buffer size for all flows (defaults to 10000 if not specified).
    pub event_buffer_size: Option<usize>,
}

impl AppConfig {
    /// Loads the configuration file at `path`, format taken from its extension,
    /// then applies `AVROFLOW__*` environment overrides
    /// (e.g. `AVROFLOW__FLOWS__DIR`).
    pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// Flow loading configuration.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct FlowOptions {
    /// Glob pattern for discovering flow configuration files.
    pub dir: Option<PathBuf>,
}
