//! Flow identity handed to every task of a flow.
//!
//! Tasks record the flow name on their tracing spans. The log task also
//! attaches the flow labels to structured output.

use serde_json::{Map, Value};

/// Errors raised while building a task context.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Missing required builder attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// Name and labels of the flow a task belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskContext {
    pub flow_name: String,
    /// Free-form labels from the flow file, empty when none are set.
    pub flow_labels: Map<String, Value>,
}

impl TaskContext {
    /// Renders the labels as comma separated `key=value` pairs.
    ///
    /// String labels are written without quotes.
    pub fn labels(&self) -> String {
        self.flow_labels
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}={s}"),
                other => format!("{key}={other}"),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Default)]
pub struct TaskContextBuilder {
    flow_name: Option<String>,
    flow_labels: Option<Map<String, Value>>,
}

impl TaskContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow_name(mut self, name: String) -> Self {
        self.flow_name = Some(name);
        self
    }

    pub fn flow_labels(mut self, labels: Option<Map<String, Value>>) -> Self {
        self.flow_labels = labels;
        self
    }

    pub fn build(self) -> Result<TaskContext, Error> {
        Ok(TaskContext {
            flow_name: self
                .flow_name
                .ok_or_else(|| Error::MissingRequiredAttribute("flow_name".to_string()))?,
            flow_labels: self.flow_labels.unwrap_or_default(),
        })
    }
}
