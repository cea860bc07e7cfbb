//! Event system for passing records between pipeline stages.
//!
//! Provides the event structure, the JSON and Avro payload formats, subject
//! generation and logging on send.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc::{error::SendError, Sender};
use tracing::info;

/// Default log message format for event processing.
pub const DEFAULT_LOG_MESSAGE: &str = "Event processed";

/// Extension trait for stage senders with automatic event logging.
#[async_trait::async_trait]
pub trait SenderExt {
    /// Sends an event once the channel has room and logs its subject.
    async fn send_with_logging(&self, event: Event) -> Result<(), Box<SendError<Event>>>;
}

#[async_trait::async_trait]
impl SenderExt for Sender<Event> {
    async fn send_with_logging(&self, event: Event) -> Result<(), Box<SendError<Event>>> {
        let subject = event.subject.clone();
        self.send(event).await.map_err(Box::new)?;
        info!("{}: {}", DEFAULT_LOG_MESSAGE, subject);
        Ok(())
    }
}

/// Generates a subject formatted as `<base_subject>.<task_name>.<id>`.
///
/// The task name is lowercased and omitted when `None`.
pub fn generate_subject(task_name: Option<&str>, base_subject: &str, id: &str) -> String {
    match task_name {
        Some(name) => format!("{}.{}.{}", base_subject, name.to_lowercase(), id),
        None => format!("{base_subject}.{id}"),
    }
}

/// Errors that can occur during event processing operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Avro payload could not be rendered as JSON.
    #[error("Avro payload could not be read as JSON: {source}")]
    Render {
        #[source]
        source: crate::task::convert::processor::Error,
    },
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// A record travelling through a flow.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event payload.
    pub data: EventData,
    /// Subject identifier for event routing and logging.
    pub subject: String,
    /// Index of the task that emitted the event.
    pub task_id: usize,
    /// Optional unique identifier for the event.
    pub id: Option<String>,
    /// Event creation timestamp in microseconds since Unix epoch.
    pub timestamp: i64,
    /// Type of the task that emitted the event.
    pub task_type: &'static str,
}

/// Event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Apache Avro binary datum with its schema.
    Avro(AvroData),
    /// JSON format for flexible structured data.
    Json(serde_json::Value),
}

/// Avro data container with schema and serialized payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AvroData {
    /// Avro schema definition in JSON format.
    pub schema: String,
    /// Binary-encoded Avro datum according to the schema.
    pub raw_bytes: Vec<u8>,
}

/// Reads a payload as JSON. Avro logical fields come out as text, the same
/// way the convert task renders them.
impl TryFrom<&EventData> for Value {
    type Error = Error;

    fn try_from(event_data: &EventData) -> Result<Self, Self::Error> {
        match event_data {
            EventData::Avro(data) => crate::task::convert::processor::avro_to_json(data)
                .map_err(|source| Error::Render { source }),
            EventData::Json(data) => Ok(data.clone()),
        }
    }
}

/// Builder for constructing Event instances with validation.
#[derive(Default, Debug)]
pub struct EventBuilder {
    /// Event data payload (required for build).
    pub data: Option<EventData>,
    /// Event subject (required for build).
    pub subject: Option<String>,
    /// Emitting task index (required for build).
    pub task_id: Option<usize>,
    /// Optional unique event identifier.
    pub id: Option<String>,
    /// Event timestamp, set to the current time.
    pub timestamp: i64,
    /// Emitting task type (required for build).
    pub task_type: Option<&'static str>,
}

impl EventBuilder {
    pub fn new() -> Self {
        EventBuilder {
            timestamp: Utc::now().timestamp_micros(),
            ..Default::default()
        }
    }
    pub fn data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }
    pub fn subject(mut self, subject: String) -> Self {
        self.subject = Some(subject);
        self
    }
    pub fn task_id(mut self, task_id: usize) -> Self {
        self.task_id = Some(task_id);
        self
    }
    pub fn id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }
    pub fn task_type(mut self, task_type: &'static str) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn build(self) -> Result<Event, Error> {
        Ok(Event {
            data: self
                .data
                .ok_or_else(|| Error::MissingRequiredAttribute("data".to_string()))?,
            subject: self
                .subject
                .ok_or_else(|| Error::MissingRequiredAttribute("subject".to_string()))?,
            task_id: self
                .task_id
                .ok_or_else(|| Error::MissingRequiredAttribute("task_id".to_string()))?,
            id: self.id,
            timestamp: self.timestamp,
            task_type: self
                .task_type
                .ok_or_else(|| Error::MissingRequiredAttribute("task_type".to_string()))?,
        })
    }
}
