//! Log processor writing event payloads to the application log.

use crate::event::{Event, EventData, SenderExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, error, info, trace, warn};

use super::config::LogLevel;

/// Default subject prefix for log events.
const DEFAULT_MESSAGE_SUBJECT: &str = "log";

/// Errors that can occur during log processing.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
    /// Failed to send event through channel.
    #[error("Failed to send event message: {source}")]
    SendMessage {
        #[source]
        source: Box<tokio::sync::mpsc::error::SendError<Event>>,
    },
}

/// Handles individual log operations.
pub struct EventHandler {
    config: Arc<super::config::Processor>,
    task_context: Arc<crate::task::context::TaskContext>,
    /// Flow labels rendered once for structured output.
    labels: String,
    task_id: usize,
    tx: Sender<Event>,
    task_type: &'static str,
}

/// Reads a payload as JSON, rendering Avro logical fields as text.
///
/// Payloads that cannot be decoded are logged in their debug form.
fn payload(data: &EventData) -> Result<Value, String> {
    Value::try_from(data).map_err(|e| format!("{data:?} ({e})"))
}

impl EventHandler {
    /// Logs the event payload and passes the event on.
    async fn handle(&self, event: Event) -> Result<(), Error> {
        if Some(event.task_id) != self.task_id.checked_sub(1) {
            return Ok(());
        }

        match (self.config.structured, payload(&event.data)) {
            (true, Ok(json)) => {
                let flow = &self.task_context.flow_name;
                let labels = &self.labels;
                match self.config.level {
                    LogLevel::Trace => {
                        trace!(flow = %flow, labels = %labels, subject = %event.subject, data = ?json)
                    }
                    LogLevel::Debug => {
                        debug!(flow = %flow, labels = %labels, subject = %event.subject, data = ?json)
                    }
                    LogLevel::Info => {
                        info!(flow = %flow, labels = %labels, subject = %event.subject, data = ?json)
                    }
                    LogLevel::Warn => {
                        warn!(flow = %flow, labels = %labels, subject = %event.subject, data = ?json)
                    }
                    LogLevel::Error => {
                        error!(flow = %flow, labels = %labels, subject = %event.subject, data = ?json)
                    }
                }
            }
            (_, rendered) => {
                let log_message = match rendered {
                    Ok(json) => format!(
                        "\n{}",
                        serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
                    ),
                    Err(raw) => raw,
                };
                match self.config.level {
                    LogLevel::Trace => trace!("{}", log_message),
                    LogLevel::Debug => debug!("{}", log_message),
                    LogLevel::Info => info!("{}", log_message),
                    LogLevel::Warn => warn!("{}", log_message),
                    LogLevel::Error => error!("{}", log_message),
                }
            }
        }

        let e = Event {
            task_id: self.task_id,
            task_type: self.task_type,
            ..event
        };
        self.tx
            .send_with_logging(e)
            .await
            .map_err(|source| Error::SendMessage { source })?;
        Ok(())
    }
}

/// Log processor that outputs event data to logs.
#[derive(Debug)]
pub struct Processor {
    /// Log task configuration.
    config: Arc<super::config::Processor>,
    /// Channel sender for passing through events.
    tx: Sender<Event>,
    /// Channel receiver for incoming events to log.
    rx: Receiver<Event>,
    /// Current task identifier for event filtering.
    task_id: usize,
    /// Task execution context providing flow metadata.
    task_context: Arc<crate::task::context::TaskContext>,
    /// Task type for event categorization and logging.
    task_type: &'static str,
}

#[async_trait::async_trait]
impl crate::task::runner::Runner for Processor {
    type Error = Error;
    type EventHandler = EventHandler;

    /// Initializes the processor.
    async fn init(&self) -> Result<Self::EventHandler, Self::Error> {
        let event_handler = EventHandler {
            config: Arc::clone(&self.config),
            task_context: Arc::clone(&self.task_context),
            labels: self.task_context.labels(),
            task_id: self.task_id,
            tx: self.tx.clone(),
            task_type: self.task_type,
        };

        Ok(event_handler)
    }

    #[tracing::instrument(skip(self), name = DEFAULT_MESSAGE_SUBJECT, fields(flow = %self.task_context.flow_name, task = %self.config.name, task_id = self.task_id))]
    async fn run(mut self) -> Result<(), Error> {
        let event_handler = self.init().await?;

        while let Some(event) = self.rx.recv().await {
            if let Err(err) = event_handler.handle(event).await {
                error!("{}", err);
            }
        }
        Ok(())
    }
}

/// Builder for constructing Processor instances with validation.
#[derive(Debug, Default)]
pub struct ProcessorBuilder {
    /// Processor configuration (required for build).
    config: Option<Arc<super::config::Processor>>,
    /// Sender to the next stage (required for build).
    tx: Option<Sender<Event>>,
    /// Receiver from the previous stage (required for build).
    rx: Option<Receiver<Event>>,
    /// Current task identifier for event filtering.
    task_id: usize,
    /// Task execution context providing flow metadata.
    task_context: Option<Arc<crate::task::context::TaskContext>>,
    /// Task type for event categorization and logging.
    task_type: Option<&'static str>,
}

impl ProcessorBuilder {
    pub fn new() -> ProcessorBuilder {
        ProcessorBuilder {
            ..Default::default()
        }
    }

    pub fn config(mut self, config: Arc<super::config::Processor>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn receiver(mut self, receiver: Receiver<Event>) -> Self {
        self.rx = Some(receiver);
        self
    }

    pub fn sender(mut self, sender: Sender<Event>) -> Self {
        self.tx = Some(sender);
        self
    }

    pub fn task_id(mut self, task_id: usize) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn task_context(mut self, task_context: Arc<crate::task::context::TaskContext>) -> Self {
        self.task_context = Some(task_context);
        self
    }

    pub fn task_type(mut self, task_type: &'static str) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub async fn build(self) -> Result<Processor, Error> {
        Ok(Processor {
            config: self
                .config
                .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?,
            rx: self
                .rx
                .ok_or_else(|| Error::MissingRequiredAttribute("receiver".to_string()))?,
            tx: self
                .tx
                .ok_or_else(|| Error::MissingRequiredAttribute("sender".to_string()))?,
            task_id: self.task_id,
            task_context: self
                .task_context
                .ok_or_else(|| Error::MissingRequiredAttribute("task_context".to_string()))?,
            task_type: self
                .task_type
                .ok_or_else(|| Error::MissingRequiredAttribute("task_type".to_string()))?,
        })
    }
}
