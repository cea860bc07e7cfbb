//! Map processor rewriting fields of JSON object payloads.
//!
//! Upper-cases string fields in place and optionally joins several fields
//! into a new one. Avro payloads are read as JSON with logical fields
//! rendered as text, and leave as JSON.

use crate::event::{Event, EventData, SenderExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::error;

/// Default subject prefix for map spans.
const DEFAULT_MESSAGE_SUBJECT: &str = "map";

/// Errors that can occur while mapping events.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
    #[error("Failed to send event message: {source}")]
    SendMessage {
        #[source]
        source: Box<tokio::sync::mpsc::error::SendError<Event>>,
    },
    #[error("Event payload could not be read as JSON: {source}")]
    EventData {
        #[source]
        source: crate::event::Error,
    },
    #[error("Event payload is not a JSON object: {}", _0)]
    NotAnObject(Value),
    #[error("Field {field} is missing from the event payload")]
    MissingField { field: String },
    #[error("Field {field} is not a string: {value}")]
    NotAString { field: String, value: Value },
}

/// Applies the configured mapping to single events.
pub struct EventHandler {
    config: Arc<super::config::Processor>,
    task_id: usize,
    tx: Sender<Event>,
    task_type: &'static str,
}

impl EventHandler {
    fn map(&self, data: Value) -> Result<Value, Error> {
        let mut object = match data {
            Value::Object(object) => object,
            other => return Err(Error::NotAnObject(other)),
        };

        for field in &self.config.uppercase {
            match object.get_mut(field) {
                Some(Value::String(s)) => *s = s.to_uppercase(),
                Some(Value::Null) => {}
                Some(value) => {
                    return Err(Error::NotAString {
                        field: field.clone(),
                        value: value.clone(),
                    })
                }
                None => {
                    return Err(Error::MissingField {
                        field: field.clone(),
                    })
                }
            }
        }

        if let Some(concat) = &self.config.concat {
            let parts = concat
                .fields
                .iter()
                .map(|field| text(&object, field))
                .collect::<Result<Vec<_>, _>>()?;
            object.insert(
                concat.target.clone(),
                Value::String(parts.join(&concat.separator)),
            );
        }

        Ok(Value::Object(object))
    }

    async fn handle(&self, event: Event) -> Result<(), Error> {
        if Some(event.task_id) != self.task_id.checked_sub(1) {
            return Ok(());
        }

        let data = Value::try_from(&event.data).map_err(|source| Error::EventData { source })?;
        let e = Event {
            data: EventData::Json(self.map(data)?),
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

/// Renders a field for concatenation; strings lose their quotes.
fn text(object: &Map<String, Value>, field: &str) -> Result<String, Error> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(value) => Ok(value.to_string()),
        None => Err(Error::MissingField {
            field: field.to_string(),
        }),
    }
}

/// Map processor.
#[derive(Debug)]
pub struct Processor {
    config: Arc<super::config::Processor>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    task_id: usize,
    task_context: Arc<crate::task::context::TaskContext>,
    task_type: &'static str,
}

#[async_trait::async_trait]
impl crate::task::runner::Runner for Processor {
    type Error = Error;
    type EventHandler = EventHandler;

    async fn init(&self) -> Result<EventHandler, Error> {
        Ok(EventHandler {
            config: Arc::clone(&self.config),
            task_id: self.task_id,
            tx: self.tx.clone(),
            task_type: self.task_type,
        })
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
    config: Option<Arc<super::config::Processor>>,
    tx: Option<Sender<Event>>,
    rx: Option<Receiver<Event>>,
    task_id: usize,
    task_context: Option<Arc<crate::task::context::TaskContext>>,
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
