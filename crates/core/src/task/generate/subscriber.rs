//! Generate source emitting configured JSON records into the flow.

use crate::event::{generate_subject, Event, EventBuilder, EventData, SenderExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::{sync::mpsc::Sender, time};
use tracing::error;

/// Default subject prefix for generated events.
const DEFAULT_MESSAGE_SUBJECT: &str = "generate";

/// Errors that can occur during event generation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Sending event to channel failed with error: {source}")]
    SendMessage {
        #[source]
        source: Box<tokio::sync::mpsc::error::SendError<Event>>,
    },
    #[error("Event builder failed with error: {source}")]
    EventBuilder {
        #[source]
        source: crate::event::Error,
    },
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// Emits one round of records.
pub struct EventHandler {
    config: Arc<super::config::Subscriber>,
    tx: Sender<Event>,
    task_id: usize,
    task_type: &'static str,
}

impl EventHandler {
    /// Sends every record of round `round`, waiting for room downstream.
    async fn emit(&self, round: u64) -> Result<(), Error> {
        let null = [Value::Null];
        let records = if self.config.records.is_empty() {
            &null[..]
        } else {
            &self.config.records[..]
        };

        for (index, record) in records.iter().enumerate() {
            let id = format!("{round}.{index}");
            let subject = generate_subject(Some(&self.config.name), DEFAULT_MESSAGE_SUBJECT, &id);
            let e = EventBuilder::new()
                .data(EventData::Json(record.clone()))
                .subject(subject)
                .id(id)
                .task_id(self.task_id)
                .task_type(self.task_type)
                .build()
                .map_err(|source| Error::EventBuilder { source })?;

            self.tx
                .send_with_logging(e)
                .await
                .map_err(|source| Error::SendMessage { source })?;
        }
        Ok(())
    }
}

/// Source task emitting the configured records.
///
/// Dropping the subscriber at the end of `run` closes the flow's first link,
/// which in turn ends every downstream task.
#[derive(Debug)]
pub struct Subscriber {
    config: Arc<super::config::Subscriber>,
    tx: Sender<Event>,
    task_id: usize,
    task_context: Arc<crate::task::context::TaskContext>,
    task_type: &'static str,
}

#[async_trait::async_trait]
impl crate::task::runner::Runner for Subscriber {
    type Error = Error;
    type EventHandler = EventHandler;

    async fn init(&self) -> Result<EventHandler, Error> {
        Ok(EventHandler {
            config: Arc::clone(&self.config),
            tx: self.tx.clone(),
            task_id: self.task_id,
            task_type: self.task_type,
        })
    }

    #[tracing::instrument(skip(self), name = DEFAULT_MESSAGE_SUBJECT, fields(flow = %self.task_context.flow_name, task = %self.config.name, task_id = self.task_id))]
    async fn run(self) -> Result<(), Error> {
        let event_handler = self.init().await?;
        let rounds = self.config.rounds();
        let mut ticker = self.config.interval.map(time::interval);

        let mut round = 0;
        while rounds.map_or(true, |rounds| round < rounds) {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }
            if let Err(e) = event_handler.emit(round).await {
                error!("{}", e);
                return Err(e);
            }
            round += 1;
        }
        Ok(())
    }
}

/// Builder for constructing Subscriber instances with validation.
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: Option<Arc<super::config::Subscriber>>,
    tx: Option<Sender<Event>>,
    task_id: usize,
    task_context: Option<Arc<crate::task::context::TaskContext>>,
    task_type: Option<&'static str>,
}

impl SubscriberBuilder {
    pub fn new() -> SubscriberBuilder {
        SubscriberBuilder {
            ..Default::default()
        }
    }

    pub fn config(mut self, config: Arc<super::config::Subscriber>) -> Self {
        self.config = Some(config);
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

    pub async fn build(self) -> Result<Subscriber, Error> {
        Ok(Subscriber {
            config: self
                .config
                .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::runner::Runner;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn create_mock_task_context() -> Arc<crate::task::context::TaskContext> {
        Arc::new(
            crate::task::context::TaskContextBuilder::new()
                .flow_name("test-flow".to_string())
                .build()
                .unwrap(),
        )
    }

    async fn build(config: super::super::config::Subscriber, tx: Sender<Event>) -> Subscriber {
        SubscriberBuilder::new()
            .config(Arc::new(config))
            .sender(tx)
            .task_id(0)
            .task_type("generate")
            .task_context(create_mock_task_context())
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_subscriber_builder_missing_config() {
        let (tx, _rx) = mpsc::channel(10);
        let result = SubscriberBuilder::new()
            .sender(tx)
            .task_type("generate")
            .task_context(create_mock_task_context())
            .build()
            .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required attribute: config"));
    }

    #[tokio::test]
    async fn test_emits_records_in_order() {
        let (tx, mut rx) = mpsc::channel(10);
        let config = super::super::config::Subscriber {
            name: "Users".to_string(),
            records: vec![json!({"id": 1}), json!({"id": -1})],
            count: Some(2),
            ..Default::default()
        };

        build(config, tx).await.run().await.unwrap();

        let mut subjects = Vec::new();
        let mut payloads = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.task_id, 0);
            assert_eq!(event.task_type, "generate");
            subjects.push(event.subject);
            payloads.push(event.data);
        }
        assert_eq!(
            subjects,
            vec![
                "generate.users.0.0",
                "generate.users.0.1",
                "generate.users.1.0",
                "generate.users.1.1"
            ]
        );
        assert_eq!(payloads[1], EventData::Json(json!({"id": -1})));
    }

    #[tokio::test]
    async fn test_empty_records_emit_null() {
        let (tx, mut rx) = mpsc::channel(10);
        let config = super::super::config::Subscriber {
            name: "tick".to_string(),
            interval: Some(Duration::from_millis(1)),
            count: Some(3),
            ..Default::default()
        };

        build(config, tx).await.run().await.unwrap();

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().data, EventData::Json(Value::Null));
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_count_beyond_channel_capacity_loses_nothing() {
        let (tx, mut rx) = mpsc::channel(2);
        let config = super::super::config::Subscriber {
            name: "burst".to_string(),
            records: vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})],
            count: Some(50),
            ..Default::default()
        };

        let source = tokio::spawn(build(config, tx).await.run());
        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event.id.unwrap());
        }
        source.await.unwrap().unwrap();

        assert_eq!(received.len(), 150);
        assert_eq!(received[0], "0.0");
        assert_eq!(received[149], "49.2");
    }

    #[tokio::test]
    async fn test_send_without_receivers_fails() {
        let (tx, rx) = mpsc::channel(10);
        drop(rx);
        let config = super::super::config::Subscriber {
            name: "orphan".to_string(),
            ..Default::default()
        };

        let result = build(config, tx).await.run().await;
        assert!(matches!(result, Err(Error::SendMessage { .. })));
    }
}
