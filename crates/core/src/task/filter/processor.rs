//! Filter processor dropping events that fail a numeric comparison.

use crate::event::{Event, SenderExt};
use bigdecimal::{BigDecimal, ParseBigDecimalError};
use serde_json::Value;
use std::{str::FromStr, sync::Arc};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, error};

/// Default subject prefix for filter spans.
const DEFAULT_MESSAGE_SUBJECT: &str = "filter";

/// Errors that can occur during filtering.
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
    #[error("Filter value {value} is not a decimal number: {source}")]
    InvalidValue {
        value: serde_json::Number,
        #[source]
        source: ParseBigDecimalError,
    },
}

/// Reads a JSON number or numeric string without going through `f64`.
fn operand(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Evaluates the configured comparison on single events.
pub struct EventHandler {
    config: Arc<super::config::Processor>,
    threshold: BigDecimal,
    task_id: usize,
    tx: Sender<Event>,
    task_type: &'static str,
}

impl EventHandler {
    /// Returns true if the event passes the filter.
    fn matches(&self, data: &Value) -> bool {
        match data.get(&self.config.field).and_then(operand) {
            Some(lhs) => self.config.op.apply(&lhs, &self.threshold),
            None => false,
        }
    }

    async fn handle(&self, event: Event) -> Result<(), Error> {
        if Some(event.task_id) != self.task_id.checked_sub(1) {
            return Ok(());
        }

        let data = Value::try_from(&event.data).map_err(|source| Error::EventData { source })?;
        if !self.matches(&data) {
            debug!(
                "Event {} dropped: {} {} {} is false",
                event.subject,
                self.config.field,
                self.config.op.as_str(),
                self.config.value
            );
            return Ok(());
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

/// Filter processor.
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
        let threshold = BigDecimal::from_str(&self.config.value.to_string()).map_err(|source| {
            Error::InvalidValue {
                value: self.config.value.clone(),
                source,
            }
        })?;

        Ok(EventHandler {
            config: Arc::clone(&self.config),
            threshold,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AvroData, EventBuilder, EventData};
    use crate::task::filter::config::Operator;
    use crate::task::runner::Runner;
    use serde_json::json;
    use tokio::sync::mpsc;

    const PAYMENT_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "Payment",
        "fields": [
            {"name": "amount", "type": {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}}
        ]
    }"#;

    fn create_mock_task_context() -> Arc<crate::task::context::TaskContext> {
        Arc::new(
            crate::task::context::TaskContextBuilder::new()
                .flow_name("test-flow".to_string())
                .build()
                .unwrap(),
        )
    }

    fn config(field: &str, op: Operator, value: &str) -> crate::task::filter::config::Processor {
        crate::task::filter::config::Processor {
            name: "ids".to_string(),
            field: field.to_string(),
            op,
            value: serde_json::from_str(value).unwrap(),
        }
    }

    fn handler(op: Operator, tx: Sender<Event>) -> EventHandler {
        EventHandler {
            config: Arc::new(config("id", op, "0")),
            threshold: BigDecimal::from(0),
            task_id: 1,
            tx,
            task_type: "filter",
        }
    }

    fn event(data: serde_json::Value, task_id: usize) -> Event {
        EventBuilder::new()
            .data(EventData::Json(data))
            .subject("users".to_string())
            .task_id(task_id)
            .task_type("generate")
            .build()
            .unwrap()
    }

    fn payment(unscaled: &[u8]) -> Event {
        let schema = apache_avro::Schema::parse_str(PAYMENT_SCHEMA).unwrap();
        let record = apache_avro::types::Value::Record(vec![(
            "amount".to_string(),
            apache_avro::types::Value::Decimal(apache_avro::Decimal::from(unscaled.to_vec())),
        )]);
        EventBuilder::new()
            .data(EventData::Avro(AvroData {
                schema: PAYMENT_SCHEMA.to_string(),
                raw_bytes: apache_avro::to_avro_datum(&schema, record).unwrap(),
            }))
            .subject("payments".to_string())
            .task_id(0)
            .task_type("convert")
            .build()
            .unwrap()
    }

    async fn processor(
        config: crate::task::filter::config::Processor,
        rx: Receiver<Event>,
        tx: Sender<Event>,
    ) -> Processor {
        ProcessorBuilder::new()
            .config(Arc::new(config))
            .receiver(rx)
            .sender(tx)
            .task_id(1)
            .task_type("filter")
            .task_context(create_mock_task_context())
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_processor_builder_missing_receiver() {
        let (tx, _rx) = mpsc::channel(10);
        let result = ProcessorBuilder::new()
            .config(Arc::new(config("id", Operator::Gt, "0")))
            .sender(tx)
            .task_context(create_mock_task_context())
            .task_type("filter")
            .build()
            .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required attribute: receiver"));
    }

    #[tokio::test]
    async fn test_greater_than_zero() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = handler(Operator::Gt, tx);

        for id in [1, -1, 0, 7] {
            handler.handle(event(json!({"id": id}), 0)).await.unwrap();
        }

        let kept: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.task_id, e.task_type, e.data))
            .collect();
        assert_eq!(
            kept,
            vec![
                (1, "filter", EventData::Json(json!({"id": 1}))),
                (1, "filter", EventData::Json(json!({"id": 7}))),
            ]
        );
    }

    #[tokio::test]
    async fn test_greater_or_equal_keeps_zero() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = handler(Operator::Ge, tx);

        handler.handle(event(json!({"id": 0}), 0)).await.unwrap();
        handler.handle(event(json!({"id": -3}), 0)).await.unwrap();

        assert_eq!(rx.try_recv().unwrap().data, EventData::Json(json!({"id": 0})));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_or_non_numeric_field_is_dropped() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = handler(Operator::Ne, tx);

        handler.handle(event(json!({"name": "x"}), 0)).await.unwrap();
        handler.handle(event(json!({"id": "one"}), 0)).await.unwrap();
        handler.handle(event(json!({"id": true}), 0)).await.unwrap();
        handler.handle(event(json!(null), 0)).await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_numeric_string_field_is_compared() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = handler(Operator::Gt, tx);

        handler.handle(event(json!({"id": "12.50"}), 0)).await.unwrap();
        handler.handle(event(json!({"id": "-0.01"}), 0)).await.unwrap();

        assert_eq!(rx.try_recv().unwrap().data, EventData::Json(json!({"id": "12.50"})));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_large_integers_compare_exactly() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = EventHandler {
            threshold: BigDecimal::from(9_007_199_254_740_992u64),
            ..handler(Operator::Gt, tx)
        };

        handler
            .handle(event(json!({"id": 9_007_199_254_740_993u64}), 0))
            .await
            .unwrap();
        handler
            .handle(event(json!({"id": 9_007_199_254_740_992u64}), 0))
            .await
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap().data,
            EventData::Json(json!({"id": 9_007_199_254_740_993u64}))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ignores_events_from_other_tasks() {
        let (tx, mut rx) = mpsc::channel(10);
        let handler = handler(Operator::Gt, tx);

        handler.handle(event(json!({"id": 5}), 3)).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_avro_decimal_field_is_compared() {
        let (tx, rx) = mpsc::channel(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let processor = processor(config("amount", Operator::Gt, "123.44"), rx, out_tx).await;

        // 12345 and 12344 unscaled, i.e. 123.45 and 123.44.
        tx.send(payment(&[0x30, 0x39])).await.unwrap();
        tx.send(payment(&[0x30, 0x38])).await.unwrap();
        drop(tx);
        processor.run().await.unwrap();

        let kept = out_rx.try_recv().unwrap();
        assert_eq!(kept.task_type, "filter");
        assert_eq!(Value::try_from(&kept.data).unwrap(), json!({"amount": "123.45"}));
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let (tx, rx) = mpsc::channel::<Event>(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let processor = processor(config("id", Operator::Gt, "0"), rx, out_tx).await;

        tx.send(event(json!({"id": 2}), 0)).await.unwrap();
        drop(tx);
        processor.run().await.unwrap();

        assert_eq!(out_rx.recv().await.unwrap().data, EventData::Json(json!({"id": 2})));
        assert!(out_rx.recv().await.is_none());
    }
}
