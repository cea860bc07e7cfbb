//! Convert processor moving payloads between JSON and Avro.
//!
//! JSON objects are written into a generic record of the configured schema.
//! Fields carrying a logical type are parsed from their textual form (ISO
//! dates, times and local date-times, RFC 3339 instants, decimal strings) or
//! taken as their encoded integer, and stored through the validating
//! converters. Other fields are resolved against their schema as plain JSON.
//! Going back, logical fields are rendered as text again.

use crate::event::{AvroData, Event, EventData, SenderExt};
use apache_avro::{types::Value, Schema};
use avroflow_avro::{
    codec,
    convert::{self, date, decimal, time, timestamp},
    record::{self, GenericRecord},
    schema::{self, LogicalType},
    BigDecimal, RoundingMode,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::error;

use super::config::TargetFormat;

/// Default subject prefix for convert spans.
const DEFAULT_MESSAGE_SUBJECT: &str = "convert";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Errors that can occur while converting events.
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
    #[error("Converting to avro requires a schema")]
    MissingSchema,
    #[error("Avro schema is invalid: {source}")]
    InvalidSchema {
        #[source]
        source: apache_avro::Error,
    },
    #[error(transparent)]
    Schema(#[from] schema::Error),
    #[error(transparent)]
    Record(#[from] record::Error),
    #[error(transparent)]
    Convert(#[from] convert::Error),
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error("Event payload is not a JSON object: {}", _0)]
    NotAnObject(JsonValue),
    #[error("Field {field} value {value} is not a valid {expected}")]
    InvalidText {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("Field {field} value could not be resolved against its schema: {source}")]
    Resolve {
        field: String,
        #[source]
        source: apache_avro::Error,
    },
    #[error("Field {field} could not be rendered as JSON: {source}")]
    Json {
        field: String,
        #[source]
        source: apache_avro::Error,
    },
}

/// Converts single events to the configured format.
pub struct EventHandler {
    config: Arc<super::config::Processor>,
    schema: Option<Schema>,
    task_id: usize,
    tx: Sender<Event>,
    task_type: &'static str,
}

impl EventHandler {
    fn rounding(&self) -> Option<RoundingMode> {
        self.config.rounding.map(RoundingMode::from)
    }

    /// Encodes a JSON object as an Avro datum of the configured schema.
    fn to_avro(&self, data: JsonValue) -> Result<EventData, Error> {
        let (schema, raw_schema) = match (&self.schema, &self.config.schema) {
            (Some(schema), Some(raw_schema)) => (schema, raw_schema),
            _ => return Err(Error::MissingSchema),
        };
        let object = match data {
            JsonValue::Object(object) => object,
            other => return Err(Error::NotAnObject(other)),
        };

        let record = json_to_record(schema, &object, self.rounding())?;
        Ok(EventData::Avro(AvroData {
            schema: raw_schema.clone(),
            raw_bytes: record.to_datum()?,
        }))
    }

    async fn handle(&self, event: Event) -> Result<(), Error> {
        if Some(event.task_id) != self.task_id.checked_sub(1) {
            return Ok(());
        }

        let data = match (self.config.target_format, event.data) {
            (TargetFormat::Avro, EventData::Json(json)) => self.to_avro(json)?,
            (TargetFormat::Json, EventData::Avro(avro)) => {
                EventData::Json(avro_to_json(&avro)?)
            }
            (_, data) => data,
        };

        let e = Event {
            data,
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

/// Builds a record of `schema` from a JSON object.
///
/// Absent keys keep the field default, or null when there is none.
pub fn json_to_record(
    schema: &Schema,
    object: &Map<String, JsonValue>,
    rounding: Option<RoundingMode>,
) -> Result<GenericRecord, Error> {
    let mut record = GenericRecord::new(schema.clone())?;
    for field in &schema::record_schema(schema)?.fields {
        let value = match object.get(&field.name) {
            Some(value) => value,
            None if field.default.is_some() => continue,
            None => &JsonValue::Null,
        };

        match schema::resolve_logical_field(schema, &field.name) {
            Ok(resolved) if resolved.logical_type != LogicalType::Uuid => {
                put_logical(&mut record, &field.name, resolved.logical_type, value, rounding)?
            }
            Ok(_) | Err(schema::Error::InvalidLogicalType { .. }) => {
                let value = Value::from(value.clone())
                    .resolve_schemata(&field.schema, vec![schema])
                    .map_err(|source| Error::Resolve {
                        field: field.name.clone(),
                        source,
                    })?;
                record.put(&field.name, value)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(record)
}

fn put_logical(
    record: &mut GenericRecord,
    field: &str,
    logical_type: LogicalType,
    value: &JsonValue,
    rounding: Option<RoundingMode>,
) -> Result<(), Error> {
    let invalid = |expected: &'static str| Error::InvalidText {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    };

    if value.is_null() {
        // Every setter writes the null branch for None.
        return match logical_type {
            LogicalType::Date => Ok(date::set_date(record, field, None)?),
            LogicalType::TimeMillis | LogicalType::TimeMicros => {
                Ok(time::set_time(record, field, None)?)
            }
            LogicalType::TimestampMillis | LogicalType::TimestampMicros => {
                Ok(timestamp::set_instant(record, field, None)?)
            }
            LogicalType::LocalTimestampMillis | LogicalType::LocalTimestampMicros => {
                Ok(timestamp::set_local_timestamp(record, field, None)?)
            }
            LogicalType::Decimal { .. } => Ok(decimal::set_decimal(record, field, None, rounding)?),
            LogicalType::Uuid => Err(invalid(avroflow_avro::UUID)),
        };
    }

    match logical_type {
        LogicalType::Date => {
            let parsed = match value {
                JsonValue::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
                JsonValue::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                    Some(days) => Some(codec::date::decode_date(days)?),
                    None => None,
                },
                _ => None,
            };
            let date = parsed.ok_or_else(|| invalid(avroflow_avro::DATE))?;
            date::set_date(record, field, Some(date))?;
        }
        LogicalType::TimeMillis | LogicalType::TimeMicros => {
            let parsed = match (value, logical_type) {
                (JsonValue::String(s), _) => NaiveTime::parse_from_str(s, TIME_FORMAT).ok(),
                (JsonValue::Number(n), LogicalType::TimeMillis) => {
                    match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                        Some(millis) => Some(codec::time::decode_time_millis(millis)?),
                        None => None,
                    }
                }
                (JsonValue::Number(n), _) => match n.as_i64() {
                    Some(micros) => Some(codec::time::decode_time_micros(micros)?),
                    None => None,
                },
                _ => None,
            };
            let t = parsed.ok_or_else(|| invalid(logical_type.name()))?;
            time::set_time(record, field, Some(t))?;
        }
        LogicalType::TimestampMillis | LogicalType::TimestampMicros => {
            let parsed = match (value, logical_type) {
                (JsonValue::String(s), _) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|d| d.with_timezone(&Utc)),
                (JsonValue::Number(n), LogicalType::TimestampMillis) => match n.as_i64() {
                    Some(millis) => Some(codec::timestamp::decode_instant_millis(millis)?),
                    None => None,
                },
                (JsonValue::Number(n), _) => match n.as_i64() {
                    Some(micros) => Some(codec::timestamp::decode_instant_micros(micros)?),
                    None => None,
                },
                _ => None,
            };
            let instant = parsed.ok_or_else(|| invalid(logical_type.name()))?;
            timestamp::set_instant(record, field, Some(instant))?;
        }
        LogicalType::LocalTimestampMillis | LogicalType::LocalTimestampMicros => {
            let parsed = match (value, logical_type) {
                (JsonValue::String(s), _) => {
                    NaiveDateTime::parse_from_str(s, LOCAL_TIMESTAMP_FORMAT).ok()
                }
                (JsonValue::Number(n), LogicalType::LocalTimestampMillis) => match n.as_i64() {
                    Some(millis) => Some(codec::timestamp::decode_local_timestamp_millis(millis)?),
                    None => None,
                },
                (JsonValue::Number(n), _) => match n.as_i64() {
                    Some(micros) => Some(codec::timestamp::decode_local_timestamp_micros(micros)?),
                    None => None,
                },
                _ => None,
            };
            let datetime = parsed.ok_or_else(|| invalid(logical_type.name()))?;
            timestamp::set_local_timestamp(record, field, Some(datetime))?;
        }
        LogicalType::Decimal { .. } => {
            let parsed = match value {
                JsonValue::String(s) => BigDecimal::from_str(s).ok(),
                JsonValue::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
                _ => None,
            };
            let d = parsed.ok_or_else(|| invalid(avroflow_avro::DECIMAL))?;
            decimal::set_decimal(record, field, Some(&d), rounding)?;
        }
        LogicalType::Uuid => return Err(invalid(avroflow_avro::UUID)),
    }
    Ok(())
}

/// Decodes an Avro datum into a JSON object with logical fields as text.
pub fn avro_to_json(data: &AvroData) -> Result<JsonValue, Error> {
    let schema =
        Schema::parse_str(&data.schema).map_err(|source| Error::InvalidSchema { source })?;
    let record = GenericRecord::from_datum(schema.clone(), &data.raw_bytes)?;

    let mut object = Map::new();
    for field in &schema::record_schema(&schema)?.fields {
        let name = &field.name;
        let rendered = match schema::resolve_logical_field(&schema, name) {
            Ok(resolved) => match resolved.logical_type {
                LogicalType::Date => date::get_date(&record, name)?
                    .map(|d| d.format(DATE_FORMAT).to_string()),
                LogicalType::TimeMillis | LogicalType::TimeMicros => {
                    time::get_time(&record, name)?.map(|t| t.format(TIME_FORMAT).to_string())
                }
                LogicalType::TimestampMillis | LogicalType::TimestampMicros => {
                    timestamp::get_instant(&record, name)?
                        .map(|i| i.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                }
                LogicalType::LocalTimestampMillis | LogicalType::LocalTimestampMicros => {
                    timestamp::get_local_timestamp(&record, name)?
                        .map(|d| d.format(LOCAL_TIMESTAMP_FORMAT).to_string())
                }
                LogicalType::Decimal { scale, .. } => decimal::get_decimal(&record, name)?
                    .map(|d| d.with_scale(scale as i64).to_plain_string()),
                LogicalType::Uuid => {
                    object.insert(name.clone(), plain_json(&record, name)?);
                    continue;
                }
            },
            Err(schema::Error::InvalidLogicalType { .. }) => {
                object.insert(name.clone(), plain_json(&record, name)?);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        object.insert(
            name.clone(),
            rendered.map_or(JsonValue::Null, JsonValue::String),
        );
    }
    Ok(JsonValue::Object(object))
}

fn plain_json(record: &GenericRecord, field: &str) -> Result<JsonValue, Error> {
    JsonValue::try_from(record.get(field)?.clone()).map_err(|source| Error::Json {
        field: field.to_string(),
        source,
    })
}

/// Convert processor.
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

    /// Parses the configured schema once for all events.
    async fn init(&self) -> Result<EventHandler, Error> {
        let schema = match (&self.config.schema, self.config.target_format) {
            (Some(raw), _) => {
                Some(Schema::parse_str(raw).map_err(|source| Error::InvalidSchema { source })?)
            }
            (None, TargetFormat::Avro) => return Err(Error::MissingSchema),
            (None, TargetFormat::Json) => None,
        };
        if let Some(schema) = &schema {
            schema::record_schema(schema)?;
        }

        Ok(EventHandler {
            config: Arc::clone(&self.config),
            schema,
            task_id: self.task_id,
            tx: self.tx.clone(),
            task_type: self.task_type,
        })
    }

    #[tracing::instrument(skip(self), name = DEFAULT_MESSAGE_SUBJECT, fields(flow = %self.task_context.flow_name, task = %self.config.name, task_id = self.task_id))]
    async fn run(mut self) -> Result<(), Error> {
        let event_handler = match self.init().await {
            Ok(handler) => handler,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

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
    use crate::event::EventBuilder;
    use crate::task::convert::config::Rounding;
    use crate::task::runner::Runner;
    use serde_json::json;
    use tokio::sync::mpsc;

    const VULCAN: &str = r#"
    {
        "type": "record",
        "name": "Vulcan",
        "namespace": "io.avroflow.model",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "intelligence", "type": "int"},
            {"name": "nickname", "type": ["null", "string"], "default": null},
            {"name": "bank_balance", "type": {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}},
            {"name": "date_of_birth", "type": {"type": "int", "logicalType": "date"}},
            {"name": "time_of_birth_millis", "type": {"type": "int", "logicalType": "time-millis"}},
            {"name": "time_of_birth_micros", "type": ["null", {"type": "long", "logicalType": "time-micros"}]},
            {"name": "birth_timestamp_millis", "type": {"type": "long", "logicalType": "timestamp-millis"}},
            {"name": "birth_timestamp_micros", "type": {"type": "long", "logicalType": "timestamp-micros"}},
            {"name": "landing", "type": {"type": "long", "logicalType": "local-timestamp-millis"}}
        ]
    }"#;

    const CREW: &str = r#"
    {
        "type": "record",
        "name": "Crew",
        "namespace": "io.avroflow.model",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "home", "type": {
                "type": "record",
                "name": "Address",
                "fields": [
                    {"name": "planet", "type": "string"},
                    {"name": "city", "type": "string"}
                ]
            }},
            {"name": "work", "type": "Address"},
            {"name": "shore_leave", "type": ["null", "Address"], "default": null}
        ]
    }"#;

    const LEDGER: &str = r#"
    {
        "type": "record",
        "name": "Ledger",
        "fields": [
            {"name": "balance", "type": {"type": "bytes", "logicalType": "decimal", "precision": 30, "scale": 24}}
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

    async fn processor(
        config: super::super::config::Processor,
        rx: Receiver<Event>,
        tx: Sender<Event>,
    ) -> Processor {
        ProcessorBuilder::new()
            .config(Arc::new(config))
            .receiver(rx)
            .sender(tx)
            .task_id(1)
            .task_type("convert")
            .task_context(create_mock_task_context())
            .build()
            .await
            .unwrap()
    }

    fn to_avro_config(rounding: Option<Rounding>) -> super::super::config::Processor {
        super::super::config::Processor {
            name: "to_avro".to_string(),
            target_format: TargetFormat::Avro,
            schema: Some(VULCAN.to_string()),
            rounding,
        }
    }

    fn spock() -> JsonValue {
        json!({
            "name": "Spock",
            "intelligence": 10,
            "bank_balance": "17.01",
            "date_of_birth": "1967-11-17",
            "time_of_birth_millis": "00:59:00",
            "time_of_birth_micros": "00:59:00.000001",
            "birth_timestamp_millis": "1967-11-17T00:59:00Z",
            "birth_timestamp_micros": -67_042_860_000_000i64,
            "landing": "2063-04-05T11:00:00"
        })
    }

    fn event(data: EventData) -> Event {
        EventBuilder::new()
            .data(data)
            .subject("vulcans".to_string())
            .task_id(0)
            .task_type("generate")
            .build()
            .unwrap()
    }

    #[test]
    fn test_json_to_record_encodes_logical_fields() {
        let schema = Schema::parse_str(VULCAN).unwrap();
        let JsonValue::Object(object) = spock() else {
            unreachable!()
        };

        let record = json_to_record(&schema, &object, None).unwrap();

        assert_eq!(record.get("date_of_birth").unwrap(), &Value::Date(-776));
        assert_eq!(
            record.get("time_of_birth_millis").unwrap(),
            &Value::TimeMillis(3_540_000)
        );
        assert_eq!(
            record.get("time_of_birth_micros").unwrap(),
            &Value::Union(1, Box::new(Value::TimeMicros(3_540_000_001)))
        );
        assert_eq!(
            record.get("birth_timestamp_millis").unwrap(),
            &Value::TimestampMillis(-67_042_860_000)
        );
        assert_eq!(
            record.get("nickname").unwrap(),
            &Value::Union(0, Box::new(Value::Null))
        );
        assert_eq!(
            decimal::get_decimal(&record, "bank_balance").unwrap(),
            Some(BigDecimal::from_str("17.01").unwrap())
        );
    }

    #[test]
    fn test_json_to_record_rejects_bad_date() {
        let schema = Schema::parse_str(VULCAN).unwrap();
        let mut object = spock().as_object().unwrap().clone();
        object.insert("date_of_birth".to_string(), json!("17/11/1967"));

        let result = json_to_record(&schema, &object, None);
        assert!(matches!(
            result,
            Err(Error::InvalidText { field, expected: "date", .. }) if field == "date_of_birth"
        ));
    }

    #[test]
    fn test_json_to_record_lossy_decimal_needs_rounding() {
        let schema = Schema::parse_str(VULCAN).unwrap();
        let mut object = spock().as_object().unwrap().clone();
        object.insert("bank_balance".to_string(), json!("17.015"));

        assert!(matches!(
            json_to_record(&schema, &object, None),
            Err(Error::Convert(convert::Error::Codec(
                codec::Error::PrecisionLoss { .. }
            )))
        ));

        let record = json_to_record(&schema, &object, Some(RoundingMode::HalfEven)).unwrap();
        assert_eq!(
            decimal::get_decimal(&record, "bank_balance").unwrap(),
            Some(BigDecimal::from_str("17.02").unwrap())
        );
    }

    #[test]
    fn test_json_to_record_missing_required_field() {
        let schema = Schema::parse_str(VULCAN).unwrap();
        let mut object = spock().as_object().unwrap().clone();
        object.remove("date_of_birth");

        assert!(matches!(
            json_to_record(&schema, &object, None),
            Err(Error::Convert(convert::Error::NotNullable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_round_trip_through_avro() {
        let (tx, rx) = mpsc::channel(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let to_avro = processor(to_avro_config(None), rx, out_tx.clone()).await;
        let handler = to_avro.init().await.unwrap();

        handler.handle(event(EventData::Json(spock()))).await.unwrap();
        let encoded = out_rx.try_recv().unwrap();
        assert_eq!(encoded.task_id, 1);
        let EventData::Avro(avro) = &encoded.data else {
            panic!("expected avro payload");
        };
        assert_eq!(avro.schema, VULCAN);

        let json = avro_to_json(avro).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "Spock",
                "intelligence": 10,
                "nickname": null,
                "bank_balance": "17.01",
                "date_of_birth": "1967-11-17",
                "time_of_birth_millis": "00:59:00",
                "time_of_birth_micros": "00:59:00.000001",
                "birth_timestamp_millis": "1967-11-17T00:59:00Z",
                "birth_timestamp_micros": "1967-11-17T00:59:00Z",
                "landing": "2063-04-05T11:00:00"
            })
        );
        drop(tx);
    }

    #[tokio::test]
    async fn test_json_target_decodes_avro() {
        let (_tx, rx) = mpsc::channel(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let schema = Schema::parse_str(VULCAN).unwrap();
        let record = json_to_record(&schema, spock().as_object().unwrap(), None).unwrap();
        let data = EventData::Avro(AvroData {
            schema: VULCAN.to_string(),
            raw_bytes: record.to_datum().unwrap(),
        });

        let to_json = processor(
            super::super::config::Processor {
                name: "to_json".to_string(),
                target_format: TargetFormat::Json,
                schema: None,
                rounding: None,
            },
            rx,
            out_tx,
        )
        .await;
        let handler = to_json.init().await.unwrap();
        handler.handle(event(data)).await.unwrap();

        let EventData::Json(json) = out_rx.try_recv().unwrap().data else {
            panic!("expected json payload");
        };
        assert_eq!(json["date_of_birth"], json!("1967-11-17"));
        assert_eq!(json["intelligence"], json!(10));
    }

    #[tokio::test]
    async fn test_avro_payload_passes_through_avro_target() {
        let (_tx, rx) = mpsc::channel(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let data = EventData::Avro(AvroData {
            schema: VULCAN.to_string(),
            raw_bytes: vec![1, 2, 3],
        });

        let handler = processor(to_avro_config(None), rx, out_tx)
            .await
            .init()
            .await
            .unwrap();
        handler.handle(event(data.clone())).await.unwrap();

        assert_eq!(out_rx.try_recv().unwrap().data, data);
    }

    #[tokio::test]
    async fn test_avro_target_without_schema_fails_init() {
        let (_tx, rx) = mpsc::channel(10);
        let (out_tx, _out_rx) = mpsc::channel(10);
        let config = super::super::config::Processor {
            schema: None,
            ..to_avro_config(None)
        };

        let result = processor(config, rx, out_tx).await.init().await;
        assert!(matches!(result, Err(Error::MissingSchema)));
    }

    #[tokio::test]
    async fn test_non_record_schema_fails_init() {
        let (_tx, rx) = mpsc::channel(10);
        let (out_tx, _out_rx) = mpsc::channel(10);
        let config = super::super::config::Processor {
            schema: Some(r#""string""#.to_string()),
            ..to_avro_config(None)
        };

        let result = processor(config, rx, out_tx).await.init().await;
        assert!(matches!(result, Err(Error::Schema(schema::Error::NotARecord(_)))));
    }

    #[test]
    fn test_named_type_reference_converts_both_ways() {
        let schema = Schema::parse_str(CREW).unwrap();
        let crew = json!({
            "name": "Uhura",
            "home": {"planet": "Earth", "city": "Nairobi"},
            "work": {"planet": "Vulcan", "city": "ShiKahr"}
        });

        let record = json_to_record(&schema, crew.as_object().unwrap(), None).unwrap();
        assert_eq!(
            record.get("work").unwrap(),
            &Value::Record(vec![
                ("planet".to_string(), Value::String("Vulcan".to_string())),
                ("city".to_string(), Value::String("ShiKahr".to_string())),
            ])
        );

        let json = avro_to_json(&AvroData {
            schema: CREW.to_string(),
            raw_bytes: record.to_datum().unwrap(),
        })
        .unwrap();
        assert_eq!(json["work"], json!({"planet": "Vulcan", "city": "ShiKahr"}));
        assert_eq!(json["home"], json!({"planet": "Earth", "city": "Nairobi"}));
        assert_eq!(json["shore_leave"], JsonValue::Null);
    }

    #[test]
    fn test_named_type_reference_rejects_wrong_shape() {
        let schema = Schema::parse_str(CREW).unwrap();
        let crew = json!({
            "name": "Uhura",
            "home": {"planet": "Earth", "city": "Nairobi"},
            "work": "ShiKahr"
        });

        assert!(matches!(
            json_to_record(&schema, crew.as_object().unwrap(), None),
            Err(Error::Resolve { field, .. }) if field == "work"
        ));
    }

    #[test]
    fn test_small_decimals_render_without_exponent() {
        let schema = Schema::parse_str(LEDGER).unwrap();
        let ledger = json!({"balance": "0.000000000000000000000001"});

        let record = json_to_record(&schema, ledger.as_object().unwrap(), None).unwrap();
        let json = avro_to_json(&AvroData {
            schema: LEDGER.to_string(),
            raw_bytes: record.to_datum().unwrap(),
        })
        .unwrap();

        assert_eq!(json, json!({"balance": "0.000000000000000000000001"}));
        let back = json_to_record(&schema, json.as_object().unwrap(), None).unwrap();
        assert_eq!(
            decimal::get_decimal(&back, "balance").unwrap(),
            decimal::get_decimal(&record, "balance").unwrap()
        );
    }

    #[tokio::test]
    async fn test_run_forwards_until_channel_closes() {
        let (tx, rx) = mpsc::channel(10);
        let (out_tx, mut out_rx) = mpsc::channel(10);
        let to_avro = processor(to_avro_config(None), rx, out_tx).await;

        tx.send(event(EventData::Json(spock()))).await.unwrap();
        drop(tx);
        to_avro.run().await.unwrap();

        assert!(matches!(out_rx.recv().await.unwrap().data, EventData::Avro(_)));
        assert!(out_rx.recv().await.is_none());
    }
}
