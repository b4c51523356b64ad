use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Discriminator value that marks a structured message as a metrics record.
pub const METRICS_TYPE: &str = "metrics";

/// One structured log event as seen by every registered sink.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub fields: BTreeMap<String, Value>,
    pub message: Option<LogMessage>,
}

/// The `message` of a record: plain text or a JSON object payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogMessage {
    Text(String),
    Structured(Map<String, Value>),
}

impl LogMessage {
    /// Interpret a raw message. Only a JSON object counts as structured;
    /// numbers, arrays and quoted strings stay text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
                return LogMessage::Structured(map);
            }
        }
        LogMessage::Text(raw.to_string())
    }
}

/// Routing classification of a [`LogRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    /// Text message, or no message at all.
    Plain,
    Metrics(MetricsPayload),
    /// Structured message without the metrics discriminator.
    OtherStructured,
}

impl LogRecord {
    /// Build a record stamped with the current time and no source metadata.
    pub fn new(level: impl Into<String>, message: Option<LogMessage>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level: level.into(),
            target: String::new(),
            module_path: None,
            file: None,
            line: None,
            fields: BTreeMap::new(),
            message,
        }
    }

    pub fn classify(&self) -> RecordKind {
        match &self.message {
            Some(LogMessage::Structured(map)) => {
                match map.get("type") {
                    Some(Value::String(kind)) if kind == METRICS_TYPE => {
                        RecordKind::Metrics(MetricsPayload::from_map(map))
                    }
                    _ => RecordKind::OtherStructured,
                }
            }
            Some(LogMessage::Text(_)) | None => RecordKind::Plain,
        }
    }
}

/// Fields of a metrics message that end up in the console summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsPayload {
    pub label: String,
    pub host: String,
    pub output: String,
}

impl MetricsPayload {
    pub fn new(label: impl Into<String>, host: impl Into<String>, output: impl Into<String>) -> Self {
        MetricsPayload {
            label: label.into(),
            host: host.into(),
            output: output.into(),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        MetricsPayload {
            label: field_text(map, "label"),
            host: field_text(map, "host"),
            output: field_text(map, "output"),
        }
    }

    /// `[REMOTE METRICS] {label} {host} :: {output}`
    pub fn summary_line(&self) -> String {
        format!("[REMOTE METRICS] {} {} :: {}", self.label, self.host, self.output)
    }

    /// Structured message value tagged as metrics, suitable for
    /// `tracing::info!(message = %payload.to_message())`.
    pub fn to_message(&self) -> Value {
        metrics_message(&self.label, &self.host, &self.output)
    }
}

/// Build a metrics-tagged JSON object with the given summary fields.
pub fn metrics_message(label: &str, host: &str, output: &str) -> Value {
    serde_json::json!({
        "type": METRICS_TYPE,
        "label": label,
        "host": host,
        "output": output,
    })
}

fn field_text(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> Option<LogMessage> {
        match value {
            Value::Object(map) => Some(LogMessage::Structured(map)),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn parse_keeps_plain_text() {
        assert_eq!(LogMessage::parse("server started"), LogMessage::Text("server started".into()));
        assert_eq!(LogMessage::parse("42"), LogMessage::Text("42".into()));
        assert_eq!(LogMessage::parse("{not json"), LogMessage::Text("{not json".into()));
    }

    #[test]
    fn parse_detects_objects() {
        let parsed = LogMessage::parse(r#"{"type":"metrics","output":"5ms"}"#);
        assert!(matches!(parsed, LogMessage::Structured(ref m) if m["output"] == "5ms"));
    }

    #[test]
    fn classify_metrics_with_all_fields() {
        let record = LogRecord::new(
            "INFO",
            structured(json!({"type": "metrics", "label": "latency", "host": "node-3", "output": "120ms"})),
        );
        assert_eq!(
            record.classify(),
            RecordKind::Metrics(MetricsPayload::new("latency", "node-3", "120ms"))
        );
    }

    #[test]
    fn classify_missing_fields_default_to_empty() {
        let record = LogRecord::new("INFO", structured(json!({"type": "metrics", "output": "5ms", "host": null})));
        let RecordKind::Metrics(payload) = record.classify() else {
            panic!("expected metrics");
        };
        assert_eq!(payload.summary_line(), "[REMOTE METRICS]   :: 5ms");
    }

    #[test]
    fn classify_renders_non_string_values() {
        let record = LogRecord::new("INFO", structured(json!({"type": "metrics", "output": 120})));
        let RecordKind::Metrics(payload) = record.classify() else {
            panic!("expected metrics");
        };
        assert_eq!(payload.output, "120");
    }

    #[test]
    fn classify_non_metrics() {
        assert_eq!(LogRecord::new("INFO", None).classify(), RecordKind::Plain);
        assert_eq!(
            LogRecord::new("INFO", Some(LogMessage::Text("server started".into()))).classify(),
            RecordKind::Plain
        );
        assert_eq!(
            LogRecord::new("INFO", structured(json!({"type": "event", "name": "x"}))).classify(),
            RecordKind::OtherStructured
        );
        assert_eq!(
            LogRecord::new("INFO", structured(json!({"type": ["metrics"]}))).classify(),
            RecordKind::OtherStructured
        );
        assert_eq!(
            LogRecord::new("INFO", structured(json!({"label": "latency"}))).classify(),
            RecordKind::OtherStructured
        );
    }

    #[test]
    fn message_serializes_inline() {
        let record = LogRecord::new("INFO", structured(json!({"type": "metrics"})));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["message"]["type"], "metrics");

        let record = LogRecord::new("INFO", Some(LogMessage::Text("hi".into())));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["message"], "hi");
    }
}
