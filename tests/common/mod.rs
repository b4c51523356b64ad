#![allow(dead_code)]

use async_trait::async_trait;
use metrics_log_router::record::{LogMessage, LogRecord};
use metrics_log_router::sink::LogSink;
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Sink that keeps every record it receives.
#[derive(Default)]
pub struct CaptureSink {
    pub records: Mutex<Vec<LogRecord>>,
    pub flushes: AtomicU64,
}

impl CaptureSink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for CaptureSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Sink that rejects everything and counts attempts.
#[derive(Default)]
pub struct FailingSink {
    pub attempts: AtomicU64,
}

#[async_trait]
impl LogSink for FailingSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err("disk full".into())
    }
}

pub fn text_record(text: &str) -> LogRecord {
    LogRecord::new("INFO", Some(LogMessage::Text(text.to_string())))
}

pub fn structured_record(value: Value) -> LogRecord {
    match value {
        Value::Object(map) => LogRecord::new("INFO", Some(LogMessage::Structured(map))),
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Unique path under the system temp dir; the file is not created.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name))
}

/// Every JSON value in `text`, whether one per line or pretty-printed.
pub fn json_values(text: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap()
}
