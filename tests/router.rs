mod common;

use common::{structured_record, temp_path, text_record, json_values, CaptureSink, FailingSink};
use metrics_log_router::console::SummaryWriter;
use metrics_log_router::file_sink::FileSink;
use metrics_log_router::router::MetricsRouter;
use metrics_log_router::sink::LogSink;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn capture_router() -> (MetricsRouter, Arc<CaptureSink>, Arc<std::sync::Mutex<Vec<String>>>) {
    let destination = Arc::new(CaptureSink::default());
    let (summary, lines) = SummaryWriter::buffer();
    let router = MetricsRouter::new(destination.clone(), summary);
    (router, destination, lines)
}

#[tokio::test]
async fn plain_text_is_ignored() {
    let (router, destination, lines) = capture_router();

    router.send(&text_record("server started")).await.unwrap();

    assert!(destination.records().is_empty());
    assert!(lines.lock().unwrap().is_empty());
    assert_eq!(router.ignored.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn metrics_record_is_forwarded_and_summarized() {
    let (router, destination, lines) = capture_router();
    let record = structured_record(json!({
        "type": "metrics",
        "label": "latency",
        "host": "node-3",
        "output": "120ms",
    }));

    router.send(&record).await.unwrap();

    let forwarded = destination.records();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].message, record.message);
    assert_eq!(forwarded[0].timestamp, record.timestamp);
    assert_eq!(*lines.lock().unwrap(), vec!["[REMOTE METRICS] latency node-3 :: 120ms"]);
    assert_eq!(router.metrics_routed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn missing_label_and_host_render_empty() {
    let (router, destination, lines) = capture_router();

    router
        .send(&structured_record(json!({"type": "metrics", "output": "5ms"})))
        .await
        .unwrap();

    assert_eq!(destination.records().len(), 1);
    assert_eq!(*lines.lock().unwrap(), vec!["[REMOTE METRICS]   :: 5ms"]);
}

#[tokio::test]
async fn other_structured_messages_are_ignored() {
    let (router, destination, lines) = capture_router();

    router.send(&structured_record(json!({"type": "event", "name": "x"}))).await.unwrap();
    router.send(&structured_record(json!({"type": "debug"}))).await.unwrap();
    router.send(&structured_record(json!({"label": "latency"}))).await.unwrap();

    assert!(destination.records().is_empty());
    assert!(lines.lock().unwrap().is_empty());
    assert_eq!(router.ignored.load(Ordering::Relaxed), 3);
}

#[tokio::test]
async fn same_record_twice_is_written_twice() {
    let (router, destination, lines) = capture_router();
    let record = structured_record(json!({"type": "metrics", "label": "rps", "output": "900"}));

    router.send(&record).await.unwrap();
    router.send(&record).await.unwrap();

    assert_eq!(destination.records().len(), 2);
    assert_eq!(lines.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn summary_is_printed_even_when_destination_fails() {
    let destination = Arc::new(FailingSink::default());
    let (summary, lines) = SummaryWriter::buffer();
    let router = MetricsRouter::new(destination.clone(), summary);

    let err = router
        .send(&structured_record(json!({"type": "metrics", "label": "latency", "output": "1ms"})))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "disk full");
    assert_eq!(destination.attempts.load(Ordering::Relaxed), 1);
    assert_eq!(*lines.lock().unwrap(), vec!["[REMOTE METRICS] latency  :: 1ms"]);
}

#[tokio::test]
async fn metrics_file_holds_pretty_records_only() {
    let path = temp_path("remote-metrics.log");
    let file = Arc::new(FileSink::open(&path).await.unwrap());
    let (summary, lines) = SummaryWriter::buffer();
    let router = MetricsRouter::new(file, summary);

    router.send(&text_record("server started")).await.unwrap();
    router
        .send(&structured_record(json!({"type": "metrics", "label": "latency", "host": "node-3", "output": "120ms"})))
        .await
        .unwrap();
    router.flush().await.unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"timestamp\""));
    let values = json_values(&text);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["message"]["label"], "latency");
    assert!(values[0]["timestamp"].is_string());
    assert_eq!(lines.lock().unwrap().len(), 1);

    let _ = std::fs::remove_file(&path);
}
