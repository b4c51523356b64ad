use crate::init::LayerConfig;
use crate::record::{LogMessage, LogRecord};
use crate::sink::LogSink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that observes events and forwards them to
/// an asynchronous [`LogSink`] via a bounded channel and background task.
///
/// Events at or above the configured level become [`LogRecord`]s. Sink I/O
/// is fully decoupled from application threads; records reach the sink in
/// emission order.
pub struct SinkLayer {
    sender: mpsc::Sender<LogRecord>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Dropped after the sink kept failing past `max_retries`.
    pub failed_events: Arc<AtomicU64>,
}

impl SinkLayer {
    /// Create a new layer and spawn a background task that pulls
    /// [`LogRecord`]s from a bounded channel and sends them to the
    /// provided [`LogSink`]. Must be called inside a Tokio runtime.
    ///
    /// The task stops when the returned [`DeliveryGuard`] is shut down or
    /// dropped, or when the layer itself is dropped. Either way it first
    /// delivers what is already queued and flushes the sink.
    pub fn new(sink: Arc<dyn LogSink>, config: LayerConfig) -> (Self, DeliveryGuard) {
        // Enforce minimal thresholds to avoid degenerate configs.
        let buffer = config.channel_buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));
        let max_retries = config.max_retries;

        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));
        let failed_events = Arc::new(AtomicU64::new(0));

        let enqueued_events_bg = Arc::clone(&enqueued_events);
        let failed_events_bg = Arc::clone(&failed_events);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            // one ticker for the whole loop, so incoming records never reset it
            let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(record) => {
                            batch.push(record);
                            enqueued_events_bg.fetch_add(1, Ordering::Relaxed);
                            if batch.len() >= batch_size {
                                send_batch(&*sink, &mut batch, max_retries, &failed_events_bg).await;
                            }
                        }
                        None => break,
                    },
                    _ = ticker.tick() => {
                        if !batch.is_empty() {
                            send_batch(&*sink, &mut batch, max_retries, &failed_events_bg).await;
                        }
                    }
                    // fires on an explicit shutdown and on a dropped guard
                    _ = &mut shutdown_rx => {
                        rx.close();
                        while let Some(record) = rx.recv().await {
                            batch.push(record);
                            enqueued_events_bg.fetch_add(1, Ordering::Relaxed);
                        }
                        break;
                    }
                }
            }

            send_batch(&*sink, &mut batch, max_retries, &failed_events_bg).await;
            if let Err(e) = sink.flush().await {
                eprintln!("error flushing log sink: {}", e);
            }
        });

        (Self {
            sender: tx,
            min_level: config.min_level,
            total_events,
            enqueued_events,
            dropped_events,
            failed_events,
        }, DeliveryGuard {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}

/// Keeps the delivery task of a [`SinkLayer`] running.
///
/// A global subscriber lives for the whole process, so its channel never
/// closes on its own. Call [`DeliveryGuard::shutdown`] before exiting to
/// wait until every queued record has reached the sink. Dropping the guard
/// also stops the task, without waiting for it.
#[must_use = "dropping the guard stops log delivery"]
pub struct DeliveryGuard {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeliveryGuard {
    /// Signal the task to drain and flush, then wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            // the task may already be gone if the layer was dropped first
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                eprintln!("log delivery task failed: {}", e);
            }
        }
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Deliver every record in order. A failing record is retried with
/// exponential backoff; after `max_retries` it is dropped so the rest of
/// the batch is not held back.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<LogRecord>,
    max_retries: u32,
    failed_events: &AtomicU64,
) {
    let max_backoff = Duration::from_secs(10);

    for record in batch.drain(..) {
        let mut backoff = Duration::from_millis(100);
        let mut attempt = 0;
        while let Err(e) = sink.send(&record).await {
            if attempt >= max_retries {
                failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log sink send failed, dropping record: {}", e);
                break;
            }
            attempt += 1;
            eprintln!("log sink send failed, retrying in {:?}: {}", backoff, e);
            sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, max_backoff);
        }
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.min_level {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            fields,
            message: message.as_deref().map(LogMessage::parse),
        };

        if self.sender.try_send(record).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("log channel full, dropping log record");
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects event fields; `message` is kept apart as raw text.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // format args and `%value` messages arrive here
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
