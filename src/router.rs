use crate::console::SummaryWriter;
use crate::file_sink::FileSink;
use crate::record::{LogRecord, RecordKind};
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default file name for the metrics-only log.
pub const METRICS_LOG_FILE: &str = "remote-metrics.log";

/// Sink that picks metrics-tagged records out of the stream.
///
/// A metrics record is forwarded, unchanged, to the wrapped destination and
/// summarized as `[REMOTE METRICS] {label} {host} :: {output}` on the
/// summary writer. The summary is printed even when the destination write
/// fails; that error is then returned as-is. Every other record is ignored
/// here and left to the other layers of the subscriber.
pub struct MetricsRouter {
    destination: Arc<dyn LogSink>,
    summary: SummaryWriter,
    /// Records forwarded to the metrics destination.
    pub metrics_routed: AtomicU64,
    /// Records that were not metrics.
    pub ignored: AtomicU64,
}

impl MetricsRouter {
    pub fn new(destination: Arc<dyn LogSink>, summary: SummaryWriter) -> Self {
        MetricsRouter {
            destination,
            summary,
            metrics_routed: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Router writing pretty JSON to `path` and summaries to stdout.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = FileSink::open(path).await?;
        Ok(Self::new(Arc::new(file), SummaryWriter::Stdout))
    }
}

#[async_trait]
impl LogSink for MetricsRouter {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        match record.classify() {
            RecordKind::Metrics(payload) => {
                let written = self.destination.send(record).await;
                self.metrics_routed.fetch_add(1, Ordering::Relaxed);
                // the summary does not depend on the file write
                self.summary.write_line(&payload.summary_line())?;
                written
            }
            RecordKind::Plain | RecordKind::OtherStructured => {
                self.ignored.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.destination.flush().await
    }
}
