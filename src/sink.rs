use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s produced by the logging layer.
///
/// Implementations persist or display records (a JSON file, stdout, the
/// metrics router). The layer calls `send` from a background task and never
/// awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Process a single log record.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] produced by the layer.
    ///
    /// **Returns**
    /// - `Ok(())` once the sink is done with the record. Resolution of this
    ///   future is the completion signal and happens exactly once per call.
    /// - `Err(..)` if the underlying write failed (I/O, serialization).
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the sink implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
