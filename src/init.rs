use crate::env::{
    METRICS_LOG_CONSOLE_ENV, METRICS_LOG_EXECUTION_FILE_ENV, METRICS_LOG_LEVEL_ENV,
    METRICS_LOG_METRICS_FILE_ENV,
};
use crate::error::{ConfigError, InitError};
use crate::layer::{DeliveryGuard, SinkLayer};
use crate::router::{MetricsRouter, METRICS_LOG_FILE};
use crate::sink::LogSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Default file name for the general JSON execution log.
pub const EXECUTION_LOG_FILE: &str = "jmeter_execution.log";

/// Logging layer configuration.
///
/// **Fields**
/// - `min_level`: least severe level that still becomes a record.
/// - `channel_buffer`: maximum number of queued records before new ones
///   are dropped.
/// - `batch_size`: records handed to the sink per batch.
/// - `flush_interval`: longest wait before a partial batch is delivered.
/// - `max_retries`: retries for a record the sink rejects.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: Level,
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: Level::INFO,
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

/// Full logger configuration: which sinks exist and where they write.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub execution_log: PathBuf,
    pub metrics_log: PathBuf,
    /// Echo every record as a JSON line on stdout.
    pub enable_console: bool,
    pub layer: LayerConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            execution_log: PathBuf::from(EXECUTION_LOG_FILE),
            metrics_log: PathBuf::from(METRICS_LOG_FILE),
            enable_console: true,
            layer: LayerConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by the `METRICS_LOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LoggerConfig::default();

        if let Some(level) = lookup(METRICS_LOG_LEVEL_ENV) {
            config.layer.min_level = parse_level(&level)?;
        }
        if let Some(path) = lookup(METRICS_LOG_EXECUTION_FILE_ENV) {
            config.execution_log = PathBuf::from(path);
        }
        if let Some(path) = lookup(METRICS_LOG_METRICS_FILE_ENV) {
            config.metrics_log = PathBuf::from(path);
        }
        if let Some(flag) = lookup(METRICS_LOG_CONSOLE_ENV) {
            config.enable_console = parse_bool(METRICS_LOG_CONSOLE_ENV, &flag)?;
        }

        Ok(config)
    }
}

/// Parse `trace`, `debug`, `info`, `warn` or `error`, ignoring case.
pub fn parse_level(raw: &str) -> Result<Level, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLevel(raw.to_string())),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Owns everything that keeps log output flowing.
///
/// Hold it for the life of the program and call [`LoggerGuard::shutdown`]
/// before exiting: it waits for the metrics router to drain and then
/// flushes the execution log writer.
#[must_use = "dropping the guard stops log delivery"]
pub struct LoggerGuard {
    delivery: DeliveryGuard,
    execution_log: WorkerGuard,
}

impl LoggerGuard {
    pub async fn shutdown(self) {
        let LoggerGuard { delivery, execution_log } = self;
        delivery.shutdown().await;
        // blocks until the non-blocking writer has written its backlog
        drop(execution_log);
    }
}

fn execution_appender(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| InitError::InvalidLogPath(path.to_path_buf()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)?;
    Ok(appender)
}

/// Build the subscriber described by `config` without installing it.
///
/// Layers, in order: level filter, JSON console (if enabled), JSON
/// execution log, and the [`SinkLayer`] feeding the [`MetricsRouter`].
/// Must be called inside a Tokio runtime.
pub async fn build_subscriber(
    config: &LoggerConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggerGuard), InitError> {
    let appender = execution_appender(&config.execution_log)?;
    let (file_writer, execution_log) = tracing_appender::non_blocking(appender);

    let router = MetricsRouter::open(&config.metrics_log)
        .await
        .map_err(|source| InitError::OpenFile {
            path: config.metrics_log.clone(),
            source,
        })?;
    let (metrics_layer, delivery) = SinkLayer::new(Arc::new(router), config.layer.clone());

    let console_layer = config.enable_console.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stdout)
    });
    let file_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_ansi(false)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(LevelFilter::from_level(config.layer.min_level))
        .with(console_layer)
        .with(file_layer)
        .with(metrics_layer);

    Ok((subscriber, LoggerGuard { delivery, execution_log }))
}

/// Install a global `tracing` subscriber that delivers events to `sink`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`SinkLayer`] as the global
/// default subscriber, so all `tracing` events in the process are observed
/// by the layer. Must be called inside a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<DeliveryGuard, InitError> {
    let (layer, guard) = SinkLayer::new(sink, config);
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}

/// Build the subscriber for `config` and install it globally.
///
/// This is the recommended entrypoint: console JSON, the execution log and
/// the metrics router all receive every event.
pub async fn init_logger(config: LoggerConfig) -> Result<LoggerGuard, InitError> {
    let (subscriber, guard) = build_subscriber(&config).await?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}

/// [`init_logger`] with [`LoggerConfig::from_env`].
pub async fn init_logger_from_env() -> Result<LoggerGuard, InitError> {
    init_logger(LoggerConfig::from_env()?).await
}
