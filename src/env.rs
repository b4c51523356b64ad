//! Environment variable names used by [`LoggerConfig::from_env`].
//!
//! These are purely helpers; the sink types themselves never read the
//! environment.
//!
//! [`LoggerConfig::from_env`]: crate::init::LoggerConfig::from_env

/// Minimum level captured by the logger (`trace`..`error`).
pub const METRICS_LOG_LEVEL_ENV: &str = "METRICS_LOG_LEVEL";

/// Path of the general JSON execution log.
pub const METRICS_LOG_EXECUTION_FILE_ENV: &str = "METRICS_LOG_EXECUTION_FILE";

/// Path of the metrics-only log.
pub const METRICS_LOG_METRICS_FILE_ENV: &str = "METRICS_LOG_METRICS_FILE";

/// `true`/`false`: whether every record is also echoed as JSON to stdout.
pub const METRICS_LOG_CONSOLE_ENV: &str = "METRICS_LOG_CONSOLE";
