use std::path::PathBuf;

/// Error returned when a configuration value cannot be interpreted.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid log level '{0}', expected one of trace, debug, info, warn, error")]
    InvalidLevel(String),

    #[error("invalid boolean '{value}' for {key}")]
    InvalidBool { key: String, value: String },
}

/// Error returned while building or installing the logger.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log path {0} has no usable file name")]
    InvalidLogPath(PathBuf),

    #[error("failed to open execution log: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
