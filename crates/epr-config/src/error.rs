//! Error type shared by every module of the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for loading, merging, validating and persisting settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The merged mapping no longer matches the settings schema
    /// (e.g. `dissipation = 5` or `epsi = "high"`).
    #[error("override does not fit the settings schema: {0}")]
    Schema(String),

    /// A dotted key does not name any setting.
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    /// A `KEY=VALUE` assignment could not be understood.
    #[error("invalid assignment '{0}': expected KEY=VALUE")]
    InvalidAssignment(String),

    /// A value is present but unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// The `log.format` pattern contains an unsupported placeholder.
    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    /// Refused to overwrite an existing file.
    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    /// A global tracing subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    LoggingInit(String),
}
