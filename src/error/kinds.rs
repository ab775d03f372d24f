use std::{fmt, io};

use crate::error::elastic::ErrorInfo;

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Top-level error type for esdump operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum DumpError {
    /// Remote index errors. Always fatal to an export run.
    Fetch(FetchError),

    /// Output sink errors.
    Sink(SinkError),

    /// Configuration errors.
    Config(ConfigError),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Errors raised while paging through the remote index.
#[derive(Debug)]
pub enum FetchError {
    /// The index could not be reached.
    ConnectionFailed(String),

    /// The index answered with a non-success status.
    Rejected { status: u16, info: ErrorInfo },

    /// The filter expression is not a JSON query.
    InvalidFilter(String),

    /// The response body could not be understood.
    InvalidResponse(String),
}

/// Errors raised by the output sink.
#[derive(Debug)]
pub enum SinkError {
    /// The output file could not be created or truncated.
    Open { path: String, source: io::Error },

    /// Writing a record failed.
    Write(io::Error),

    /// A record could not be serialized.
    Serialize(String),

    /// Flushing or closing the output failed.
    Finalize(io::Error),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Fetch(e) => write!(f, "Fetch error: {e}"),
            DumpError::Sink(e) => write!(f, "Output error: {e}"),
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::ConnectionFailed(msg) => write!(f, "Failed to reach index: {msg}"),
            FetchError::Rejected { status, info } => {
                write!(f, "Request rejected with status {status}: {info}")
            }
            FetchError::InvalidFilter(msg) => write!(f, "Invalid filter expression: {msg}"),
            FetchError::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Open { path, source } => write!(f, "Failed to open {path}: {source}"),
            SinkError::Write(e) => write!(f, "Failed to write record: {e}"),
            SinkError::Serialize(msg) => write!(f, "Failed to serialize record: {msg}"),
            SinkError::Finalize(e) => write!(f, "Failed to finalize output: {e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Fetch(e) => Some(e),
            DumpError::Sink(e) => Some(e),
            DumpError::Config(e) => Some(e),
            DumpError::Generic(_) => None,
        }
    }
}

impl std::error::Error for FetchError {}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Open { source, .. } => Some(source),
            SinkError::Write(e) | SinkError::Finalize(e) => Some(e),
            SinkError::Serialize(_) => None,
        }
    }
}

impl std::error::Error for ConfigError {}

/* ========================= Conversions to DumpError ========================= */

impl From<reqwest::Error> for DumpError {
    fn from(err: reqwest::Error) -> Self {
        DumpError::Fetch(err.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<FetchError> for DumpError {
    fn from(err: FetchError) -> Self {
        DumpError::Fetch(err)
    }
}

impl From<SinkError> for DumpError {
    fn from(err: SinkError) -> Self {
        DumpError::Sink(err)
    }
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_sink_open() {
        let err = DumpError::from(SinkError::Open {
            path: "/nope/out.json".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        });
        assert_eq!(err.to_string(), "Output error: Failed to open /nope/out.json: missing");
    }

    #[test]
    fn test_display_fetch_failure() {
        let err = DumpError::from(FetchError::ConnectionFailed("refused".to_string()));
        assert_eq!(err.to_string(), "Fetch error: Failed to reach index: refused");
    }

    #[test]
    fn test_config_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            field: "export.page_size".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value '0' for field 'export.page_size'");
    }
}
