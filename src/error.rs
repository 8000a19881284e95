//! Error types for the backend proxy

use thiserror::Error;

/// Result type alias for proxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or running proxy scripts
#[derive(Error, Debug)]
pub enum Error {
    /// A value could not be turned into source text. Raised before any
    /// remote interaction.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializeError),

    /// The page threw while evaluating a generated script. The message is
    /// exactly what the page reported.
    #[error("{0}")]
    Remote(String),

    /// The driver failed to run a script (transport level, not a page error)
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Failed to navigate or to prepare the next page
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Reasons a value cannot be rendered as source text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error("number {0} has no literal form")]
    NonFiniteNumber(f64),

    #[error("date {0}ms is outside the representable range")]
    DateOutOfRange(i64),

    #[error("malformed regular expression literal {0:?}")]
    InvalidRegExpLiteral(String),

    #[error("invalid regular expression flags {0:?}")]
    InvalidRegExpFlags(String),

    #[error("function source is empty")]
    EmptyFunction,

    #[error("value nesting exceeds {0} levels (circular structure?)")]
    TooDeep(usize),

    #[error("unsupported value: {0}")]
    Unsupported(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_display_the_page_message_unchanged() {
        let err = Error::Remote("Unsatisfied requests: GET /remote".into());
        assert_eq!(err.to_string(), "Unsatisfied requests: GET /remote");
    }

    #[test]
    fn test_serialize_errors_convert() {
        let err: Error = SerializeError::EmptyFunction.into();
        assert!(matches!(err, Error::Serialization(SerializeError::EmptyFunction)));
        assert!(err.to_string().starts_with("Serialization failed"));
    }
}
