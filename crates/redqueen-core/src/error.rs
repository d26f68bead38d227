use thiserror::Error;

/// Top-level error type for the Red Queen demo.
///
/// Chat operations themselves never fail (unknown ids are silent no-ops), so
/// this only covers the ambient concerns around them: configuration, I/O and
/// the HTTP server lifecycle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RedQueenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<toml::de::Error> for RedQueenError {
    fn from(err: toml::de::Error) -> Self {
        RedQueenError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RedQueenError {
    fn from(err: toml::ser::Error) -> Self {
        RedQueenError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RedQueenError {
    fn from(err: serde_json::Error) -> Self {
        RedQueenError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Red Queen operations.
pub type Result<T> = std::result::Result<T, RedQueenError>;
