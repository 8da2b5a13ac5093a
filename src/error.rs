//! Error types for argcheck

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// argcheck errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid format string: {0}")]
    Format(#[from] crate::format::FormatError),

    #[error("Argument list error: {0}")]
    ArgList(#[from] crate::arglist::ArgListError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
