//! Error types for ReviewLens.
//!
//! Library crates use [`ReviewLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ReviewLens operations.
#[derive(Debug, thiserror::Error)]
pub enum ReviewLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the model endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed wire payload (e.g. an undecodable stream event).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The text-generation service rejected or failed a request.
    #[error("model error: {0}")]
    Model(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad filter, unknown grouping, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Review export could not be read as a dataset.
    #[error("input error: {message}")]
    Input { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReviewLensError>;

impl ReviewLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ReviewLensError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ReviewLensError::input("missing column 'Star Rating'");
        assert!(err.to_string().contains("Star Rating"));

        let err = ReviewLensError::Model("HTTP 429: rate limited".into());
        assert_eq!(err.to_string(), "model error: HTTP 429: rate limited");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = ReviewLensError::io(
            "/tmp/reviews.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/reviews.csv"));
        assert!(msg.contains("gone"));
    }
}
