//! Error types for frise.
//!
//! Only genuinely exceptional conditions are errors. The recoverable states
//! named by the pipeline design are plain data instead:
//!
//! - a date pattern that matched but failed to parse keeps its mention with
//!   a null resolved value and zero parse confidence;
//! - an event in a document with no dates gets a null-date association;
//! - a classifier failure on one document is recorded in the run's failure
//!   ledger and never aborts the batch.

use thiserror::Error;

/// Result type for frise operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for frise operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration value. Fatal at startup: no partial run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier inference failed for a document batch. Isolated per
    /// document by the pipeline, never fatal to the run.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Invalid input provided at an API boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (CLI/file boundary).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error (CLI/file boundary).
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Error::Inference(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a serialization error.
    pub fn serde(msg: impl Into<String>) -> Self {
        Error::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::config("worker_count must be >= 1");
        assert_eq!(err.to_string(), "Configuration error: worker_count must be >= 1");
    }
}
