use std::path::PathBuf;

use thiserror::Error;

use crate::config::DecodeMode;

/// Errors that can occur while scoring, decoding or exporting a tagger.
#[derive(Debug, Error)]
pub enum NerError {
    /// The configured decoding mode has no implementation.
    #[error("decoding mode {mode} is not supported, only viterbi decoding is implemented")]
    UnsupportedDecodingMode {
        /// The mode found in the configuration.
        mode: DecodeMode,
    },

    /// The serving endpoint answered with something other than HTTP 200.
    #[error("remote prediction failed with status {status}: {body}")]
    RemotePredictionFailed {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Transport-level HTTP failure (connection refused, timeout, bad body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Candle tensor error (variable export and load).
    #[error("tensor error: {0}")]
    Tensor(String),

    /// The endpoint returned scores that do not fit the batch.
    #[error("malformed prediction response: {0}")]
    MalformedResponse(String),

    /// Score or transition matrix does not match the tag count.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A label id outside the tag vocabulary.
    #[error("unknown tag index {0}")]
    UnknownTag(usize),

    /// Export target already exists; exports never overwrite.
    #[error("export directory already exists: {}", .0.display())]
    ExportDirExists(PathBuf),

    /// A variable required by the serving signature is missing.
    #[error("model variable {0:?} is missing")]
    MissingVariable(String),
}

impl From<candle_core::Error> for NerError {
    fn from(err: candle_core::Error) -> Self {
        NerError::Tensor(err.to_string())
    }
}

/// Result type alias for seqtag operations.
pub type Result<T> = std::result::Result<T, NerError>;
