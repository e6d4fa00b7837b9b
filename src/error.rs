//! Per-request error type
//!
//! A failed request never produces a response line; the error is logged to
//! the error stream and the worker moves on to the next line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    /// The line is not valid JSON or lacks a required field
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The line is not valid UTF-8
    #[error("request line is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// A field parsed but holds an unusable value
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The selected model could not classify the image
    #[error("inference failed on model {model}: {message}")]
    Inference { model: u32, message: String },
}

impl RequestError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Malformed(_) | RequestError::NotUtf8(_) => "malformed",
            RequestError::InvalidField { .. } => "invalid_field",
            RequestError::Inference { .. } => "inference",
        }
    }
}
