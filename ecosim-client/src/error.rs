use std::path::PathBuf;

use ecosim_core::{NormalizeError, ValidationError};
use thiserror::Error;

/// The prediction round trip failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("predictor returned HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    #[error("malformed predictor response: {0}")]
    MalformedBody(String),

    #[error("predictor rejected the request: {0}")]
    Rejected(String),

    #[error("predictor returned unknown class {0:?}")]
    UnknownClass(String),

    #[error("predictor returned an unusable distribution: {0}")]
    Distribution(#[from] NormalizeError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err)
        }
    }
}

impl From<tokio::time::error::Elapsed> for TransportError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TransportError::Timeout
    }
}

/// Why a submission produced no prediction.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SubmitError {
    /// Message suitable for showing to the person who filled in the form.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(ValidationError::MissingField { field }) => {
                format!("Please fill in the '{field}' field.")
            }
            SubmitError::Validation(ValidationError::InvalidNumber { field, .. }) => {
                format!("The '{field}' field must be a number.")
            }
            SubmitError::Validation(ValidationError::UnknownCategory { field, value }) => {
                format!("'{value}' is not a valid '{field}'.")
            }
            SubmitError::Transport(_) => {
                "Failed to connect to the prediction server. Please try again later.".to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset has no `{0}` column")]
    MissingColumn(&'static str),
}
