use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use thiserror::Error;

/// Errors raised by the options model and the default-options registry.
///
/// Every variant is a deterministic, caller-recoverable condition; none of
/// them is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsError {
    /// A recognized key held a value of the wrong JSON type.
    #[error("malformed options: key '{key}' expected {expected}, found {found}")]
    MalformedOptions {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The default mapping provider could not supply any data.
    #[error("missing default configuration from {source_name}: {reason}")]
    MissingDefaultConfiguration { source_name: String, reason: String },

    /// A setter was called after the options were locked.
    #[error("options are locked; '{field}' can no longer be modified")]
    OptionsLocked { field: &'static str },

    /// A keyed setter named a key that is not a settable option.
    #[error("unknown or read-only option key '{key}'")]
    UnknownKey { key: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<SerdeError> for OptionsError {
    fn from(err: SerdeError) -> Self {
        OptionsError::Serialization(format!("JSON error: {err}"))
    }
}

/// Response envelope handed back across the FFI boundary as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
pub enum AppResponse {
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    Locked(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::Locked(msg) => write!(f, "Locked: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl From<OptionsError> for AppResponse {
    fn from(err: OptionsError) -> Self {
        match err {
            OptionsError::MalformedOptions { .. } => AppResponse::ValidationError(err.to_string()),
            OptionsError::MissingDefaultConfiguration { .. } => AppResponse::NotFound(err.to_string()),
            OptionsError::OptionsLocked { .. } => AppResponse::Locked(err.to_string()),
            OptionsError::UnknownKey { .. } => AppResponse::BadRequest(err.to_string()),
            OptionsError::Serialization(msg) => AppResponse::SerializationError(msg),
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }
}
