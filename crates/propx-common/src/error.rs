//! Error types for talking to the PropX API

use miette::Diagnostic;
use propx_editor_core::UploadError;

/// Fallback shown when the server gives no usable message.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Main error type for API operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ApiError {
    /// The credential was rejected; the session has been cleared.
    #[error("not signed in or session expired")]
    #[diagnostic(
        code(propx::api::unauthorized),
        help("sign in again or set PROPX_TOKEN")
    )]
    Unauthorized,

    /// Signed in, but not allowed to do this.
    #[error("access denied")]
    #[diagnostic(code(propx::api::forbidden))]
    Forbidden,

    /// Any other non-success status.
    #[error("{message}")]
    #[diagnostic(code(propx::api::status))]
    Status { status: u16, message: String },

    /// Transport failure
    #[error(transparent)]
    #[diagnostic(code(propx::api::network))]
    Network(#[from] reqwest::Error),

    /// The response body was not what the endpoint promises.
    #[error("invalid response: {0}")]
    #[diagnostic(code(propx::api::response))]
    InvalidResponse(String),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialization/deserialization errors
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(propx::serde::json))]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    #[diagnostic(code(propx::serde::toml))]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    #[diagnostic(code(propx::serde::toml))]
    TomlSer(#[from] toml::ser::Error),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(SerDeError::Json(err))
    }
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ApiError> for UploadError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => UploadError::Status { status, message },
            ApiError::InvalidResponse(msg) => UploadError::InvalidResponse(msg),
            ApiError::Network(err) => UploadError::Network(err.to_string()),
            ApiError::Io(err) => UploadError::Read(err.to_string()),
            other => match other.status() {
                Some(status) => UploadError::Status {
                    status,
                    message: other.to_string(),
                },
                None => UploadError::InvalidResponse(other.to_string()),
            },
        }
    }
}
