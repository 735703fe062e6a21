//! Error types for session establishment and route authorization.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for the session crate.
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

/// Message shown on the login view when a non-employee signs in.
pub const EMPLOYEES_ONLY_MESSAGE: &str = "Only employees can log in";

/// Main error type returned by the session manager.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credentials were accepted upstream but the role is not eligible
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// The authentication collaborator rejected the request or failed
    #[error("Upstream authentication error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A login call is already running
    #[error("A login attempt is already in progress")]
    LoginInProgress,

    /// A logout happened while the login was waiting on the service
    #[error("Login was cancelled by a logout")]
    LoginCancelled,

    /// The collaborator returned no token and no placeholder is configured
    #[error("Authentication response did not include a token")]
    MissingToken,

    /// Operation needs a signed-in user
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the external authentication and employee services.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[cfg(feature = "http-provider")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Credentials rejected: {message}")]
    Rejected { message: String },

    #[error("Employee '{id}' not found")]
    NotFound { id: String },
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored entry '{key}' is corrupted: {message}")]
    Corrupted { key: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Storage backend not available")]
    BackendUnavailable,
}

/// Error body in the shape the login view reads (`response.data.message`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub data: ErrorData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorData {
    pub message: String,
}

impl AuthError {
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// The fixed denial raised for ineligible roles.
    pub fn employees_only() -> Self {
        Self::access_denied(EMPLOYEES_ONLY_MESSAGE)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Message a view can display as-is, when the error carries one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::AccessDenied { message } => Some(message),
            Self::Upstream(UpstreamError::Rejected { message })
            | Self::Upstream(UpstreamError::Status { message, .. }) => Some(message),
            _ => None,
        }
    }

    /// The error wrapped as `{ data: { message } }`.
    pub fn response(&self) -> ErrorResponse {
        let message = self
            .user_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string());
        ErrorResponse {
            data: ErrorData { message },
        }
    }
}

impl StorageError {
    pub fn corrupted(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employees_only_message_is_readable() {
        let err = AuthError::employees_only();
        assert!(err.is_access_denied());
        assert_eq!(err.user_message(), Some("Only employees can log in"));
        assert_eq!(err.response().data.message, "Only employees can log in");
    }

    #[test]
    fn test_response_shape_serializes() {
        let body = serde_json::to_value(AuthError::employees_only().response()).unwrap();
        assert_eq!(body["data"]["message"], "Only employees can log in");
    }

    #[test]
    fn test_upstream_rejection_keeps_server_message() {
        let err: AuthError = UpstreamError::Rejected {
            message: "Invalid email or password".to_string(),
        }
        .into();
        assert!(!err.is_access_denied());
        assert_eq!(err.user_message(), Some("Invalid email or password"));
    }

    #[test]
    fn test_response_falls_back_to_display() {
        let err = AuthError::LoginInProgress;
        assert_eq!(err.user_message(), None);
        assert_eq!(
            err.response().data.message,
            "A login attempt is already in progress"
        );
    }
}
