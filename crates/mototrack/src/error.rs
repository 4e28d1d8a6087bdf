//! Error types for mototrack.
//!
//! This module defines all error types used throughout the mototrack crate,
//! covering the remote API, local storage, configuration and client-side
//! validation.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The main error type for mototrack operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Remote API Errors ===
    /// The request never produced a response (connection, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{method} {path} failed with HTTP {status}: {}", .message.as_deref().unwrap_or("no message from server"))]
    Http {
        /// HTTP method of the failed request.
        method: reqwest::Method,
        /// Request path, relative to the base URL.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, if any.
        message: Option<String>,
    },

    /// A record carried an identifier that cannot be used.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    // === Client-side Errors ===
    /// Form validation failed before any network call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The identity provider rejected the request.
    #[error("{message}")]
    Auth {
        /// Normalized provider error code, e.g. `auth/wrong-password`.
        code: String,
        /// Localized message for display.
        message: String,
    },

    /// An operation needed a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Scheduling or cancelling a local notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// The same failure observed by several callers of a coalesced fetch.
    #[error("{0}")]
    Shared(Arc<Error>),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for mototrack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new notification error.
    #[must_use]
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification(message.into())
    }

    /// Recover an error that was handed out through a shared fetch.
    ///
    /// The original error is returned when this was the last reference to it.
    #[must_use]
    pub fn from_shared(err: Arc<Error>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(Self::Shared)
    }

    /// HTTP status carried by this error, if the backend produced one.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            Self::Shared(inner) => inner.http_status(),
            _ => None,
        }
    }

    /// Message the server attached to an HTTP error.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } => message.as_deref(),
            Self::Shared(inner) => inner.server_message(),
            _ => None,
        }
    }

    /// Check if the backend reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(404)
    }

    /// Check if the request failed without reaching the backend.
    #[must_use]
    pub fn is_network(&self) -> bool {
        match self {
            Self::Network(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::Shared(inner) => inner.is_network(),
            _ => false,
        }
    }

    /// Check if a successful response carried a body that could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        match self {
            Self::Json(_) => true,
            Self::Shared(inner) => inner.is_decode(),
            _ => false,
        }
    }

    /// Check if this error came from client-side validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Shared(inner) => inner.is_validation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> Error {
        Error::Http {
            method: reqwest::Method::DELETE,
            path: "/api/motos/42".to_string(),
            status: 404,
            message: Some("Moto não encontrada".to_string()),
        }
    }

    #[test]
    fn test_http_error_display() {
        let msg = not_found().to_string();
        assert!(msg.contains("DELETE /api/motos/42"));
        assert!(msg.contains("404"));
        assert!(msg.contains("Moto não encontrada"));
    }

    #[test]
    fn test_http_error_display_without_message() {
        let err = Error::Http {
            method: reqwest::Method::GET,
            path: "/api/motos".to_string(),
            status: 500,
            message: None,
        };
        assert!(err.to_string().contains("no message from server"));
    }

    #[test]
    fn test_http_status_and_not_found() {
        let err = not_found();
        assert_eq!(err.http_status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.server_message(), Some("Moto não encontrada"));
        assert!(!Error::NotAuthenticated.is_not_found());
    }

    #[test]
    fn test_from_shared_unwraps_sole_owner() {
        let err = Error::from_shared(Arc::new(Error::internal("boom")));
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_from_shared_keeps_shared_error() {
        let shared = Arc::new(not_found());
        let _other = Arc::clone(&shared);
        let err = Error::from_shared(shared);
        assert!(matches!(err, Error::Shared(_)));
        assert!(err.is_not_found());
        assert_eq!(err.server_message(), Some("Moto não encontrada"));
    }

    #[test]
    fn test_validation_error_flag() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email inválido");
        let err: Error = errors.into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_auth_error_display_is_localized_message() {
        let err = Error::Auth {
            code: "auth/wrong-password".to_string(),
            message: "Senha incorreta".to_string(),
        };
        assert_eq!(err.to_string(), "Senha incorreta");
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
            assert!(err.is_decode());
            assert!(!err.is_network());
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "timeout_secs must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_database_open_error_display() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::DatabaseOpen {
                path: PathBuf::from("/nonexistent/path/db.sqlite"),
                source: sqlite_err,
            };
            assert!(err.to_string().contains("/nonexistent/path/db.sqlite"));
        }
    }
}
