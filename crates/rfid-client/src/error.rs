//! Error types for the storage layer and the API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by a credential storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be (de)serialized.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by API operations.
///
/// Backend failures are forwarded as-is; callers decide what a given status
/// means for them (a 401 on login is a bad password, a 401 elsewhere is an
/// expired session).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// The request never produced a response (connection refused, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx body did not match the expected shape.
    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// The configured base address is not a valid URL.
    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    /// Credentials could not be persisted.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    /// HTTP status carried by the error, if the backend responded.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(StatusCode::BAD_REQUEST)
    }

    /// True for network-level failures and 5xx responses.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: "{\"detail\":\"Usuário ou senha incorretos\"}".to_string(),
        };
        assert!(err.to_string().starts_with("HTTP 401 Unauthorized"));

        let err = ApiError::InvalidUrl("not a url".to_string());
        assert_eq!(err.to_string(), "Invalid API URL 'not a url'");
    }

    #[test]
    fn test_status_helpers() {
        let unauthorized = ApiError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_bad_request());
        assert!(!unauthorized.is_connectivity());

        let taken = ApiError::Http {
            status: StatusCode::BAD_REQUEST,
            body: String::new(),
        };
        assert!(taken.is_bad_request());

        let server = ApiError::Http {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert!(server.is_connectivity());
        assert_eq!(server.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let api_err: ApiError = StoreError::from(io_err).into();
        assert!(matches!(api_err, ApiError::Storage(StoreError::Io(_))));
        assert_eq!(api_err.status(), None);
    }
}
