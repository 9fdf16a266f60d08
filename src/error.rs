//! Classified error taxonomy shared by the fetch layer and route handlers.
//!
//! # Kinds
//! - `Network`: transport failure before a response arrived, always retryable
//! - `HttpStatus`: a response with a failing status code
//! - `Parse`: the response body was not valid JSON
//! - `Validation`: caller input failed a precondition
//! - `Authentication`: no session, or an invalid one
//!
//! Callers branch on [`ClassifiedError::kind`] rather than on variant shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Boxed cause carried by every classified error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant of a [`ClassifiedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    HttpStatus,
    Parse,
    Validation,
    Authentication,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure tagged with the kind used to decide retry and propagation.
#[derive(Debug, Error)]
pub enum ClassifiedError {
    #[error("{message}")]
    Network {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    HttpStatus {
        status: u16,
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    Parse {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    Authentication {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },
}

impl ClassifiedError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, new_code: impl Into<String>) -> Self {
        let slot = match &mut self {
            Self::Network { code, .. }
            | Self::HttpStatus { code, .. }
            | Self::Parse { code, .. }
            | Self::Validation { code, .. }
            | Self::Authentication { code, .. } => code,
        };
        *slot = Some(new_code.into());
        self
    }

    /// Attach the original cause.
    pub fn with_source<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let slot = match &mut self {
            Self::Network { source, .. }
            | Self::HttpStatus { source, .. }
            | Self::Parse { source, .. }
            | Self::Validation { source, .. }
            | Self::Authentication { source, .. } => source,
        };
        *slot = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::HttpStatus { message, .. }
            | Self::Parse { message, .. }
            | Self::Validation { message, .. }
            | Self::Authentication { message, .. } => message,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network { code, .. }
            | Self::HttpStatus { code, .. }
            | Self::Parse { code, .. }
            | Self::Validation { code, .. }
            | Self::Authentication { code, .. } => code.as_deref(),
        }
    }

    /// Status code carried by an `HttpStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status used when the error is surfaced to an HTTP client.
    pub fn http_status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::HttpStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Network { .. } | Self::Parse { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for ClassifiedError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            "TIMEOUT"
        } else if e.is_connect() {
            "CONNECT"
        } else if e.is_builder() {
            "REQUEST_BUILD"
        } else {
            "TRANSPORT"
        };

        if e.is_builder() {
            return Self::validation(format!("Invalid request: {}", e))
                .with_code(code)
                .with_source(e);
        }

        Self::network(format!("Network request failed: {}", e))
            .with_code(code)
            .with_source(e)
    }
}

/// JSON body returned to clients for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        let status = self.http_status_code();
        // Server-side kinds get a generic message; their detail goes to the log.
        let message = match self.kind() {
            ErrorKind::Validation | ErrorKind::Authentication | ErrorKind::HttpStatus => {
                self.message().to_string()
            }
            ErrorKind::Network | ErrorKind::Parse => {
                tracing::warn!(kind = %self.kind(), error = %self, "Upstream failure");
                "Upstream request failed".to_string()
            }
        };
        (status, Json(ErrorEnvelope { error: message })).into_response()
    }
}
