//! # Error Types
//!
//! The error values request handlers produce, grouped by how the capture
//! engine treats them:
//!
//! - [`HttpError`]: carries its own status and a client-safe message.
//! - [`CustomError`]: wraps any [`FormatResponse`] implementor, an error that
//!   writes its own response.
//! - [`ApiError`]: the handler-facing enum that gathers decode failures, the
//!   two kinds above, and anything else (which the client never sees verbatim).
//!
//! All of them implement `actix_web::ResponseError`, so a handler returning
//! them still gets a sensible response when the capture middleware is not
//! installed. With the middleware installed it adds the logging, and replaces
//! every response except a self-describing one, which renders only once.

use std::error::Error as StdError;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::capture::{self, decode::DecodeError, ResponseContext};

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An error that already knows the HTTP status and message to answer with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Error whose message is the standard reason phrase of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        capture::render(self)
    }
}

/// An error able to write its own response.
///
/// Returning `Err` means the error declined (or failed) to render; the
/// capture engine then logs it and writes nothing.
pub trait FormatResponse: StdError {
    fn format_response(&self, ctx: &mut dyn ResponseContext) -> Result<(), BoxError>;
}

/// Type-erased [`FormatResponse`] so the classifier can find it by downcast.
#[derive(Debug)]
pub struct CustomError(Box<dyn FormatResponse + Send + Sync>);

impl CustomError {
    pub fn new<E>(error: E) -> Self
    where
        E: FormatResponse + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }

    pub fn format_response(&self, ctx: &mut dyn ResponseContext) -> Result<(), BoxError> {
        self.0.format_response(ctx)
    }
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for CustomError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl ResponseError for CustomError {
    fn error_response(&self) -> HttpResponse {
        capture::render(self)
    }
}

/// Error type for request handlers and extractors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("{0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("{0}")]
    Custom(#[from] CustomError),

    #[error("{0}")]
    Http(#[from] HttpError),

    #[error("{0}")]
    Other(#[from] BoxError),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Other(err.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match capture::classify(self) {
            capture::Classified::Reply { status, .. } => status,
            capture::Classified::Delegate(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        capture::render(self)
    }
}

/// Shorthand for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
