//! # Error Capture
//!
//! Turns any error a request produced into a response, and never fails
//! doing so. Every write is checked; when the response channel itself is
//! broken the failure is logged instead of propagated.
//!
//! Log markers:
//! - `Capture error`: a self-describing error refused to render, or a write failed
//! - `Request error`: a status-carrying error with a 5xx status
//! - `Unknown error`: an unclassified error (only in debug mode)

pub mod classify;
pub mod context;
pub mod decode;

use std::error::Error as StdError;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse};
use tracing::{debug, error, warn};

pub use classify::{classify, classify_actix, Classified, ErrorKind};
pub use context::{BufferedResponse, ResponseContext, WriteError, WriterResponse};
pub use decode::{DecodeError, Offset};

/// The centralized error sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capture {
    debug: bool,
}

impl Capture {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Classifies `err` and writes the implied response to `ctx`.
    pub fn capture_error(&self, err: &(dyn StdError + 'static), ctx: &mut dyn ResponseContext) {
        self.respond(classify(err), &err, ctx);
    }

    /// Same as [`Capture::capture_error`] for errors surfaced by actix.
    pub fn capture_actix(&self, err: &actix_web::Error, ctx: &mut dyn ResponseContext) {
        self.respond(classify_actix(err), &err, ctx);
    }

    /// Builds the response for an actix error.
    pub fn response_for(&self, err: &actix_web::Error) -> HttpResponse {
        let mut ctx = BufferedResponse::new();
        self.capture_actix(err, &mut ctx);
        ctx.into_http_response()
    }

    fn respond(&self, classified: Classified<'_>, cause: &dyn fmt::Display, ctx: &mut dyn ResponseContext) {
        match classified {
            Classified::Delegate(custom) => {
                if let Err(failure) = custom.format_response(ctx) {
                    declined(cause, &failure);
                }
            }
            Classified::Reply { kind, status, body } => {
                match kind {
                    ErrorKind::Status | ErrorKind::Framework if status.is_server_error() => {
                        error!(status = status.as_u16(), error = %cause, "Request error");
                    }
                    ErrorKind::Framework => {
                        debug!(status = status.as_u16(), error = %cause, "Framework error");
                    }
                    ErrorKind::Unknown if self.debug => {
                        warn!(error = %cause, "Unknown error");
                    }
                    _ => {}
                }
                emit(ctx, status, &body, cause);
            }
        }
    }
}

/// Writes a plain-text reply; a failed write is logged and swallowed.
pub fn emit(ctx: &mut dyn ResponseContext, status: StatusCode, body: &str, cause: &dyn fmt::Display) {
    if let Err(failure) = ctx.string(status, body) {
        error!(error = %cause, failure = %failure, "Capture error");
    }
}

/// A self-describing error refused to render.
pub(crate) fn declined(cause: &dyn fmt::Display, failure: &dyn fmt::Display) {
    error!(error = %cause, failure = %failure, "Capture error");
}

/// Left in the extensions of a response whose self-describing error refused
/// to render, so the capture middleware can report it without rendering again.
#[derive(Debug, Clone)]
pub(crate) struct RenderFailure(pub(crate) String);

/// Log-free rendering used by `ResponseError` impls. Self-describing errors
/// are rendered here exactly once; the capture middleware keeps the result.
pub(crate) fn render(err: &(dyn StdError + 'static)) -> HttpResponse {
    let mut ctx = BufferedResponse::new();
    let written = match classify(err) {
        Classified::Delegate(custom) => custom
            .format_response(&mut ctx)
            .map_err(|failure| failure.to_string()),
        Classified::Reply { status, body, .. } => {
            ctx.string(status, &body).map_err(|failure| failure.to_string())
        }
    };
    if let Err(failure) = written {
        let mut response = HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
        response.extensions_mut().insert(RenderFailure(failure));
        return response;
    }
    ctx.into_http_response()
}
