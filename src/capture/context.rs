//! The response-writing side of a request, as seen by the capture engine.

use std::io::{self, Write};

use actix_web::{http::header, http::StatusCode, HttpResponse};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("response already committed")]
    Committed,

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("response encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Somewhere a single response can be written to.
pub trait ResponseContext {
    /// Writes status, content type and body in one go.
    fn write(&mut self, status: StatusCode, content_type: &str, body: &[u8]) -> Result<(), WriteError>;

    /// Whether a status has already been sent.
    fn committed(&self) -> bool;

    fn string(&mut self, status: StatusCode, body: &str) -> Result<(), WriteError> {
        self.write(status, TEXT_PLAIN, body.as_bytes())
    }

    fn json(&mut self, status: StatusCode, value: &serde_json::Value) -> Result<(), WriteError> {
        let body = serde_json::to_vec(value)?;
        self.write(status, APPLICATION_JSON, &body)
    }
}

/// In-memory response, later turned into an actix `HttpResponse`.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// An unwritten buffer becomes an empty 500.
    pub fn into_http_response(self) -> HttpResponse {
        let Some(status) = self.status else {
            return HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
        };

        let mut builder = HttpResponse::build(status);
        if let Some(content_type) = self.content_type {
            builder.insert_header((header::CONTENT_TYPE, content_type));
        }
        builder.body(self.body)
    }
}

impl ResponseContext for BufferedResponse {
    fn write(&mut self, status: StatusCode, content_type: &str, body: &[u8]) -> Result<(), WriteError> {
        if self.committed() {
            return Err(WriteError::Committed);
        }
        self.status = Some(status);
        self.content_type = Some(content_type.to_owned());
        self.body.extend_from_slice(body);
        Ok(())
    }

    fn committed(&self) -> bool {
        self.status.is_some()
    }
}

/// Streams the body into any `io::Write` sink.
///
/// The status counts as sent before the body is written, so a failing sink
/// leaves the response committed with nothing delivered.
#[derive(Debug)]
pub struct WriterResponse<W> {
    writer: W,
    status: Option<StatusCode>,
    size: u64,
}

impl<W: Write> WriterResponse<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            status: None,
            size: 0,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Bytes successfully delivered.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResponseContext for WriterResponse<W> {
    fn write(&mut self, status: StatusCode, _content_type: &str, body: &[u8]) -> Result<(), WriteError> {
        if self.committed() {
            return Err(WriteError::Committed);
        }
        self.status = Some(status);
        self.writer.write_all(body)?;
        self.writer.flush()?;
        self.size += body.len() as u64;
        Ok(())
    }

    fn committed(&self) -> bool {
        self.status.is_some()
    }
}
