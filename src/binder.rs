//! # Request Binding
//!
//! [`Valid<T>`] decodes a request into `T` and validates it in one step.
//!
//! - GET, DELETE and HEAD read the query string
//! - every other method reads the body, picked by `Content-Type`: JSON, XML
//!   or urlencoded form; anything else is answered with 415
//!
//! Decode failures carry the byte offset (JSON) or line (XML) of the problem.
//! Validation failures are aggregated into a single [`HttpError`] using the
//! [`Engine`] registered as app data, or a default one when none is.

use std::ops::Deref;

use actix_web::{
    dev::Payload,
    http::{Method, StatusCode},
    web, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::capture::decode::{decode_json, decode_xml};
use crate::engine::Engine;
use crate::error::{ApiError, HttpError};
use crate::validation::Described;

/// Body encodings the binder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
    Form,
}

impl BodyFormat {
    /// Maps a media type (parameters already stripped) to a body format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "application/x-www-form-urlencoded" => Some(Self::Form),
            other if other.ends_with("+json") => Some(Self::Json),
            other if other.ends_with("+xml") => Some(Self::Xml),
            _ => None,
        }
    }
}

fn reads_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::DELETE | Method::HEAD)
}

fn decode_form<T: DeserializeOwned>(input: &[u8]) -> Result<T, ApiError> {
    serde_urlencoded::from_bytes(input).map_err(|err| HttpError::bad_request(err.to_string()).into())
}

/// Decodes `body` according to the request's content type.
pub fn decode_body<T: DeserializeOwned>(content_type: &str, body: &[u8]) -> Result<T, ApiError> {
    match BodyFormat::from_content_type(content_type) {
        Some(BodyFormat::Json) => decode_json(body),
        Some(BodyFormat::Xml) => decode_xml(body),
        Some(BodyFormat::Form) => decode_form(body),
        None => Err(HttpError::from_status(StatusCode::UNSUPPORTED_MEDIA_TYPE).into()),
    }
}

/// Runs the validation rules of `value`, reporting failures through `engine`.
pub fn validate<T: Validate + Described>(engine: &Engine, value: T) -> Result<T, HttpError> {
    let Err(errors) = value.validate() else {
        return Ok(value);
    };

    let err = engine
        .check::<T>(Some(&errors))
        .unwrap_or_else(|| HttpError::new(engine.status(), errors.to_string()));
    debug!(error = %err, "Validation failed");
    Err(err)
}

/// Extractor for a decoded and validated `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> FromRequest for Valid<T>
where
    T: DeserializeOwned + Validate + Described + 'static,
{
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let engine = req
            .app_data::<web::Data<Engine>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();

        if reads_query(req.method()) {
            let decoded = decode_form::<T>(req.query_string().as_bytes());
            return Box::pin(async move { Ok(Valid(validate(&engine, decoded?)?)) });
        }

        let content_type = req.content_type().to_string();
        let body = web::Bytes::from_request(req, payload);

        Box::pin(async move {
            let bytes = body.await.map_err(|err| {
                HttpError::new(err.as_response_error().status_code(), err.to_string())
            })?;
            let decoded = decode_body::<T>(&content_type, &bytes)?;
            Ok(Valid(validate(&engine, decoded)?))
        })
    }
}
