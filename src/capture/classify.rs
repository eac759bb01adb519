//! Error classification.
//!
//! Categories are checked in a fixed precedence order, each against the
//! whole source chain of the error:
//!
//! 1. JSON decode failures
//! 2. XML decode failures
//! 3. self-describing errors ([`CustomError`])
//! 4. status-carrying errors ([`HttpError`])
//! 5. anything else: 400 with the standard reason phrase, never the error text

use std::error::Error as StdError;

use actix_web::{error::JsonPayloadError, http::StatusCode};

use super::decode::DecodeError;
use crate::error::{ApiError, CustomError, HttpError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    JsonDecode,
    XmlDecode,
    SelfDescribing,
    Status,
    /// An actix error of a type this crate does not know; keeps its status.
    Framework,
    Unknown,
}

/// The response an error implies.
#[derive(Debug)]
pub enum Classified<'e> {
    /// Status and plain-text body decided by the classifier.
    Reply {
        kind: ErrorKind,
        status: StatusCode,
        body: String,
    },
    /// The error renders itself; the classifier has no say over the body.
    Delegate(&'e CustomError),
}

impl Classified<'_> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Classified::Reply { kind, .. } => *kind,
            Classified::Delegate(_) => ErrorKind::SelfDescribing,
        }
    }

    fn reply(kind: ErrorKind, status: StatusCode, body: impl Into<String>) -> Self {
        Classified::Reply {
            kind,
            status,
            body: body.into(),
        }
    }

    fn unknown() -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self::reply(
            ErrorKind::Unknown,
            status,
            status.canonical_reason().unwrap_or_default(),
        )
    }
}

fn chain<'e>(
    err: &'e (dyn StdError + 'static),
) -> impl Iterator<Item = &'e (dyn StdError + 'static)> + Clone {
    std::iter::successors(Some(err), |&link| link.source())
}

fn json_decode(link: &(dyn StdError + 'static)) -> Option<DecodeError> {
    if let Some(decoded) = link.downcast_ref::<DecodeError>() {
        return decoded.is_json().then(|| decoded.clone());
    }
    link.downcast_ref::<serde_json::Error>()
        .and_then(|err| DecodeError::from_json(err, None))
}

fn xml_decode(link: &(dyn StdError + 'static)) -> Option<DecodeError> {
    if let Some(decoded) = link.downcast_ref::<DecodeError>() {
        return (!decoded.is_json()).then(|| decoded.clone());
    }
    link.downcast_ref::<quick_xml::DeError>()
        .and_then(|err| DecodeError::from_xml(err, None))
}

/// Classifies an arbitrary error by walking its source chain.
pub fn classify<'e>(err: &'e (dyn StdError + 'static)) -> Classified<'e> {
    let links = chain(err);

    let decoded = links
        .clone()
        .find_map(json_decode)
        .or_else(|| links.clone().find_map(xml_decode));
    if let Some(decoded) = decoded {
        let kind = if decoded.is_json() {
            ErrorKind::JsonDecode
        } else {
            ErrorKind::XmlDecode
        };
        return Classified::reply(kind, StatusCode::BAD_REQUEST, decoded.to_string());
    }

    if let Some(custom) = links.clone().find_map(|link| link.downcast_ref::<CustomError>()) {
        return Classified::Delegate(custom);
    }

    if let Some(http) = links.clone().find_map(|link| link.downcast_ref::<HttpError>()) {
        return Classified::reply(ErrorKind::Status, http.status(), http.message());
    }

    Classified::unknown()
}

/// Classifies an error surfaced by actix, either from a handler or from one
/// of the framework's own extractors.
///
/// Framework errors that are none of the known categories keep the status
/// actix assigned them, but the body is only the reason phrase.
pub fn classify_actix(err: &actix_web::Error) -> Classified<'_> {
    if let Some(api) = err.as_error::<ApiError>() {
        return classify(api);
    }
    if let Some(http) = err.as_error::<HttpError>() {
        return classify(http);
    }
    if let Some(custom) = err.as_error::<CustomError>() {
        return classify(custom);
    }
    if let Some(JsonPayloadError::Deserialize(json)) = err.as_error::<JsonPayloadError>() {
        return classify(json);
    }

    let status = err.as_response_error().status_code();
    Classified::reply(
        ErrorKind::Framework,
        status,
        status.canonical_reason().unwrap_or_default(),
    )
}
