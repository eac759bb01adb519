//! Request body decoding for the JSON and XML exchange formats.
//!
//! Decoder errors are normalised into [`DecodeError`], whose `Display` is the
//! exact text sent to the client.

use std::fmt;

use quick_xml::events::Event;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::{ApiError, HttpError};

/// Where in the input a decoder gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Bytes read before the error.
    Byte(usize),
    /// Only line and column are known (the input was not available).
    LineColumn { line: usize, column: usize },
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Byte(offset) => write!(f, "{}", offset),
            Offset::LineColumn { line, column } => write!(f, "{}:{}", line, column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("JSON parse error: expected={expected} gotten={offset}")]
    JsonType { expected: String, offset: Offset },

    #[error("JSON parse error: offset={offset}")]
    JsonSyntax { offset: Offset },

    #[error("XML parse error: type={type_name}")]
    XmlType { type_name: String },

    #[error("XML parse error: line={line}")]
    XmlSyntax { line: usize },
}

impl DecodeError {
    /// Normalises a `serde_json` error. With the raw `input` the offset is a
    /// byte offset, otherwise line and column.
    ///
    /// Only syntax errors and type mismatches are decode errors; a missing
    /// field or a custom deserializer message gives `None`.
    pub fn from_json(err: &serde_json::Error, input: Option<&[u8]>) -> Option<Self> {
        let offset = match input {
            Some(input) => Offset::Byte(byte_offset(input, err.line(), err.column())),
            None => Offset::LineColumn {
                line: err.line(),
                column: err.column(),
            },
        };

        match err.classify() {
            Category::Data => expected_type(err).map(|expected| DecodeError::JsonType { expected, offset }),
            Category::Syntax | Category::Eof | Category::Io => Some(DecodeError::JsonSyntax { offset }),
        }
    }

    /// Same as [`DecodeError::from_json`] for `quick-xml`. Value parse
    /// failures (`InvalidInt` and friends) are not decode errors.
    pub fn from_xml(err: &quick_xml::DeError, input: Option<&[u8]>) -> Option<Self> {
        use quick_xml::DeError;

        match err {
            DeError::Unsupported(type_name) => Some(DecodeError::XmlType {
                type_name: type_name.to_string(),
            }),
            DeError::UnexpectedEof => Some(DecodeError::XmlSyntax {
                line: input.map(line_count).unwrap_or_default(),
            }),
            DeError::InvalidXml(_) => Some(DecodeError::XmlSyntax { line: 0 }),
            _ => None,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, DecodeError::JsonType { .. } | DecodeError::JsonSyntax { .. })
    }
}

/// `serde_json` only reports its expectation inside the message text:
/// "invalid type: string \"x\", expected u32 at line 1 column 9".
/// Messages that are not a type or value mismatch give `None`.
fn expected_type(err: &serde_json::Error) -> Option<String> {
    let text = err.to_string();
    if !(text.starts_with("invalid type: ") || text.starts_with("invalid value: ")) {
        return None;
    }
    let message = match text.rsplit_once(" at line ") {
        Some((message, _)) if err.line() > 0 => message,
        _ => text.as_str(),
    };
    message
        .split_once(", expected ")
        .map(|(_, expected)| expected.to_owned())
}

/// Converts a 1-based line/column pair into the number of bytes consumed.
fn byte_offset(input: &[u8], line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = input
        .split(|b| *b == b'\n')
        .take(line - 1)
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column).min(input.len())
}

fn line_at(input: &[u8], position: usize) -> usize {
    let end = position.min(input.len());
    input[..end].iter().filter(|b| **b == b'\n').count() + 1
}

fn line_count(input: &[u8]) -> usize {
    line_at(input, input.len())
}

/// Decodes a JSON body. Failures that are not decode errors become a 400
/// carrying the decoder message.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| match DecodeError::from_json(&err, Some(body)) {
        Some(decoded) => ApiError::Decode(decoded),
        None => HttpError::bad_request(err.to_string()).into(),
    })
}

/// Well-formedness is checked first so syntax errors carry a line number.
pub fn decode_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let mut reader = quick_xml::Reader::from_reader(body);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(_) => buf.clear(),
            Err(_) => {
                let position = reader.buffer_position();
                return Err(DecodeError::XmlSyntax {
                    line: line_at(body, position),
                }
                .into());
            }
        }
    }

    quick_xml::de::from_reader(body).map_err(|err| match DecodeError::from_xml(&err, Some(body)) {
        Some(decoded) => ApiError::Decode(decoded),
        None => HttpError::bad_request(err.to_string()).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Payload {
        count: u32,
    }

    fn decode_error(err: ApiError) -> DecodeError {
        match err {
            ApiError::Decode(decoded) => decoded,
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_type_mismatch() {
        let err = decode_error(decode_json::<Payload>(br#"{"count": "many"}"#).unwrap_err());
        let text = err.to_string();
        assert!(text.starts_with("JSON parse error: expected="), "{text}");
        assert!(text.contains("u32"), "{text}");
        assert!(matches!(err, DecodeError::JsonType { offset: Offset::Byte(_), .. }));
    }

    #[test]
    fn test_json_out_of_range_value_is_a_type_mismatch() {
        let err = decode_error(decode_json::<Payload>(br#"{"count": -1}"#).unwrap_err());
        assert!(err.to_string().starts_with("JSON parse error: expected="));
    }

    #[test]
    fn test_json_missing_field_is_not_a_type_mismatch() {
        let err = decode_json::<Payload>(b"{}").unwrap_err();
        match err {
            ApiError::Http(http) => {
                assert_eq!(http.status(), actix_web::http::StatusCode::BAD_REQUEST);
                assert!(http.message().contains("missing field `count`"), "{http}");
            }
            other => panic!("unexpected {other:?}"),
        }

        let raw = serde_json::from_str::<Payload>("{}").unwrap_err();
        assert_eq!(DecodeError::from_json(&raw, None), None);
    }

    #[test]
    fn test_json_syntax_offset() {
        let body = b"{\n  \"count\": 1,,\n}";
        let err = decode_error(decode_json::<Payload>(body).unwrap_err());
        assert!(err.to_string().starts_with("JSON parse error: offset="));
        match err {
            DecodeError::JsonSyntax {
                offset: Offset::Byte(offset),
            } => assert!(offset > 2 && offset <= body.len()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_json_without_input_reports_line_column() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let decoded = DecodeError::from_json(&err, None);
        assert!(matches!(
            decoded,
            Some(DecodeError::JsonSyntax {
                offset: Offset::LineColumn { line: 1, .. }
            })
        ));
    }

    #[test]
    fn test_xml_mismatched_tags_report_line() {
        let body = b"<Payload>\n<count>1</count>\n</Other>";
        let err = decode_error(decode_xml::<Payload>(body).unwrap_err());
        assert_eq!(err, DecodeError::XmlSyntax { line: 3 });
        assert_eq!(err.to_string(), "XML parse error: line=3");
    }

    #[test]
    fn test_xml_unparsable_value_is_not_a_type_error() {
        let err = decode_xml::<Payload>(b"<Payload><count>many</count></Payload>").unwrap_err();
        match err {
            ApiError::Http(http) => assert_eq!(http.status(), actix_web::http::StatusCode::BAD_REQUEST),
            other => panic!("unexpected {other:?}"),
        }

        let invalid = quick_xml::DeError::InvalidInt("many".parse::<u32>().unwrap_err());
        assert_eq!(DecodeError::from_xml(&invalid, None), None);
    }

    #[test]
    fn test_xml_unsupported_type() {
        let err = quick_xml::DeError::Unsupported("map".into());
        assert_eq!(
            DecodeError::from_xml(&err, None).map(|decoded| decoded.to_string()),
            Some("XML parse error: type=map".to_string())
        );
    }

    #[test]
    fn test_decodes_valid_bodies() {
        assert_eq!(decode_json::<Payload>(br#"{"count": 3}"#).unwrap().count, 3);
        assert_eq!(
            decode_xml::<Payload>(b"<Payload><count>4</count></Payload>")
                .unwrap()
                .count,
            4
        );
    }
}
