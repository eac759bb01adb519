//! # Field Descriptors
//!
//! Rust has no runtime struct tags, so every type that takes part in
//! validation reporting declares its field metadata explicitly through the
//! [`Described`] trait. A descriptor lists the serialization names a field is
//! exposed under (one per exchange format) plus an optional human message.
//!
//! Descriptors are `const`-constructible so a type can keep them in a
//! `static` slice:
//!
//! ```rust
//! use http_error_capture::validation::{Described, FieldDescriptor, TagFormat};
//!
//! struct Login {
//!     user_name: String,
//! }
//!
//! impl Described for Login {
//!     fn fields() -> &'static [FieldDescriptor] {
//!         const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new("user_name")
//!             .tags(&[(TagFormat::Json, "userName")])
//!             .message("is required")];
//!         FIELDS
//!     }
//! }
//! ```

use std::fmt;

/// A serialization family with its own field naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFormat {
    Json,
    Query,
    Form,
    Param,
    Xml,
    Yaml,
}

impl TagFormat {
    /// Built-in resolution order: primary exchange format, then the request
    /// parameter families, then the secondary exchange formats.
    pub const PRIORITY: [TagFormat; 6] = [
        TagFormat::Json,
        TagFormat::Query,
        TagFormat::Form,
        TagFormat::Param,
        TagFormat::Xml,
        TagFormat::Yaml,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            TagFormat::Json => "json",
            TagFormat::Query => "query",
            TagFormat::Form => "form",
            TagFormat::Param => "param",
            TagFormat::Xml => "xml",
            TagFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Static metadata for one struct field.
///
/// `name` must match the key the validation engine reports failures under,
/// which for `validator` derives is the Rust field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: &'static str,
    tags: &'static [(TagFormat, &'static str)],
    message: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            tags: &[],
            message: None,
        }
    }

    /// Raw tag strings per format, e.g. `(TagFormat::Json, "id,omitempty")`.
    pub const fn tags(mut self, tags: &'static [(TagFormat, &'static str)]) -> Self {
        self.tags = tags;
        self
    }

    pub const fn message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw tag for `format`, if the field declares one.
    pub fn tag(&self, format: TagFormat) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(declared, _)| *declared == format)
            .map(|(_, raw)| *raw)
    }

    pub fn declared_tags(&self) -> &'static [(TagFormat, &'static str)] {
        self.tags
    }

    pub fn custom_message(&self) -> Option<&'static str> {
        self.message
    }
}

/// Types whose validation failures can be reported with user-facing names.
pub trait Described {
    /// Field metadata in declaration order.
    fn fields() -> &'static [FieldDescriptor];
}
