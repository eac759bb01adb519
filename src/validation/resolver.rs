//! Field display-name resolution.
//!
//! A field's user-facing name comes from the first parser that yields a
//! usable name: registered custom parsers first (in registration order), then
//! the built-in per-format parsers in [`TagFormat::PRIORITY`] order. When every
//! source is absent or suppressed, the lowercase field identifier is used.

use std::fmt;

use super::descriptor::{FieldDescriptor, TagFormat};

/// Tag value meaning "not exposed under this format".
pub const SKIP: &str = "-";

/// Maps a field's declared tags to a display name.
///
/// Returning `None`, an empty string, or [`SKIP`] defers to the next parser.
pub trait TagParser: Send + Sync {
    fn parse(&self, field: &FieldDescriptor) -> Option<String>;
}

impl<F> TagParser for F
where
    F: Fn(&FieldDescriptor) -> Option<String> + Send + Sync,
{
    fn parse(&self, field: &FieldDescriptor) -> Option<String> {
        self(field)
    }
}

/// Built-in parser for a single exchange format.
///
/// Only the part before the first comma is the name (`"id,omitempty"` -> `id`).
#[derive(Debug, Clone, Copy)]
pub struct FormatTag(pub TagFormat);

impl TagParser for FormatTag {
    fn parse(&self, field: &FieldDescriptor) -> Option<String> {
        let raw = field.tag(self.0)?;
        let name = raw.split(',').next().unwrap_or_default().trim();
        usable(name).map(str::to_owned)
    }
}

fn usable(name: &str) -> Option<&str> {
    if name.is_empty() || name == SKIP {
        None
    } else {
        Some(name)
    }
}

/// Ordered set of custom tag parsers.
///
/// Registration takes `&mut self`, so once the registry is shared behind an
/// `Arc` it is read-only for the rest of the process.
#[derive(Default)]
pub struct TagResolverRegistry {
    custom: Vec<Box<dyn TagParser>>,
}

impl TagResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, parser: P) -> &mut Self
    where
        P: TagParser + 'static,
    {
        self.custom.push(Box::new(parser));
        self
    }

    pub fn len(&self) -> usize {
        self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }

    pub fn resolve(&self, field: &FieldDescriptor) -> String {
        let custom = self.custom.iter().filter_map(|parser| parser.parse(field));
        let builtin = TagFormat::PRIORITY
            .iter()
            .filter_map(|format| FormatTag(*format).parse(field));

        custom
            .chain(builtin)
            .find(|name| usable(name).is_some())
            .unwrap_or_else(|| field.name().to_lowercase())
    }
}

impl fmt::Debug for TagResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagResolverRegistry")
            .field("custom_parsers", &self.custom.len())
            .finish()
    }
}
