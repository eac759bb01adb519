//! Validation failure reporting: display-name resolution and message
//! aggregation over the failures produced by the `validator` crate.

pub mod descriptor;
pub mod format;
pub mod resolver;

pub use descriptor::{Described, FieldDescriptor, TagFormat};
pub use format::{
    check_errors, default_formatter, field_errors, FailurePolicy, FieldError, Formatter,
    ValidateParams,
};
pub use resolver::{FormatTag, TagParser, TagResolverRegistry, SKIP};
