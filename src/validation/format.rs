//! Aggregation of validation failures into one client-facing message.
//!
//! Failures are reported in field declaration order. Fields without a custom
//! message are grouped into a single "bad value of ..." clause; every field
//! with a message gets its own clause. Clauses are joined with `"; "`.

use std::fmt;

use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use super::descriptor::{Described, FieldDescriptor};
use super::resolver::TagResolverRegistry;
use crate::error::HttpError;

/// One failed rule on one field, with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    name: String,
    code: String,
    message: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
            code: code.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Identifier the validation engine reported the failure under.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// User-facing name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Failing rule, e.g. `required` or `range`.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "`{}` {}", self.name, message),
            None => write!(f, "`{}`", self.name),
        }
    }
}

impl std::error::Error for FieldError {}

/// How many failures a single field may contribute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Only the first failing rule per field.
    #[default]
    FirstPerField,
    /// Every failing rule, in the order the engine reported them.
    EveryRule,
}

/// Caller-supplied replacement for [`default_formatter`].
pub type Formatter<'a> = &'a dyn Fn(&[FieldError]) -> String;

pub struct ValidateParams<'a> {
    pub fields: &'a [FieldDescriptor],
    pub errors: Option<&'a ValidationErrors>,
    pub registry: &'a TagResolverRegistry,
    pub formatter: Option<Formatter<'a>>,
    pub status: StatusCode,
    pub policy: FailurePolicy,
}

impl<'a> ValidateParams<'a> {
    pub fn new(
        fields: &'a [FieldDescriptor],
        errors: Option<&'a ValidationErrors>,
        registry: &'a TagResolverRegistry,
    ) -> Self {
        Self {
            fields,
            errors,
            registry,
            formatter: None,
            status: StatusCode::BAD_REQUEST,
            policy: FailurePolicy::default(),
        }
    }

    /// Params for a [`Described`] type.
    pub fn of<T: Described>(
        errors: Option<&'a ValidationErrors>,
        registry: &'a TagResolverRegistry,
    ) -> Self {
        Self::new(T::fields(), errors, registry)
    }

    pub fn formatter(mut self, formatter: Formatter<'a>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Turns a validation result into an [`HttpError`].
///
/// `None` means there was nothing to report.
pub fn check_errors(params: ValidateParams<'_>) -> Option<HttpError> {
    let fields = field_errors(&params);
    if fields.is_empty() {
        return None;
    }

    let message = match params.formatter {
        Some(formatter) => formatter(&fields),
        None => default_formatter(&fields),
    };

    Some(HttpError::new(params.status, message))
}

/// Resolves every reported failure, ordered by field declaration.
///
/// Failures under names no descriptor declares follow, sorted by name.
pub fn field_errors(params: &ValidateParams<'_>) -> Vec<FieldError> {
    let Some(errors) = params.errors else {
        return Vec::new();
    };

    let reported = errors.field_errors();
    let mut out = Vec::new();

    for descriptor in params.fields {
        let Some(failures) = reported.get(descriptor.name()) else {
            continue;
        };
        let name = params.registry.resolve(descriptor);
        for failure in take(failures, params.policy) {
            let mut item = FieldError::new(descriptor.name(), name.clone(), failure.code.to_string());
            if let Some(message) = descriptor
                .custom_message()
                .map(str::to_owned)
                .or_else(|| failure.message.as_ref().map(|m| m.to_string()))
            {
                item = item.with_message(message);
            }
            out.push(item);
        }
    }

    let mut undeclared: Vec<(String, &Vec<validator::ValidationError>)> = reported
        .iter()
        .map(|(key, failures)| (key.to_string(), *failures))
        .filter(|(key, _)| !params.fields.iter().any(|d| d.name() == key.as_str()))
        .collect();
    undeclared.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, failures) in undeclared {
        let name = key.to_lowercase();
        for failure in take(failures, params.policy) {
            let mut item = FieldError::new(key.clone(), name.clone(), failure.code.to_string());
            if let Some(message) = &failure.message {
                item = item.with_message(message.to_string());
            }
            out.push(item);
        }
    }

    out
}

fn take(
    failures: &[validator::ValidationError],
    policy: FailurePolicy,
) -> &[validator::ValidationError] {
    match policy {
        FailurePolicy::FirstPerField => &failures[..failures.len().min(1)],
        FailurePolicy::EveryRule => failures,
    }
}

/// `bad value of `a`, `b`; `c` message; `d` message`
pub fn default_formatter(fields: &[FieldError]) -> String {
    let bare: Vec<String> = fields
        .iter()
        .filter(|item| item.message().is_none())
        .map(|item| format!("`{}`", item.name()))
        .collect();

    let mut clauses = Vec::with_capacity(fields.len());
    if !bare.is_empty() {
        clauses.push(format!("bad value of {}", bare.join(", ")));
    }
    clauses.extend(
        fields
            .iter()
            .filter(|item| item.message().is_some())
            .map(ToString::to_string),
    );

    clauses.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::descriptor::TagFormat;
    use crate::validation::resolver::SKIP;
    use std::cell::Cell;
    use validator::Validate;

    #[derive(Debug, Default, Validate)]
    struct Sample {
        #[validate(range(min = 1))]
        a: i64,
        #[validate(required)]
        b: Option<i64>,
        c: i64,
        #[validate(required)]
        d: Option<i64>,
        #[validate(required)]
        e: Option<i64>,
        #[validate(required)]
        f: Option<i64>,
        #[validate(required)]
        g: Option<i64>,
        #[validate(required)]
        h: Option<i64>,
    }

    impl Described for Sample {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[
                FieldDescriptor::new("a")
                    .tags(&[(TagFormat::Json, "a_custom")])
                    .message("must be greater than 0"),
                FieldDescriptor::new("b")
                    .tags(&[(TagFormat::Form, "b_custom")])
                    .message("is required"),
                FieldDescriptor::new("c"),
                FieldDescriptor::new("d").tags(&[(TagFormat::Query, "someValue")]),
                FieldDescriptor::new("e").tags(&[
                    (TagFormat::Json, "-"),
                    (TagFormat::Form, "-"),
                    (TagFormat::Query, "-"),
                    (TagFormat::Param, "-"),
                    (TagFormat::Xml, "-"),
                    (TagFormat::Yaml, "-"),
                ]),
                FieldDescriptor::new("f").tags(&[
                    (TagFormat::Json, "-"),
                    (TagFormat::Param, "f_custom"),
                    (TagFormat::Xml, "-"),
                    (TagFormat::Yaml, "-"),
                ]),
                FieldDescriptor::new("g").tags(&[(TagFormat::Xml, "g_custom"), (TagFormat::Yaml, "-")]),
                FieldDescriptor::new("h").tags(&[(TagFormat::Yaml, "h_custom")]),
            ];
            FIELDS
        }
    }

    fn filled() -> Sample {
        Sample {
            a: 1,
            b: Some(1),
            c: 0,
            d: Some(1),
            e: Some(1),
            f: Some(1),
            g: Some(1),
            h: Some(1),
        }
    }

    fn registry() -> TagResolverRegistry {
        let mut registry = TagResolverRegistry::new();
        registry.register(|_: &FieldDescriptor| Some(SKIP.to_string()));
        registry
    }

    fn check(sample: &Sample) -> Option<HttpError> {
        let registry = registry();
        let result = sample.validate();
        check_errors(ValidateParams::of::<Sample>(result.as_ref().err(), &registry))
    }

    #[test]
    fn test_all_fields_failing() {
        let err = check(&Sample {
            a: -1,
            ..Sample::default()
        })
        .expect("validation must fail");

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "bad value of `someValue`, `e`, `f_custom`, `g_custom`, `h_custom`; \
             `a_custom` must be greater than 0; `b_custom` is required"
        );
    }

    #[test]
    fn test_only_a_failing() {
        let err = check(&Sample { a: 0, ..filled() }).expect("a is out of range");
        assert_eq!(err.to_string(), "`a_custom` must be greater than 0");
    }

    #[test]
    fn test_only_b_failing() {
        let err = check(&Sample { b: None, ..filled() }).expect("b is missing");
        assert_eq!(err.to_string(), "`b_custom` is required");
    }

    #[test]
    fn test_only_bare_fields_failing() {
        let err = check(&Sample {
            a: 1,
            b: Some(1),
            ..Sample::default()
        })
        .expect("d..h are missing");
        assert_eq!(
            err.to_string(),
            "bad value of `someValue`, `e`, `f_custom`, `g_custom`, `h_custom`"
        );
    }

    #[test]
    fn test_no_failures() {
        assert!(check(&filled()).is_none());

        let registry = registry();
        assert!(check_errors(ValidateParams::of::<Sample>(None, &registry)).is_none());
    }

    #[test]
    fn test_repeated_formatting_is_identical() {
        let sample = Sample {
            a: -1,
            ..Sample::default()
        };
        let first = check(&sample).map(|e| e.to_string());
        for _ in 0..16 {
            assert_eq!(check(&sample).map(|e| e.to_string()), first);
        }
    }

    #[test]
    fn test_custom_formatter_sees_ordered_failures() {
        let sample = Sample {
            a: -1,
            ..Sample::default()
        };
        let result = sample.validate();
        let registry = registry();
        let calls = Cell::new(0);

        let formatter = |fields: &[FieldError]| {
            calls.set(calls.get() + 1);
            let names: Vec<&str> = fields.iter().map(FieldError::name).collect();
            assert_eq!(
                names,
                ["a_custom", "b_custom", "someValue", "e", "f_custom", "g_custom", "h_custom"]
            );
            assert_eq!(fields[0].code(), "range");
            assert_eq!(fields[1].code(), "required");
            default_formatter(fields)
        };

        let err = check_errors(
            ValidateParams::of::<Sample>(result.as_ref().err(), &registry).formatter(&formatter),
        )
        .expect("validation must fail");

        assert_eq!(calls.get(), 1);
        assert_eq!(
            err.to_string(),
            "bad value of `someValue`, `e`, `f_custom`, `g_custom`, `h_custom`; \
             `a_custom` must be greater than 0; `b_custom` is required"
        );
    }

    #[test]
    fn test_caller_status_is_kept() {
        let result = Sample { b: None, ..filled() }.validate();
        let registry = registry();
        let err = check_errors(
            ValidateParams::of::<Sample>(result.as_ref().err(), &registry)
                .status(StatusCode::UNPROCESSABLE_ENTITY),
        )
        .expect("b is missing");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[derive(Debug, Validate)]
    struct Named {
        #[validate(length(min = 3), email)]
        contact: String,
    }

    impl Described for Named {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] =
                &[FieldDescriptor::new("contact").tags(&[(TagFormat::Json, "contact,omitempty")])];
            FIELDS
        }
    }

    #[test]
    fn test_failure_policy() {
        let result = Named {
            contact: "x".to_string(),
        }
        .validate();
        let errors = result.as_ref().err();
        let registry = TagResolverRegistry::new();

        let first = field_errors(&ValidateParams::of::<Named>(errors, &registry));
        assert_eq!(first.len(), 1);

        let every = field_errors(
            &ValidateParams::of::<Named>(errors, &registry).policy(FailurePolicy::EveryRule),
        );
        assert_eq!(every.len(), 2);
        assert!(every.iter().all(|item| item.name() == "contact"));
        assert_eq!(default_formatter(&every), "bad value of `contact`, `contact`");
    }

    #[test]
    fn test_engine_message_is_used_without_descriptor_message() {
        #[derive(Debug, Validate)]
        struct Port {
            #[validate(range(min = 1, max = 65535, message = "must be a valid port"))]
            port: u32,
        }

        impl Described for Port {
            fn fields() -> &'static [FieldDescriptor] {
                const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new("port")];
                FIELDS
            }
        }

        let result = Port { port: 0 }.validate();
        let registry = TagResolverRegistry::new();
        let err = check_errors(ValidateParams::of::<Port>(result.as_ref().err(), &registry))
            .expect("port is out of range");
        assert_eq!(err.to_string(), "`port` must be a valid port");
    }

    fn some_rule(value: &str) -> Result<(), validator::ValidationError> {
        if value.starts_with("some") {
            Ok(())
        } else {
            Err(validator::ValidationError::new("some"))
        }
    }

    #[derive(Debug, Validate)]
    struct Ruled {
        #[validate(required, custom(function = "some_rule"))]
        a: Option<String>,
    }

    impl Described for Ruled {
        fn fields() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new("a")
                .tags(&[(TagFormat::Json, "a")])
                .message("some error")];
            FIELDS
        }
    }

    fn check_ruled(a: Option<&str>) -> Option<HttpError> {
        let ruled = Ruled {
            a: a.map(str::to_owned),
        };
        let result = ruled.validate();
        let registry = TagResolverRegistry::new();
        check_errors(ValidateParams::of::<Ruled>(result.as_ref().err(), &registry))
    }

    #[test]
    fn test_custom_rule_reported_with_field_message() {
        let missing = check_ruled(None).expect("a is required");
        assert_eq!(missing.to_string(), "`a` some error");

        let broken = check_ruled(Some("other")).expect("custom rule fails");
        assert_eq!(broken.to_string(), "`a` some error");
        assert_eq!(broken.status(), StatusCode::BAD_REQUEST);

        assert!(check_ruled(Some("something")).is_none());
    }

    #[test]
    fn test_custom_rule_code_is_kept() {
        let ruled = Ruled {
            a: Some("other".to_string()),
        };
        let result = ruled.validate();
        let registry = TagResolverRegistry::new();
        let items = field_errors(&ValidateParams::of::<Ruled>(result.as_ref().err(), &registry));

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code(), "some");
        assert_eq!(items[0].message(), Some("some error"));
    }

    #[test]
    fn test_undeclared_failures_are_appended_sorted() {
        let mut errors = ValidationErrors::new();
        errors.add("zeta", validator::ValidationError::new("custom"));
        errors.add("a", validator::ValidationError::new("range"));
        errors.add("Alpha", validator::ValidationError::new("custom"));

        let registry = TagResolverRegistry::new();
        let names: Vec<String> = field_errors(&ValidateParams::of::<Sample>(Some(&errors), &registry))
            .iter()
            .map(|item| item.name().to_string())
            .collect();

        assert_eq!(names, ["a_custom", "alpha", "zeta"]);
    }

    #[test]
    fn test_field_error_display() {
        let bare = FieldError::new("d", "someValue", "required");
        assert_eq!(bare.to_string(), "`someValue`");
        let with_message = bare.clone().with_message("is required");
        assert_eq!(with_message.to_string(), "`someValue` is required");
    }
}
