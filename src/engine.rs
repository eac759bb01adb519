//! # Engine
//!
//! Bundles the already-resolved settings the capture and validation layers
//! need (debug flag, tag-parser registry, failure policy, validation status,
//! body limit) and hands them to actix as app data and middleware.

use std::sync::Arc;

use actix_web::{http::StatusCode, web};
use validator::ValidationErrors;

use crate::capture::Capture;
use crate::config::AppConfig;
use crate::error::HttpError;
use crate::middleware::CaptureErrors;
use crate::validation::{check_errors, Described, FailurePolicy, TagResolverRegistry, ValidateParams};

pub const DEFAULT_BODY_LIMIT: usize = 256 * 1024;

/// Optional collaborators; anything left out gets a default.
#[derive(Debug)]
pub struct EngineParams {
    pub debug: bool,
    pub registry: Option<TagResolverRegistry>,
    pub policy: FailurePolicy,
    pub status: StatusCode,
    pub body_limit: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            debug: false,
            registry: None,
            policy: FailurePolicy::default(),
            status: StatusCode::BAD_REQUEST,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    capture: Capture,
    registry: Arc<TagResolverRegistry>,
    policy: FailurePolicy,
    status: StatusCode,
    body_limit: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineParams::default())
    }
}

impl Engine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            capture: Capture::new(params.debug),
            registry: Arc::new(params.registry.unwrap_or_default()),
            policy: params.policy,
            status: params.status,
            body_limit: params.body_limit,
        }
    }

    /// Params from configuration; custom tag parsers must be registered on
    /// `registry` before it is passed in.
    pub fn from_config(config: &AppConfig, registry: Option<TagResolverRegistry>) -> anyhow::Result<Self> {
        let status = StatusCode::from_u16(config.validation.status)?;
        Ok(Self::new(EngineParams {
            debug: config.api.debug,
            registry,
            policy: config.validation.policy,
            status,
            body_limit: config.api.body_limit,
        }))
    }

    pub fn capture(&self) -> Capture {
        self.capture
    }

    pub fn debug(&self) -> bool {
        self.capture.debug()
    }

    pub fn registry(&self) -> &TagResolverRegistry {
        &self.registry
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Formats validation failures of `T` with this engine's settings.
    pub fn check<T: Described>(&self, errors: Option<&ValidationErrors>) -> Option<HttpError> {
        check_errors(
            ValidateParams::of::<T>(errors, &self.registry)
                .status(self.status)
                .policy(self.policy),
        )
    }

    /// Registers the engine and its payload limit as app data.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .app_data(web::PayloadConfig::new(self.body_limit));
    }

    pub fn capture_errors(&self) -> CaptureErrors {
        CaptureErrors::new(self.capture)
    }
}
