//! # Configuration Management
//!
//! Settings are layered from three sources, highest priority first:
//! 1. Environment variables (`APP_` prefix, `__` between nested keys,
//!    e.g. `APP_VALIDATION__STATUS=422`), plus the bare `HOST` and `PORT`
//!    used by deployment platforms
//! 2. An optional `config.{toml,json,yaml}` file in the working directory
//! 3. The values of the `Default` impl
//!
//! The library itself never reads configuration; only the binary does, and
//! it hands the resolved values to [`crate::engine::Engine::from_config`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::engine::DEFAULT_BODY_LIMIT;
use crate::validation::FailurePolicy;

/// Everything the reference server reads at startup.
///
/// ## Sections
/// - `server`: where to listen
/// - `api`: request handling (debug logging, body size limit)
/// - `validation`: how validation failures are answered
/// - `logging`: default log filter
///
/// Each section maps to a table in the config file and to a nested
/// environment key, e.g. `[validation] status = 422` or
/// `APP_VALIDATION__STATUS=422`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Address the reference server binds to.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: local connections only
/// - `host = "0.0.0.0"`: every interface, for containers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16, // 0 is rejected by `validate`
}

/// Request handling settings.
///
/// - `debug`: log unclassified errors at warn level before answering 400
/// - `body_limit`: maximum request body size in bytes; larger bodies are
///   answered with 413 before any decoding happens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub debug: bool,
    pub body_limit: usize,
}

/// How validation failures are reported.
///
/// - `status`: HTTP status of the aggregated failure response
/// - `policy`: `first_per_field` or `every_rule`
///
/// ## Choosing a status:
/// 400 matches what clients get for decode errors, so one status covers
/// every malformed request. 422 separates "could not read it" from "read it
/// but it is wrong".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub status: u16,
    pub policy: FailurePolicy,
}

/// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` still wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

/// Defaults let the server start with no config file and no environment.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(), // localhost only
                port: 8080,
            },
            api: ApiConfig {
                debug: false,
                body_limit: DEFAULT_BODY_LIMIT, // 256 KiB
            },
            validation: ValidationConfig {
                status: 400,
                policy: FailurePolicy::FirstPerField,
            },
            logging: LoggingConfig {
                filter: "http_error_capture=debug,actix_web=info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from every source, highest priority last.
    ///
    /// ## Loading order:
    /// 1. Built-in defaults
    /// 2. `config.toml` (or `.json`/`.yaml`) if present
    /// 3. `APP_` environment variables, `__` between section and key
    /// 4. `HOST` and `PORT`, as set by most deployment platforms
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`
    /// - `APP_API__DEBUG=true`
    /// - `APP_VALIDATION__POLICY=every_rule`
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Defaults, serialized back into the config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Optional file; a missing file is not an error
            .add_source(config::File::with_name("config").required(false))
            // 3. APP_SECTION__KEY, with values parsed into numbers and bools
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        // 4. Platform variables without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    ///
    /// ## What this checks:
    /// - the port is not 0
    /// - the body limit is not 0, which would refuse every body
    /// - the validation status is an error status (4xx or 5xx)
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.api.body_limit == 0 {
            return Err(anyhow::anyhow!("Body limit must be greater than 0"));
        }

        if !(400..=599).contains(&self.validation.status) {
            return Err(anyhow::anyhow!(
                "Validation status must be a 4xx or 5xx code, got {}",
                self.validation.status
            ));
        }

        Ok(())
    }

    /// `host:port` for `HttpServer::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
