//! # capture-server
//!
//! Reference server for the error capture engine. It loads configuration,
//! builds an [`Engine`] from it and serves:
//!
//! - `GET /health`
//! - `POST /api/v1/users` (validated JSON, XML or form body)
//! - `GET /api/v1/users` (validated query string)
//!
//! Every request passes through [`AccessLog`] and the engine's
//! [`CaptureErrors`](http_error_capture::middleware::CaptureErrors) middleware,
//! so handler and extractor errors all end up in the same place.
//!
//! ## Startup sequence:
//! 1. `.env` is loaded, if present
//! 2. [`AppConfig`] is layered from defaults, file and environment
//! 3. tracing is initialised with `RUST_LOG` or `logging.filter`
//! 4. the configuration is validated and the [`Engine`] built from it
//! 5. the server runs until SIGTERM or SIGINT, then drains in-flight requests
//!
//! ## Try it:
//! ```text
//! curl -X POST localhost:8080/api/v1/users \
//!      -H 'content-type: application/json' -d '{"name":"","email":"x","age":3}'
//! ```

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use http_error_capture::{
    config::AppConfig, engine::Engine, handlers, health, middleware::AccessLog,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set once SIGTERM or SIGINT arrives.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Entry point.
///
/// Any startup failure (bad configuration, port in use) is returned as an
/// error, so the process exits non-zero with the message printed.
#[actix_web::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenv::dotenv().ok();

    // Config comes first: it carries the default log filter
    let config = AppConfig::load()?;
    init_tracing(&config)?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!(
        debug = config.api.debug,
        policy = ?config.validation.policy,
        status = config.validation.status,
        "Configuration loaded: {}:{}",
        config.server.host,
        config.server.port
    );

    // Custom tag parsers would be registered on a registry passed in here
    let engine = Engine::from_config(&config, None)?;
    let bind_addr = config.bind_address();

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Last wrap runs first: CORS, then the access log, then capture.
        App::new()
            .configure(|cfg| engine.configure(cfg))
            .wrap(engine.capture_errors())
            .wrap(AccessLog)
            .wrap(cors)
            .service(
                web::scope("/api/v1")
                    .route("/users", web::post().to(handlers::create_user))
                    .route("/users", web::get().to(handlers::list_users)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    // Keep a handle so the shutdown branch can stop the server
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Installs the global tracing subscriber.
///
/// ## Filter precedence:
/// - `RUST_LOG`, when set
/// - otherwise `logging.filter` from configuration
///   (default `http_error_capture=debug,actix_web=info`)
///
/// Output is the plain `fmt` layer on stdout.
fn init_tracing(config: &AppConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Sets [`SHUTDOWN_SIGNAL`] on the first SIGTERM or SIGINT.
///
/// If the handlers cannot be installed the server keeps running and can
/// only be stopped by killing it; that is logged, not fatal.
fn setup_signal_handlers() {
    tokio::spawn(async {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Resolves once [`SHUTDOWN_SIGNAL`] is set; polls every 100ms.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
