//! # http-error-capture
//!
//! Centralized error handling for actix-web services.
//!
//! - [`capture`] classifies whatever error a request produced and writes the
//!   response it implies: decode errors become precise 400s, self-describing
//!   errors render themselves, status-carrying errors keep their status and
//!   anything else is answered with a bare 400
//! - [`validation`] turns `validator` failures into one readable message
//!   using the names clients actually sent
//! - [`binder::Valid`] ties both together as a request extractor
//!
//! ```no_run
//! use actix_web::{web, App, HttpServer};
//! use http_error_capture::engine::Engine;
//!
//! # async fn run() -> std::io::Result<()> {
//! let engine = Engine::default();
//! HttpServer::new(move || {
//!     App::new()
//!         .configure(|cfg| engine.configure(cfg))
//!         .wrap(engine.capture_errors())
//! })
//! .bind(("127.0.0.1", 8080))?
//! .run()
//! .await
//! # }
//! ```

pub mod binder;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod validation;

#[cfg(test)]
mod testing;

pub use binder::Valid;
pub use capture::Capture;
pub use engine::{Engine, EngineParams};
pub use error::{ApiError, ApiResult, CustomError, FormatResponse, HttpError};
