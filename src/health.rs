use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::engine::Engine;

pub async fn health_check(engine: web::Data<Engine>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "engine": {
            "debug": engine.debug(),
            "policy": engine.policy(),
            "validation_status": engine.status().as_u16(),
            "body_limit": engine.body_limit(),
            "tag_parsers": engine.registry().len(),
        }
    }))
}
