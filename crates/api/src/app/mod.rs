//! HTTP application wiring (axum router + services).
//!
//! - `services.rs`: store, bus, dispatcher and catalog wiring
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request bodies and JSON mapping
//! - `errors.rs`: `{ "error", "message" }` responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use storefront_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full router. Must be awaited inside a Tokio runtime (the catalog
/// subscriber runs on the blocking pool).
pub async fn build_app(config: &AppConfig) -> Router {
    let services = Arc::new(services::build_services(config.dispatch_attempts));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_log))
                .layer(Extension(services)),
        )
}
