//! HTTP surface of the registry.
//!
//! Identity comes from gateway headers; every body and every failure uses the
//! `{ success, message, ... }` envelope from [`response`].

pub mod context;
pub mod extract;
pub mod json;
pub mod organizations;
pub mod pending_organizations;
pub mod response;
pub mod services;

use std::sync::Arc;

use axum::routing;
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::registry::Registry;
use crate::workflow::StatusAction;

/// `?status=` filter of the admin listings
#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// Body of every `PATCH .../status` call
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusUpdate {
    pub status: String,
    #[serde(default)]
    pub action: StatusAction,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health { status: "ok" })
}

pub fn attach_routes(mut router: Router) -> Router {
    router = pending_organizations::attach_routes(router);
    router = organizations::attach_routes(router);
    router = services::attach_routes(router);
    router.route("/health", routing::get(health))
}

/// Full application router with shared state and HTTP middleware
pub fn router(registry: Arc<Registry>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    attach_routes(Router::new())
        .layer(Extension(registry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
