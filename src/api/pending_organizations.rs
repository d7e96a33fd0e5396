use std::sync::Arc;

use axum::extract::Extension;
use axum::routing;
use axum::Router;
use serde::Serialize;

use super::extract::{Path, Query};
use super::json::Json;
use super::response::{ApiResponse, ApiResult};
use super::{StatusFilter, StatusUpdate};
use crate::models::{
    OrganizationDraft, PendingOrganization, PendingOrganizationDetails, ServicesUpdate,
};
use crate::registry::{PendingTransition, Registry};
use crate::workflow::Actor;

#[derive(Debug, Serialize)]
struct PendingCount {
    count: i64,
}

async fn create(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Json(draft): Json<OrganizationDraft>,
) -> ApiResult<PendingOrganizationDetails> {
    let created = registry.create_pending_organization(&actor, draft).await?;
    Ok(ApiResponse::created(
        "Organization submitted for review",
        created,
    ))
}

async fn list(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Vec<PendingOrganization>> {
    let items = registry
        .list_pending_organizations(&actor, filter.status.as_deref())
        .await?;
    Ok(ApiResponse::ok("Pending organizations", items))
}

async fn list_mine(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Vec<PendingOrganization>> {
    let items = registry.list_my_pending_organizations(&actor).await?;
    Ok(ApiResponse::ok("Your pending organizations", items))
}

async fn count(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<PendingCount> {
    let count = registry.pending_count(&actor).await?;
    Ok(ApiResponse::ok("Pending organizations awaiting review", PendingCount { count }))
}

async fn get_by_id(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<PendingOrganizationDetails> {
    let details = registry.get_pending_organization(&actor, id).await?;
    Ok(ApiResponse::ok("Pending organization", details))
}

async fn update(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(draft): Json<OrganizationDraft>,
) -> ApiResult<PendingOrganizationDetails> {
    let details = registry.update_pending_organization(&actor, id, draft).await?;
    Ok(ApiResponse::ok("Pending organization updated", details))
}

async fn update_services(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(update): Json<ServicesUpdate>,
) -> ApiResult<PendingOrganizationDetails> {
    let details = registry.update_pending_services(&actor, id, update).await?;
    Ok(ApiResponse::ok("Pending services updated", details))
}

async fn update_status(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdate>,
) -> ApiResult<PendingTransition> {
    let committed = registry
        .transition_pending_organization(&actor, id, &request.status, request.action)
        .await?;
    let message = match &committed.value {
        PendingTransition::Promoted(_) => "Organization approved and moved to organizations",
        PendingTransition::StatusChanged(_) => "Pending organization status updated",
    };
    Ok(ApiResponse::committed(message, committed))
}

async fn delete(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<PendingOrganizationDetails> {
    let deleted = registry.delete_pending_organization(&actor, id).await?;
    Ok(ApiResponse::ok("Pending organization deleted", deleted))
}

pub fn attach_routes(router: Router) -> Router {
    router.nest(
        "/pending-organizations",
        Router::new()
            .route("/", routing::post(create).get(list))
            .route("/user", routing::get(list_mine))
            .route("/count", routing::get(count))
            .route(
                "/:id",
                routing::get(get_by_id).put(update).delete(delete),
            )
            .route("/:id/services", routing::put(update_services))
            .route("/:id/status", routing::patch(update_status)),
    )
}
