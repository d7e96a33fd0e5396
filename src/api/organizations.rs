use std::sync::Arc;

use axum::extract::Extension;
use axum::routing;
use axum::Router;

use super::extract::{Path, Query};
use super::json::Json;
use super::response::{ApiResponse, ApiResult};
use super::{StatusFilter, StatusUpdate};
use crate::models::{Organization, OrganizationDetails, OrganizationDraft, Service};
use crate::registry::Registry;
use crate::workflow::Actor;

/// Direct creation; new registrations normally go through /pending-organizations
async fn create(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Json(draft): Json<OrganizationDraft>,
) -> ApiResult<OrganizationDetails> {
    let committed = registry.create_organization(&actor, draft).await?;
    Ok(ApiResponse::committed("Organization created", committed)
        .with_status(axum::http::StatusCode::CREATED))
}

async fn list(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Vec<Organization>> {
    let items = registry
        .list_organizations(&actor, filter.status.as_deref())
        .await?;
    Ok(ApiResponse::ok("Organizations", items))
}

async fn list_mine(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Vec<Organization>> {
    let items = registry.list_my_organizations(&actor).await?;
    Ok(ApiResponse::ok("Your organizations", items))
}

async fn get_by_id(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<OrganizationDetails> {
    let details = registry.get_organization(&actor, id).await?;
    Ok(ApiResponse::ok("Organization", details))
}

async fn update(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(draft): Json<OrganizationDraft>,
) -> ApiResult<OrganizationDetails> {
    let committed = registry.update_organization(&actor, id, draft).await?;
    Ok(ApiResponse::committed("Organization updated", committed))
}

async fn update_status(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdate>,
) -> ApiResult<Organization> {
    let updated = registry
        .update_organization_status(&actor, id, &request.status)
        .await?;
    Ok(ApiResponse::ok("Organization status updated", updated))
}

async fn delete(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<Organization> {
    let deleted = registry.delete_organization(&actor, id).await?;
    Ok(ApiResponse::ok("Organization deleted", deleted))
}

async fn list_services(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Service>> {
    let services = registry.list_organization_services(&actor, id).await?;
    Ok(ApiResponse::ok("Organization services", services))
}

pub fn attach_routes(router: Router) -> Router {
    router.nest(
        "/organizations",
        Router::new()
            .route("/", routing::post(create).get(list))
            .route("/user", routing::get(list_mine))
            .route(
                "/:id",
                routing::get(get_by_id).put(update).delete(delete),
            )
            .route("/:id/status", routing::patch(update_status))
            .route("/:id/services", routing::get(list_services)),
    )
}
