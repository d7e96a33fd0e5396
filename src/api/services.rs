use std::sync::Arc;

use axum::extract::Extension;
use axum::routing;
use axum::Router;

use super::extract::{Path, Query};
use super::json::Json;
use super::response::{ApiResponse, ApiResult};
use super::{StatusFilter, StatusUpdate};
use crate::models::{Service, ServiceSubmission, SubmissionDraft};
use crate::registry::Registry;
use crate::workflow::Actor;

async fn create_submission(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Json(draft): Json<SubmissionDraft>,
) -> ApiResult<ServiceSubmission> {
    let submission = registry.create_service_submission(&actor, draft).await?;
    Ok(ApiResponse::created("Service submitted for review", submission))
}

async fn list_submissions(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Vec<ServiceSubmission>> {
    let items = registry
        .list_service_submissions(&actor, filter.status.as_deref())
        .await?;
    Ok(ApiResponse::ok("Service submissions", items))
}

async fn list_my_submissions(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
) -> ApiResult<Vec<ServiceSubmission>> {
    let items = registry.list_my_service_submissions(&actor).await?;
    Ok(ApiResponse::ok("Your service submissions", items))
}

async fn update_submission_status(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdate>,
) -> ApiResult<ServiceSubmission> {
    let updated = registry
        .update_service_submission_status(&actor, id, &request.status)
        .await?;
    Ok(ApiResponse::ok("Service submission status updated", updated))
}

async fn submit_submission(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<Service> {
    let service = registry.submit_service_for_approval(&actor, id).await?;
    Ok(ApiResponse::ok("Service moved to organization services", service))
}

async fn delete_submission(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<ServiceSubmission> {
    let deleted = registry.delete_service_submission(&actor, id).await?;
    Ok(ApiResponse::ok("Service submission deleted", deleted))
}

async fn update_service_status(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdate>,
) -> ApiResult<Service> {
    let updated = registry
        .update_service_status(&actor, id, &request.status)
        .await?;
    Ok(ApiResponse::ok("Service status updated", updated))
}

async fn delete_service(
    actor: Actor,
    Extension(registry): Extension<Arc<Registry>>,
    Path(id): Path<i64>,
) -> ApiResult<Service> {
    let deleted = registry.delete_service(&actor, id).await?;
    Ok(ApiResponse::ok("Service deleted", deleted))
}

pub fn attach_routes(router: Router) -> Router {
    router.nest(
        "/services",
        Router::new()
            .route(
                "/submissions",
                routing::post(create_submission).get(list_submissions),
            )
            .route("/submissions/user", routing::get(list_my_submissions))
            .route(
                "/submissions/:id/status",
                routing::patch(update_submission_status),
            )
            .route("/submissions/:id/submit", routing::post(submit_submission))
            .route("/submissions/:id", routing::delete(delete_submission))
            .route("/:id/status", routing::patch(update_service_status))
            .route("/:id", routing::delete(delete_service)),
    )
}
