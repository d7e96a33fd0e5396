//! Moves staged rows into the live tables.
//!
//! Each operation is a single transaction whose first statement writes the
//! staging row. SQLite admits one writer at a time, so two operations racing
//! on the same id serialise on that statement and the loser finds the row
//! gone and reports `NotFound`. Dropping the transaction on any error rolls
//! the whole unit back and leaves the staging row intact.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::models::{
    Organization, OrganizationDetails, PendingOrganizationDetails, Service, ServiceSubmission,
};
use crate::store;
use crate::workflow::status::{self, ReviewStatus};

/// Promote a pending organization and its services into the live tables
pub async fn promote_organization(pool: &SqlitePool, pending_id: i64) -> Result<OrganizationDetails> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let pending = store::pending::claim_organization(&mut tx, pending_id, now)
        .await?
        .ok_or_else(|| RegistryError::not_found("pending organization", pending_id))?;

    let change = status::transition(pending.status, ReviewStatus::Approved);

    let pending_services = store::pending::take_services(&mut tx, pending_id).await?;
    store::pending::take_organization(&mut tx, pending_id)
        .await?
        .ok_or_else(|| RegistryError::not_found("pending organization", pending_id))?;

    let organization = store::organizations::insert(
        &mut tx,
        &pending.owner_user_id,
        &pending.profile,
        change.to,
        now,
    )
    .await?;

    let mut services = Vec::with_capacity(pending_services.len());
    for pending_service in &pending_services {
        let service = store::services::insert(
            &mut tx,
            organization.id,
            &pending_service.details,
            change.to,
            now,
        )
        .await?;
        services.push(service);
    }

    tx.commit().await?;

    info!(
        pending_id = pending_id,
        from = %change.from,
        organization_id = organization.id,
        services = services.len(),
        owner = %organization.owner_user_id,
        "Promoted pending organization"
    );

    Ok(OrganizationDetails {
        organization,
        services,
    })
}

/// Move a service submission into the live services table
pub async fn submit_service_for_approval(pool: &SqlitePool, submission_id: i64) -> Result<Service> {
    let mut tx = pool.begin().await?;

    let submission = store::submissions::take(&mut tx, submission_id)
        .await?
        .ok_or_else(|| RegistryError::not_found("service submission", submission_id))?;

    // The organization may have been deleted since the submission was created
    if store::organizations::get(&mut tx, submission.organization_id)
        .await?
        .is_none()
    {
        return Err(RegistryError::not_found(
            "organization",
            submission.organization_id,
        ));
    }

    let service = store::services::insert(
        &mut tx,
        submission.organization_id,
        &submission.details,
        submission.status,
        Utc::now(),
    )
    .await?;

    tx.commit().await?;

    info!(
        submission_id = submission_id,
        service_id = service.id,
        organization_id = service.organization_id,
        "Moved service submission into live services"
    );

    Ok(service)
}

/// Delete a pending organization together with its staged services
pub async fn delete_pending_organization(
    pool: &SqlitePool,
    pending_id: i64,
) -> Result<PendingOrganizationDetails> {
    let mut tx = pool.begin().await?;

    let services = store::pending::take_services(&mut tx, pending_id).await?;
    let organization = store::pending::take_organization(&mut tx, pending_id)
        .await?
        .ok_or_else(|| RegistryError::not_found("pending organization", pending_id))?;

    tx.commit().await?;

    debug!(
        pending_id = pending_id,
        services = services.len(),
        "Deleted pending organization"
    );

    Ok(PendingOrganizationDetails {
        organization,
        services,
    })
}

pub async fn delete_service_submission(
    pool: &SqlitePool,
    submission_id: i64,
) -> Result<ServiceSubmission> {
    let mut conn = pool.acquire().await?;

    store::submissions::take(&mut conn, submission_id)
        .await?
        .ok_or_else(|| RegistryError::not_found("service submission", submission_id))
}

/// Delete a live organization and its services
pub async fn delete_organization(pool: &SqlitePool, organization_id: i64) -> Result<Organization> {
    let mut tx = pool.begin().await?;

    let removed = store::services::delete_for_organization(&mut tx, organization_id).await?;
    let organization = store::organizations::delete(&mut tx, organization_id)
        .await?
        .ok_or_else(|| RegistryError::not_found("organization", organization_id))?;

    tx.commit().await?;

    debug!(
        organization_id = organization_id,
        services = removed,
        "Deleted organization"
    );

    Ok(organization)
}
