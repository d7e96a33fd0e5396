use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{
    bind_profile, bind_service, profile_from_row, service_from_row, status_from_row,
    PROFILE_ASSIGNMENTS, PROFILE_COLUMNS, SERVICE_COLUMNS,
};
use crate::error::Result;
use crate::models::{OrganizationProfile, PendingOrganization, PendingService, ServiceDraft};
use crate::workflow::status::ReviewStatus;

fn organization_columns() -> String {
    format!("id, {PROFILE_COLUMNS}, status, owner_user_id, created_at, updated_at")
}

fn service_columns() -> String {
    format!("id, organization_id, {SERVICE_COLUMNS}, created_at, updated_at")
}

fn organization_from_row(row: &SqliteRow) -> Result<PendingOrganization> {
    Ok(PendingOrganization {
        id: row.try_get("id")?,
        profile: profile_from_row(row)?,
        status: status_from_row(row)?,
        owner_user_id: row.try_get("owner_user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn service_row(row: &SqliteRow) -> Result<PendingService> {
    Ok(PendingService {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        details: service_from_row(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect_services(rows: Vec<SqliteRow>) -> Result<Vec<PendingService>> {
    let mut services = rows.iter().map(service_row).collect::<Result<Vec<_>>>()?;
    services.sort_by_key(|service| service.id);
    Ok(services)
}

pub async fn insert_organization(
    conn: &mut SqliteConnection,
    owner_user_id: &str,
    profile: &OrganizationProfile,
    now: DateTime<Utc>,
) -> Result<PendingOrganization> {
    let sql = format!(
        "INSERT INTO pending_organizations ({PROFILE_COLUMNS}, status, owner_user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        organization_columns()
    );
    let row = bind_profile(sqlx::query(&sql), profile)
        .bind(ReviewStatus::Pending.as_str())
        .bind(owner_user_id.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    organization_from_row(&row)
}

pub async fn insert_services(
    conn: &mut SqliteConnection,
    organization_id: i64,
    services: &[ServiceDraft],
    now: DateTime<Utc>,
) -> Result<Vec<PendingService>> {
    let sql = format!(
        "INSERT INTO pending_services (organization_id, {SERVICE_COLUMNS}, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        service_columns()
    );

    let mut inserted = Vec::with_capacity(services.len());
    for service in services {
        let row = bind_service(sqlx::query(&sql).bind(organization_id), service)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        inserted.push(service_row(&row)?);
    }

    Ok(inserted)
}

pub async fn get_organization(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PendingOrganization>> {
    let sql = format!(
        "SELECT {} FROM pending_organizations WHERE id = ?",
        organization_columns()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(organization_from_row).transpose()
}

pub async fn list_organizations(
    conn: &mut SqliteConnection,
    status: Option<ReviewStatus>,
) -> Result<Vec<PendingOrganization>> {
    let sql = format!(
        "SELECT {} FROM pending_organizations \
         WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY created_at DESC, id DESC",
        organization_columns()
    );
    let rows = sqlx::query(&sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(organization_from_row).collect()
}

pub async fn list_organizations_by_owner(
    conn: &mut SqliteConnection,
    owner_user_id: &str,
) -> Result<Vec<PendingOrganization>> {
    let sql = format!(
        "SELECT {} FROM pending_organizations WHERE owner_user_id = ? \
         ORDER BY created_at DESC, id DESC",
        organization_columns()
    );
    let rows = sqlx::query(&sql)
        .bind(owner_user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(organization_from_row).collect()
}

pub async fn count_organizations(
    conn: &mut SqliteConnection,
    status: ReviewStatus,
) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pending_organizations WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn list_services(
    conn: &mut SqliteConnection,
    organization_id: i64,
) -> Result<Vec<PendingService>> {
    let sql = format!(
        "SELECT {} FROM pending_services WHERE organization_id = ? ORDER BY id",
        service_columns()
    );
    let rows = sqlx::query(&sql)
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

    collect_services(rows)
}

pub async fn update_profile(
    conn: &mut SqliteConnection,
    id: i64,
    profile: &OrganizationProfile,
    now: DateTime<Utc>,
) -> Result<Option<PendingOrganization>> {
    let sql = format!(
        "UPDATE pending_organizations SET {PROFILE_ASSIGNMENTS}, updated_at = ? \
         WHERE id = ? RETURNING {}",
        organization_columns()
    );
    let row = bind_profile(sqlx::query(&sql), profile)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(organization_from_row).transpose()
}

/// Touch the row so the transaction holds the write lock before reading it
pub async fn claim_organization(
    conn: &mut SqliteConnection,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Option<PendingOrganization>> {
    let sql = format!(
        "UPDATE pending_organizations SET updated_at = ? WHERE id = ? RETURNING {}",
        organization_columns()
    );
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(organization_from_row).transpose()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Option<PendingOrganization>> {
    let sql = format!(
        "UPDATE pending_organizations SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
        organization_columns()
    );
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(organization_from_row).transpose()
}

/// Delete and return every staged service of a draft
pub async fn take_services(
    conn: &mut SqliteConnection,
    organization_id: i64,
) -> Result<Vec<PendingService>> {
    let sql = format!(
        "DELETE FROM pending_services WHERE organization_id = ? RETURNING {}",
        service_columns()
    );
    let rows = sqlx::query(&sql)
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

    collect_services(rows)
}

/// Delete and return the draft itself
pub async fn take_organization(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PendingOrganization>> {
    let sql = format!(
        "DELETE FROM pending_organizations WHERE id = ? RETURNING {}",
        organization_columns()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(organization_from_row).transpose()
}
