use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{bind_service, service_from_row, status_from_row, SERVICE_COLUMNS};
use crate::error::Result;
use crate::models::{ServiceDraft, ServiceSubmission};
use crate::workflow::status::ReviewStatus;

fn columns() -> String {
    format!(
        "id, organization_id, owner_user_id, {SERVICE_COLUMNS}, status, created_at, updated_at"
    )
}

fn submission_from_row(row: &SqliteRow) -> Result<ServiceSubmission> {
    Ok(ServiceSubmission {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        owner_user_id: row.try_get("owner_user_id")?,
        details: service_from_row(row)?,
        status: status_from_row(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    organization_id: i64,
    owner_user_id: &str,
    service: &ServiceDraft,
    now: DateTime<Utc>,
) -> Result<ServiceSubmission> {
    let sql = format!(
        "INSERT INTO service_submissions (organization_id, owner_user_id, {SERVICE_COLUMNS}, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        columns()
    );
    let query = sqlx::query(&sql)
        .bind(organization_id)
        .bind(owner_user_id.to_string());
    let row = bind_service(query, service)
        .bind(ReviewStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    submission_from_row(&row)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<ServiceSubmission>> {
    let sql = format!("SELECT {} FROM service_submissions WHERE id = ?", columns());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(submission_from_row).transpose()
}

pub async fn list(
    conn: &mut SqliteConnection,
    status: Option<ReviewStatus>,
) -> Result<Vec<ServiceSubmission>> {
    let sql = format!(
        "SELECT {} FROM service_submissions WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY created_at DESC, id DESC",
        columns()
    );
    let rows = sqlx::query(&sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(submission_from_row).collect()
}

pub async fn list_by_owner(
    conn: &mut SqliteConnection,
    owner_user_id: &str,
) -> Result<Vec<ServiceSubmission>> {
    let sql = format!(
        "SELECT {} FROM service_submissions WHERE owner_user_id = ? \
         ORDER BY created_at DESC, id DESC",
        columns()
    );
    let rows = sqlx::query(&sql)
        .bind(owner_user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(submission_from_row).collect()
}

/// Take the write lock on a submission row without changing it
pub async fn claim(conn: &mut SqliteConnection, id: i64) -> Result<Option<ServiceSubmission>> {
    let sql = format!(
        "UPDATE service_submissions SET status = status WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(submission_from_row).transpose()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Option<ServiceSubmission>> {
    let sql = format!(
        "UPDATE service_submissions SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// Delete and return a submission; the delete doubles as the row lock
pub async fn take(conn: &mut SqliteConnection, id: i64) -> Result<Option<ServiceSubmission>> {
    let sql = format!(
        "DELETE FROM service_submissions WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(submission_from_row).transpose()
}
