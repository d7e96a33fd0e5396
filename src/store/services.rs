use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{bind_service, service_from_row, status_from_row, SERVICE_COLUMNS};
use crate::error::Result;
use crate::models::{Service, ServiceDraft};
use crate::workflow::status::ReviewStatus;

fn columns() -> String {
    format!("id, organization_id, {SERVICE_COLUMNS}, status, created_at, updated_at")
}

fn service_row(row: &SqliteRow) -> Result<Service> {
    Ok(Service {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        details: service_from_row(row)?,
        status: status_from_row(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    organization_id: i64,
    service: &ServiceDraft,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Service> {
    let sql = format!(
        "INSERT INTO services (organization_id, {SERVICE_COLUMNS}, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        columns()
    );
    let row = bind_service(sqlx::query(&sql).bind(organization_id), service)
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    service_row(&row)
}

pub async fn list_for_organization(
    conn: &mut SqliteConnection,
    organization_id: i64,
) -> Result<Vec<Service>> {
    let sql = format!(
        "SELECT {} FROM services WHERE organization_id = ? ORDER BY id",
        columns()
    );
    let rows = sqlx::query(&sql)
        .bind(organization_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(service_row).collect()
}

/// Take the write lock on a service row without changing it
pub async fn claim(conn: &mut SqliteConnection, id: i64) -> Result<Option<Service>> {
    let sql = format!("UPDATE services SET status = status WHERE id = ? RETURNING {}", columns());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(service_row).transpose()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Option<Service>> {
    let sql = format!(
        "UPDATE services SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(service_row).transpose()
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<Option<Service>> {
    let sql = format!("DELETE FROM services WHERE id = ? RETURNING {}", columns());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(service_row).transpose()
}

pub async fn delete_for_organization(
    conn: &mut SqliteConnection,
    organization_id: i64,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM services WHERE organization_id = ?")
        .bind(organization_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
