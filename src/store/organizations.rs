use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{bind_profile, profile_from_row, status_from_row, PROFILE_ASSIGNMENTS, PROFILE_COLUMNS};
use crate::error::Result;
use crate::models::{Organization, OrganizationProfile};
use crate::workflow::status::ReviewStatus;

fn columns() -> String {
    format!(
        "id, {PROFILE_COLUMNS}, status, owner_user_id, docx_url, pdf_url, created_at, updated_at"
    )
}

fn organization_from_row(row: &SqliteRow) -> Result<Organization> {
    Ok(Organization {
        id: row.try_get("id")?,
        profile: profile_from_row(row)?,
        status: status_from_row(row)?,
        owner_user_id: row.try_get("owner_user_id")?,
        docx_url: row.try_get("docx_url")?,
        pdf_url: row.try_get("pdf_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    owner_user_id: &str,
    profile: &OrganizationProfile,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Organization> {
    let sql = format!(
        "INSERT INTO organizations ({PROFILE_COLUMNS}, status, owner_user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        columns()
    );
    let row = bind_profile(sqlx::query(&sql), profile)
        .bind(status.as_str())
        .bind(owner_user_id.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    organization_from_row(&row)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Organization>> {
    let sql = format!("SELECT {} FROM organizations WHERE id = ?", columns());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(organization_from_row).transpose()
}

pub async fn list(
    conn: &mut SqliteConnection,
    status: Option<ReviewStatus>,
) -> Result<Vec<Organization>> {
    let sql = format!(
        "SELECT {} FROM organizations WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY created_at DESC, id DESC",
        columns()
    );
    let rows = sqlx::query(&sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(organization_from_row).collect()
}

pub async fn list_by_owner(
    conn: &mut SqliteConnection,
    owner_user_id: &str,
) -> Result<Vec<Organization>> {
    let sql = format!(
        "SELECT {} FROM organizations WHERE owner_user_id = ? ORDER BY created_at DESC, id DESC",
        columns()
    );
    let rows = sqlx::query(&sql)
        .bind(owner_user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(organization_from_row).collect()
}

pub async fn update_profile(
    conn: &mut SqliteConnection,
    id: i64,
    profile: &OrganizationProfile,
    now: DateTime<Utc>,
) -> Result<Option<Organization>> {
    let sql = format!(
        "UPDATE organizations SET {PROFILE_ASSIGNMENTS}, updated_at = ? WHERE id = ? RETURNING {}",
        columns()
    );
    let row = bind_profile(sqlx::query(&sql), profile)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(organization_from_row).transpose()
}

/// Take the write lock on an organization row without changing it
pub async fn claim(conn: &mut SqliteConnection, id: i64) -> Result<Option<Organization>> {
    let sql = format!(
        "UPDATE organizations SET status = status WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(organization_from_row).transpose()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ReviewStatus,
    now: DateTime<Utc>,
) -> Result<Option<Organization>> {
    let sql = format!(
        "UPDATE organizations SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
        columns()
    );
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(organization_from_row).transpose()
}

/// Attach generated document URLs; business fields and updated_at are untouched
pub async fn set_document_urls(
    conn: &mut SqliteConnection,
    id: i64,
    docx_url: Option<&str>,
    pdf_url: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE organizations SET docx_url = ?, pdf_url = ? WHERE id = ?")
        .bind(docx_url.map(str::to_string))
        .bind(pdf_url.map(str::to_string))
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<Option<Organization>> {
    let sql = format!("DELETE FROM organizations WHERE id = ? RETURNING {}", columns());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(organization_from_row).transpose()
}
