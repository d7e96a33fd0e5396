//! SQL access to the live and staging tables.
//!
//! Every function takes a `&mut SqliteConnection` so callers decide whether it
//! runs on a pooled connection or inside a transaction.

pub mod organizations;
pub mod pending;
pub mod services;
pub mod submissions;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use crate::error::Result;
use crate::models::{Contact, OrganizationProfile, ServiceDraft};
use crate::workflow::status::ReviewStatus;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

pub(crate) const PROFILE_COLUMNS: &str = "province, district, institution_name, website_url, \
     contact_name, contact_designation, contact_email, contact_number, \
     organization_logo, profile_image";

pub(crate) const PROFILE_ASSIGNMENTS: &str = "province = ?, district = ?, institution_name = ?, \
     website_url = ?, contact_name = ?, contact_designation = ?, contact_email = ?, \
     contact_number = ?, organization_logo = ?, profile_image = ?";

pub(crate) const SERVICE_COLUMNS: &str = "service_name, category, description, requirements";

pub(crate) fn bind_profile<'q>(query: SqliteQuery<'q>, profile: &OrganizationProfile) -> SqliteQuery<'q> {
    query
        .bind(profile.province.trim().to_string())
        .bind(profile.district.trim().to_string())
        .bind(profile.institution_name.trim().to_string())
        .bind(profile.website_url.clone())
        .bind(profile.contact.name.trim().to_string())
        .bind(profile.contact.designation.clone())
        .bind(profile.contact.email.trim().to_string())
        .bind(profile.contact.contact_number.clone())
        .bind(profile.organization_logo.clone())
        .bind(profile.profile_image.clone())
}

pub(crate) fn bind_service<'q>(query: SqliteQuery<'q>, service: &ServiceDraft) -> SqliteQuery<'q> {
    query
        .bind(service.service_name.trim().to_string())
        .bind(service.category.trim().to_string())
        .bind(service.description.clone())
        .bind(service.requirements.clone())
}

pub(crate) fn profile_from_row(row: &SqliteRow) -> Result<OrganizationProfile> {
    Ok(OrganizationProfile {
        province: row.try_get("province")?,
        district: row.try_get("district")?,
        institution_name: row.try_get("institution_name")?,
        website_url: row.try_get("website_url")?,
        contact: Contact {
            name: row.try_get("contact_name")?,
            designation: row.try_get("contact_designation")?,
            email: row.try_get("contact_email")?,
            contact_number: row.try_get("contact_number")?,
        },
        organization_logo: row.try_get("organization_logo")?,
        profile_image: row.try_get("profile_image")?,
    })
}

pub(crate) fn service_from_row(row: &SqliteRow) -> Result<ServiceDraft> {
    Ok(ServiceDraft {
        service_name: row.try_get("service_name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        requirements: row.try_get("requirements")?,
    })
}

pub(crate) fn status_from_row(row: &SqliteRow) -> Result<ReviewStatus> {
    let status: String = row.try_get("status")?;
    status.parse()
}
