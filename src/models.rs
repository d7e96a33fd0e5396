//! Registry entities and the request schemas that create them.
//!
//! Live and staged organizations share one [`OrganizationProfile`], so a
//! promotion copies the profile verbatim and only the envelope around it
//! (id, status, document URLs) changes.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::workflow::status::ReviewStatus;

static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub designation: String,
    pub email: String,
    #[serde(default)]
    pub contact_number: String,
}

/// Business fields of an organization, identical in staging and live tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub province: String,
    pub district: String,
    pub institution_name: String,
    #[serde(default)]
    pub website_url: Option<String>,
    pub contact: Contact,
    #[serde(default)]
    pub organization_logo: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub service_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
}

/// Request body for creating or replacing an organization and its services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDraft {
    #[serde(flatten)]
    pub profile: OrganizationProfile,
    pub services: Vec<ServiceDraft>,
}

/// Request body for replacing only the staged services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesUpdate {
    pub services: Vec<ServiceDraft>,
}

/// Request body for a new service on an approved organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub organization_id: i64,
    #[serde(flatten)]
    pub service: ServiceDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    #[serde(flatten)]
    pub profile: OrganizationProfile,
    pub status: ReviewStatus,
    pub owner_user_id: String,
    pub docx_url: Option<String>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrganization {
    pub id: i64,
    #[serde(flatten)]
    pub profile: OrganizationProfile,
    pub status: ReviewStatus,
    pub owner_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub organization_id: i64,
    #[serde(flatten)]
    pub details: ServiceDraft,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingService {
    pub id: i64,
    pub organization_id: i64,
    #[serde(flatten)]
    pub details: ServiceDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSubmission {
    pub id: i64,
    pub organization_id: i64,
    pub owner_user_id: String,
    #[serde(flatten)]
    pub details: ServiceDraft,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    #[serde(flatten)]
    pub organization: Organization,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrganizationDetails {
    #[serde(flatten)]
    pub organization: PendingOrganization,
    pub services: Vec<PendingService>,
}

impl OrganizationProfile {
    fn validate_into(&self, errors: &mut FieldErrors) {
        errors.require("province", &self.province);
        errors.require("district", &self.district);
        errors.require("institution_name", &self.institution_name);
        errors.require("contact.name", &self.contact.name);
        if self.contact.email.trim().is_empty() {
            errors.push("contact.email", "is required");
        } else if !EMAIL_RX.is_match(self.contact.email.trim()) {
            errors.push("contact.email", "is not a valid email address");
        }
    }
}

impl ServiceDraft {
    fn validate_into(&self, prefix: &str, errors: &mut FieldErrors) {
        errors.require(format!("{prefix}service_name"), &self.service_name);
        errors.require(format!("{prefix}category"), &self.category);
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        self.validate_into("", &mut errors);
        errors.result()
    }
}

fn validate_services(services: &[ServiceDraft], errors: &mut FieldErrors) {
    for (index, service) in services.iter().enumerate() {
        service.validate_into(&format!("services[{index}]."), errors);
    }
}

impl OrganizationDraft {
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        self.profile.validate_into(&mut errors);
        validate_services(&self.services, &mut errors);
        errors.result()
    }
}

impl ServicesUpdate {
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        validate_services(&self.services, &mut errors);
        errors.result()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn profile(name: &str) -> OrganizationProfile {
        OrganizationProfile {
            province: "Western".to_string(),
            district: "Colombo".to_string(),
            institution_name: name.to_string(),
            website_url: Some("https://example.gov.lk".to_string()),
            contact: Contact {
                name: "Nimal Perera".to_string(),
                designation: "Director".to_string(),
                email: "nimal@example.gov.lk".to_string(),
                contact_number: "+94 11 000 0000".to_string(),
            },
            organization_logo: None,
            profile_image: None,
        }
    }

    pub fn service(name: &str) -> ServiceDraft {
        ServiceDraft {
            service_name: name.to_string(),
            category: "Licensing".to_string(),
            description: format!("{name} for residents"),
            requirements: "National identity card".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_draft_requires_services_key() {
        let body = serde_json::json!({
            "province": "Western",
            "district": "Colombo",
            "institution_name": "Registry Office",
            "contact": { "name": "A", "email": "a@b.lk" }
        });
        assert!(serde_json::from_value::<OrganizationDraft>(body).is_err());
    }

    #[test]
    fn test_draft_parses_flattened_profile() {
        let body = serde_json::json!({
            "province": "Western",
            "district": "Colombo",
            "institution_name": "Registry Office",
            "contact": { "name": "A", "email": "a@b.lk", "contactNumber": "011" },
            "services": [{ "service_name": "Birth certificates", "category": "Civil" }]
        });
        let draft: OrganizationDraft = serde_json::from_value(body).unwrap();
        assert_eq!(draft.profile.contact.contact_number, "011");
        assert_eq!(draft.services.len(), 1);
        assert_eq!(draft.services[0].description, "");
        draft.validate().unwrap();
    }

    #[test]
    fn test_validation_names_bad_service_fields() {
        let mut draft = OrganizationDraft {
            profile: profile("Registry Office"),
            services: vec![service("Permits"), service("")],
        };
        draft.profile.contact.email = "not-an-email".to_string();

        match draft.validate() {
            Err(RegistryError::Validation(fields)) => {
                assert!(fields.contains_key("contact.email"));
                assert!(fields.contains_key("services[1].service_name"));
                assert!(!fields.contains_key("services[0].service_name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_services_list_is_valid() {
        let draft = OrganizationDraft {
            profile: profile("Registry Office"),
            services: Vec::new(),
        };
        assert!(draft.validate().is_ok());
    }
}
