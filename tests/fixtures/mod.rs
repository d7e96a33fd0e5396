//! Shared helpers for registry integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use org_registry::documents::{BlobStore, DocumentGenerator, DocumentPipeline};
use org_registry::config::DatabaseConfig;
use org_registry::models::{
    Contact, Organization, OrganizationDraft, OrganizationProfile, Service, ServiceDraft,
    SubmissionDraft,
};
use org_registry::{Actor, DatabaseManager, PendingTransition, Registry, RegistryError, StatusAction};
use tempfile::TempDir;

pub fn owner() -> Actor {
    Actor::user("officer-1")
}

pub fn stranger() -> Actor {
    Actor::user("officer-2")
}

pub fn admin() -> Actor {
    Actor::admin("admin-1")
}

/// Registry on a fresh in-memory database without documents
pub async fn registry() -> Registry {
    let database = DatabaseManager::in_memory()
        .await
        .expect("in-memory database");
    Registry::new(database.pool().clone())
}

/// Registry on a database file behind a multi-connection pool
///
/// Keep the returned directory alive for as long as the registry is used.
pub async fn file_registry() -> (TempDir, Arc<Registry>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("registry.db").display()),
        max_connections: 8,
        auto_migrate: true,
        busy_timeout_seconds: 30,
    };
    let database = DatabaseManager::new(&config)
        .await
        .expect("file database");
    (dir, Arc::new(Registry::new(database.pool().clone())))
}

pub async fn registry_with_documents(pipeline: DocumentPipeline) -> Registry {
    registry().await.with_documents(pipeline)
}

pub fn profile(name: &str) -> OrganizationProfile {
    OrganizationProfile {
        province: "Central".to_string(),
        district: "Kandy".to_string(),
        institution_name: name.to_string(),
        website_url: None,
        contact: Contact {
            name: "Kumari Silva".to_string(),
            designation: "Registrar".to_string(),
            email: "kumari@kandy.gov.lk".to_string(),
            contact_number: "081 222 3333".to_string(),
        },
        organization_logo: None,
        profile_image: None,
    }
}

pub fn service(name: &str) -> ServiceDraft {
    ServiceDraft {
        service_name: name.to_string(),
        category: "Civil registration".to_string(),
        description: format!("{name} at the district office"),
        requirements: "Application form".to_string(),
    }
}

pub fn draft(name: &str, services: &[&str]) -> OrganizationDraft {
    OrganizationDraft {
        profile: profile(name),
        services: services.iter().map(|s| service(s)).collect(),
    }
}

pub fn submission(organization_id: i64, name: &str) -> SubmissionDraft {
    SubmissionDraft {
        organization_id,
        service: service(name),
    }
}

/// Submit and promote a draft owned by [`owner`]
pub async fn approved_organization(registry: &Registry) -> Organization {
    let pending = registry
        .create_pending_organization(&owner(), draft("Matara Office", &["Permits"]))
        .await
        .expect("pending organization");
    let committed = registry
        .transition_pending_organization(&admin(), pending.organization.id, "approved", StatusAction::Move)
        .await
        .expect("promotion");
    match committed.value {
        PendingTransition::Promoted(details) => details.organization,
        other => panic!("expected a promotion, got {other:?}"),
    }
}

pub async fn count_rows(registry: &Registry, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(registry.pool())
        .await
        .expect("count query")
}

/// Generator that renders fine but whose PDF step can be made to fail
pub struct FakeGenerator {
    pub fail_render: bool,
    pub fail_pdf: bool,
}

#[async_trait]
impl DocumentGenerator for FakeGenerator {
    async fn render(
        &self,
        organization: &Organization,
        services: &[Service],
    ) -> org_registry::Result<Vec<u8>> {
        if self.fail_render {
            return Err(RegistryError::StorageUnavailable("template missing".to_string()));
        }
        Ok(format!("{}:{}", organization.profile.institution_name, services.len()).into_bytes())
    }

    async fn to_pdf(&self, document: Vec<u8>) -> org_registry::Result<Vec<u8>> {
        if self.fail_pdf {
            return Err(RegistryError::StorageUnavailable("converter missing".to_string()));
        }
        let mut pdf = b"%PDF ".to_vec();
        pdf.extend(document);
        Ok(pdf)
    }
}

/// Blob store that records uploaded paths in memory
#[derive(Default)]
pub struct MemoryBlobStore {
    pub uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, _bytes: Vec<u8>) -> org_registry::Result<String> {
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(format!("https://files.example/{path}"))
    }
}

pub fn pipeline(generator: FakeGenerator, blobs: Arc<MemoryBlobStore>) -> DocumentPipeline {
    DocumentPipeline::new(Arc::new(generator), blobs)
}
