//! Registration documents attached to organizations after they are written.
//!
//! Rendering and storage sit behind traits; the registry only needs "bytes in,
//! URL out" and treats every failure here as non-fatal.

pub mod render;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::error::{RegistryError, Result};
use crate::models::{Organization, Service};

pub use render::DocxDocumentGenerator;
pub use storage::LocalBlobStore;

/// Renders an organization and its services into a document
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Render the editable registration document
    async fn render(&self, organization: &Organization, services: &[Service]) -> Result<Vec<u8>>;

    /// Convert a rendered document to PDF
    async fn to_pdf(&self, document: Vec<u8>) -> Result<Vec<u8>>;
}

/// Durable storage for generated documents and uploaded images
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a relative path and return a URL for them
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUrls {
    pub docx_url: Option<String>,
    pub pdf_url: Option<String>,
}

/// Result of a publish attempt; URLs that made it out are kept even when a later step failed
#[derive(Debug, Default)]
pub struct Publication {
    pub urls: DocumentUrls,
    pub failure: Option<RegistryError>,
}

#[derive(Clone)]
pub struct DocumentPipeline {
    generator: Arc<dyn DocumentGenerator>,
    blobs: Arc<dyn BlobStore>,
}

impl DocumentPipeline {
    pub fn new(generator: Arc<dyn DocumentGenerator>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { generator, blobs }
    }

    /// Render, upload, convert and upload again
    pub async fn publish(&self, organization: &Organization, services: &[Service]) -> Publication {
        let publication = Publication::default();
        let base = format!("organizations/{}", organization.id);

        let document = match self.generator.render(organization, services).await {
            Ok(document) => document,
            Err(err) => return publication.failed(organization.id, "render", err),
        };

        let mut publication = match self
            .blobs
            .upload(&format!("{base}/registration.docx"), document.clone())
            .await
        {
            Ok(url) => publication.with_docx(url),
            Err(err) => return publication.failed(organization.id, "docx upload", err),
        };

        let pdf = match self.generator.to_pdf(document).await {
            Ok(pdf) => pdf,
            Err(err) => return publication.failed(organization.id, "pdf conversion", err),
        };

        match self
            .blobs
            .upload(&format!("{base}/registration.pdf"), pdf)
            .await
        {
            Ok(url) => publication.urls.pdf_url = Some(url),
            Err(err) => return publication.failed(organization.id, "pdf upload", err),
        }

        debug!(organization_id = organization.id, "Registration documents published");
        publication
    }
}

impl Publication {
    fn with_docx(mut self, url: String) -> Self {
        self.urls.docx_url = Some(url);
        self
    }

    fn failed(mut self, organization_id: i64, step: &'static str, err: RegistryError) -> Self {
        let err = unavailable(err);
        warn!(organization_id, step, error = %err, "Document publish incomplete");
        self.failure = Some(err);
        self
    }
}

/// Collaborator failures all surface as storage outages
fn unavailable(err: RegistryError) -> RegistryError {
    match err {
        RegistryError::StorageUnavailable(_) => err,
        other => RegistryError::StorageUnavailable(other.to_string()),
    }
}
