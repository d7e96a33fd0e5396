//! Integration tests for the registration document side effect

use std::sync::Arc;

use org_registry::{ErrorKind, PendingTransition, StatusAction};

mod fixtures;
use fixtures::*;

#[tokio::test]
async fn test_created_organization_gets_document_urls() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let generator = FakeGenerator {
        fail_render: false,
        fail_pdf: false,
    };
    let registry = registry_with_documents(pipeline(generator, blobs.clone())).await;

    let committed = registry
        .create_organization(&owner(), draft("Vavuniya Office", &["Permits"]))
        .await
        .unwrap();
    assert!(committed.warning.is_none());

    let organization = committed.value.organization;
    let expected_docx = format!(
        "https://files.example/organizations/{}/registration.docx",
        organization.id
    );
    assert_eq!(organization.docx_url.as_deref(), Some(expected_docx.as_str()));
    assert!(organization.pdf_url.as_deref().unwrap().ends_with("registration.pdf"));

    let stored = registry.get_organization(&owner(), organization.id).await.unwrap();
    assert_eq!(stored.organization.docx_url, organization.docx_url);
    assert_eq!(stored.organization.pdf_url, organization.pdf_url);
    assert_eq!(blobs.uploads.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_promotion_publishes_documents() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let generator = FakeGenerator {
        fail_render: false,
        fail_pdf: false,
    };
    let registry = registry_with_documents(pipeline(generator, blobs.clone())).await;
    let pending = registry
        .create_pending_organization(&owner(), draft("Mannar Office", &["Permits"]))
        .await
        .unwrap();

    let committed = registry
        .transition_pending_organization(&admin(), pending.organization.id, "approved", StatusAction::Move)
        .await
        .unwrap();

    let PendingTransition::Promoted(details) = committed.value else {
        panic!("expected a promotion");
    };
    assert!(details.organization.docx_url.is_some());
    assert!(details.organization.pdf_url.is_some());
}

#[tokio::test]
async fn test_pdf_failure_is_a_warning_and_keeps_docx() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let generator = FakeGenerator {
        fail_render: false,
        fail_pdf: true,
    };
    let registry = registry_with_documents(pipeline(generator, blobs.clone())).await;

    let committed = registry
        .create_organization(&owner(), draft("Kilinochchi Office", &[]))
        .await
        .unwrap();

    let warning = committed.warning.expect("document warning");
    assert_eq!(warning.kind(), ErrorKind::StorageUnavailable);
    assert!(committed.value.organization.docx_url.is_some());
    assert!(committed.value.organization.pdf_url.is_none());
    assert_eq!(registry.metrics().get_stats().document_failures, 1);
}

#[tokio::test]
async fn test_render_failure_leaves_organization_without_documents() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let generator = FakeGenerator {
        fail_render: true,
        fail_pdf: false,
    };
    let registry = registry_with_documents(pipeline(generator, blobs.clone())).await;

    let committed = registry
        .create_organization(&owner(), draft("Mullaitivu Office", &["Permits"]))
        .await
        .unwrap();

    assert_eq!(
        committed.warning.as_ref().map(|w| w.kind()),
        Some(ErrorKind::StorageUnavailable)
    );
    let id = committed.value.organization.id;
    let stored = registry.get_organization(&owner(), id).await.unwrap();
    assert!(stored.organization.docx_url.is_none());
    assert!(stored.organization.pdf_url.is_none());
    assert_eq!(stored.services.len(), 1);
    assert!(blobs.uploads.lock().unwrap().is_empty());
}
