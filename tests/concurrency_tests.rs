//! Racing workflow operations against a database file shared by several connections

use std::sync::Arc;

use org_registry::{ErrorKind, Registry, RegistryError, ReviewStatus, StatusAction};
use tokio::task::JoinHandle;

mod fixtures;
use fixtures::*;

async fn settle<T>(handles: Vec<JoinHandle<Result<T, RegistryError>>>) -> Vec<Result<T, RegistryError>> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.expect("task panicked"));
    }
    outcomes
}

fn single_winner<T>(outcomes: &[Result<T, RegistryError>]) -> usize {
    for outcome in outcomes {
        if let Err(e) = outcome {
            assert_eq!(e.kind(), ErrorKind::NotFound, "unexpected failure: {e}");
        }
    }
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    outcomes.iter().position(|r| r.is_ok()).unwrap_or_default()
}

async fn staged(registry: &Registry, name: &str) -> i64 {
    registry
        .create_pending_organization(&owner(), draft(name, &["Permits", "Licences"]))
        .await
        .unwrap()
        .organization
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_organization_status_changes_all_commit() {
    let (_dir, registry) = file_registry().await;
    let organization_id = approved_organization(&registry).await.id;

    for round in 0..5 {
        let handles = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let status = ReviewStatus::ALL[(round + i) % 3];
                tokio::spawn(async move {
                    registry
                        .update_organization_status(&admin(), organization_id, status.as_str())
                        .await
                })
            })
            .collect();

        for outcome in settle(handles).await {
            let updated = outcome.unwrap();
            assert_eq!(updated.id, organization_id);
        }
    }

    assert_eq!(registry.metrics().get_stats().status_transitions, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_service_and_submission_reviews_all_commit() {
    let (_dir, registry) = file_registry().await;
    let organization = approved_organization(&registry).await;
    let service_id = registry
        .list_organization_services(&owner(), organization.id)
        .await
        .unwrap()[0]
        .id;
    let submission_id = registry
        .create_service_submission(&owner(), submission(organization.id, "Permits"))
        .await
        .unwrap()
        .id;

    let mut handles: Vec<JoinHandle<Result<ReviewStatus, RegistryError>>> = Vec::new();
    for i in 0..6 {
        let status = ReviewStatus::ALL[i % 3];
        let registry_a = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry_a
                .update_service_status(&admin(), service_id, status.as_str())
                .await
                .map(|service| service.status)
        }));
        let registry_b = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry_b
                .update_service_submission_status(&admin(), submission_id, status.as_str())
                .await
                .map(|submission| submission.status)
        }));
    }

    for outcome in settle(handles).await {
        outcome.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_for_one_organization_all_commit() {
    let (_dir, registry) = file_registry().await;
    let organization_id = approved_organization(&registry).await.id;

    let handles = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .create_service_submission(&owner(), submission(organization_id, &format!("Service {i}")))
                    .await
            })
        })
        .collect();

    for outcome in settle(handles).await {
        assert_eq!(outcome.unwrap().organization_id, organization_id);
    }
    assert_eq!(count_rows(&registry, "service_submissions").await, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_promotions_leave_one_live_organization() {
    let (_dir, registry) = file_registry().await;

    for round in 0..5 {
        let id = staged(&registry, &format!("Galle Office {round}")).await;
        let handles = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .transition_pending_organization(&admin(), id, "approved", StatusAction::Move)
                        .await
                        .map(|committed| committed.value)
                })
            })
            .collect();

        single_winner(&settle(handles).await);
    }

    assert_eq!(count_rows(&registry, "organizations").await, 5);
    assert_eq!(count_rows(&registry, "services").await, 10);
    assert_eq!(count_rows(&registry, "pending_organizations").await, 0);
    assert_eq!(count_rows(&registry, "pending_services").await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_promotion_racing_delete_never_orphans_rows() {
    let (_dir, registry) = file_registry().await;
    let mut promoted = 0;

    for round in 0..10 {
        let id = staged(&registry, &format!("Jaffna Office {round}")).await;

        let promoting = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .transition_pending_organization(&admin(), id, "approved", StatusAction::Move)
                    .await
                    .map(|_| ())
            })
        };
        let deleting = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.delete_pending_organization(&owner(), id).await.map(|_| ()) })
        };

        if single_winner(&settle(vec![promoting, deleting]).await) == 0 {
            promoted += 1;
        }

        assert_eq!(count_rows(&registry, "pending_organizations").await, 0);
        assert_eq!(count_rows(&registry, "pending_services").await, 0);
        assert_eq!(count_rows(&registry, "organizations").await, promoted);
        assert_eq!(count_rows(&registry, "services").await, promoted * 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submit_racing_delete_moves_or_drops_the_submission() {
    let (_dir, registry) = file_registry().await;
    let organization = approved_organization(&registry).await;
    let mut moved = 0;

    for round in 0..10 {
        let id = registry
            .create_service_submission(&owner(), submission(organization.id, &format!("Service {round}")))
            .await
            .unwrap()
            .id;

        let submitting = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.submit_service_for_approval(&owner(), id).await.map(|_| ()) })
        };
        let deleting = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.delete_service_submission(&owner(), id).await.map(|_| ()) })
        };

        if single_winner(&settle(vec![submitting, deleting]).await) == 0 {
            moved += 1;
        }

        assert_eq!(count_rows(&registry, "service_submissions").await, 0);
        // One service came with the promoted organization
        assert_eq!(count_rows(&registry, "services").await, 1 + moved);
    }
}
