//! The registry facade: every client-visible operation, guarded and logged.
//!
//! Each operation checks the caller first, validates input, then performs its
//! write in a single transaction. Document generation happens after the
//! commit and can only ever add a warning to a successful result.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn, Instrument};

use crate::config::DocumentConfig;
use crate::documents::{DocumentPipeline, LocalBlobStore, DocxDocumentGenerator};
use crate::error::{RegistryError, Result};
use crate::models::{
    Organization, OrganizationDetails, OrganizationDraft, PendingOrganization,
    PendingOrganizationDetails, Service, ServiceSubmission, ServicesUpdate, SubmissionDraft,
};
use crate::observability::{OperationTimer, WorkflowMetrics};
use crate::store;
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::workflow::promotion;
use crate::workflow::status::{self, ReviewStatus, StatusAction};
use crate::workflow::Actor;

/// A committed write, possibly with a non-fatal problem from a side effect
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub warning: Option<RegistryError>,
}

impl<T> Committed<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// What a pending organization status change did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PendingTransition {
    StatusChanged(PendingOrganization),
    Promoted(OrganizationDetails),
}

pub struct Registry {
    pool: SqlitePool,
    documents: Option<DocumentPipeline>,
    metrics: Arc<WorkflowMetrics>,
}

impl Registry {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            documents: None,
            metrics: Arc::new(WorkflowMetrics::new()),
        }
    }

    /// Build a registry with the document pipeline described by `config`
    pub fn from_config(pool: SqlitePool, config: &DocumentConfig) -> Self {
        let registry = Self::new(pool);
        if !config.enabled {
            info!("Registration documents disabled");
            return registry;
        }

        let generator = DocxDocumentGenerator::new(
            config.pdf_converter.clone(),
            config.pdf_converter_args.clone(),
        );
        let blobs = LocalBlobStore::new(&config.storage_dir, config.public_base_url.clone());
        registry.with_documents(DocumentPipeline::new(Arc::new(generator), Arc::new(blobs)))
    }

    pub fn with_documents(mut self, documents: DocumentPipeline) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn metrics(&self) -> Arc<WorkflowMetrics> {
        Arc::clone(&self.metrics)
    }

    // ----- pending organizations -----

    pub async fn create_pending_organization(
        &self,
        actor: &Actor,
        draft: OrganizationDraft,
    ) -> Result<PendingOrganizationDetails> {
        self.traced("create_pending_organization", actor, None, async {
            draft.validate()?;

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let organization =
                store::pending::insert_organization(&mut tx, &actor.user_id, &draft.profile, now)
                    .await?;
            let services =
                store::pending::insert_services(&mut tx, organization.id, &draft.services, now)
                    .await?;
            tx.commit().await?;

            info!(
                pending_id = organization.id,
                services = services.len(),
                "Pending organization submitted"
            );
            Ok(PendingOrganizationDetails {
                organization,
                services,
            })
        })
        .await
    }

    /// All pending organizations, optionally filtered by status
    pub async fn list_pending_organizations(
        &self,
        actor: &Actor,
        status: Option<&str>,
    ) -> Result<Vec<PendingOrganization>> {
        actor.require_admin("list all pending organizations")?;
        let status = parse_filter(status)?;

        let mut conn = self.pool.acquire().await?;
        store::pending::list_organizations(&mut conn, status).await
    }

    pub async fn list_my_pending_organizations(
        &self,
        actor: &Actor,
    ) -> Result<Vec<PendingOrganization>> {
        let mut conn = self.pool.acquire().await?;
        store::pending::list_organizations_by_owner(&mut conn, &actor.user_id).await
    }

    pub async fn get_pending_organization(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<PendingOrganizationDetails> {
        let mut conn = self.pool.acquire().await?;
        let organization = store::pending::get_organization(&mut conn, id)
            .await?
            .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
        actor.require_owner_or_admin(&organization.owner_user_id, "view this pending organization")?;

        let services = store::pending::list_services(&mut conn, id).await?;
        Ok(PendingOrganizationDetails {
            organization,
            services,
        })
    }

    /// Replace the profile and the staged services of a draft
    pub async fn update_pending_organization(
        &self,
        actor: &Actor,
        id: i64,
        draft: OrganizationDraft,
    ) -> Result<PendingOrganizationDetails> {
        self.traced("update_pending_organization", actor, Some(id), async {
            draft.validate()?;

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let current = store::pending::claim_organization(&mut tx, id, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
            actor.require_staged_edit(&current.owner_user_id, current.status)?;

            let organization = store::pending::update_profile(&mut tx, id, &draft.profile, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
            store::pending::take_services(&mut tx, id).await?;
            let services = store::pending::insert_services(&mut tx, id, &draft.services, now).await?;
            tx.commit().await?;

            Ok(PendingOrganizationDetails {
                organization,
                services,
            })
        })
        .await
    }

    /// Replace only the staged services of a draft
    pub async fn update_pending_services(
        &self,
        actor: &Actor,
        id: i64,
        update: ServicesUpdate,
    ) -> Result<PendingOrganizationDetails> {
        self.traced("update_pending_services", actor, Some(id), async {
            update.validate()?;

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let organization = store::pending::claim_organization(&mut tx, id, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
            actor.require_staged_edit(&organization.owner_user_id, organization.status)?;

            let replaced = store::pending::take_services(&mut tx, id).await?;
            let services = store::pending::insert_services(&mut tx, id, &update.services, now).await?;
            tx.commit().await?;

            info!(
                pending_id = id,
                replaced = replaced.len(),
                services = services.len(),
                "Pending services replaced"
            );
            Ok(PendingOrganizationDetails {
                organization,
                services,
            })
        })
        .await
    }

    /// Change the review status of a draft, or promote it with [`StatusAction::Move`]
    pub async fn transition_pending_organization(
        &self,
        actor: &Actor,
        id: i64,
        status: &str,
        action: StatusAction,
    ) -> Result<Committed<PendingTransition>> {
        self.traced("transition_pending_organization", actor, Some(id), async {
            actor.require_admin("change the status of a pending organization")?;
            let target: ReviewStatus = status.parse()?;

            if action == StatusAction::Move {
                if target != ReviewStatus::Approved {
                    return Err(RegistryError::invalid_field(
                        "action",
                        format!("move requires status approved, got {target}"),
                    ));
                }

                let mut details = promotion::promote_organization(&self.pool, id).await?;
                self.metrics.record_promotion();
                let warning = self.attach_documents(&mut details).await;
                return Ok(Committed {
                    value: PendingTransition::Promoted(details),
                    warning,
                });
            }

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let current = store::pending::claim_organization(&mut tx, id, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
            let change = status::transition(current.status, target);
            let updated = store::pending::set_status(&mut tx, id, change.to, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("pending organization", id))?;
            tx.commit().await?;

            self.metrics.record_transition();
            info!(pending_id = id, from = %change.from, to = %change.to, reaffirmed = change.is_noop(), "Pending organization status changed");
            Ok(Committed::clean(PendingTransition::StatusChanged(updated)))
        })
        .await
    }

    pub async fn delete_pending_organization(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<PendingOrganizationDetails> {
        self.traced("delete_pending_organization", actor, Some(id), async {
            let current = {
                let mut conn = self.pool.acquire().await?;
                store::pending::get_organization(&mut conn, id)
                    .await?
                    .ok_or_else(|| RegistryError::not_found("pending organization", id))?
            };
            actor.require_owner_or_admin(&current.owner_user_id, "delete this pending organization")?;

            let deleted = promotion::delete_pending_organization(&self.pool, id).await?;
            self.metrics.record_deletion();
            Ok(deleted)
        })
        .await
    }

    /// Number of drafts still waiting for review
    pub async fn pending_count(&self, actor: &Actor) -> Result<i64> {
        actor.require_admin("view the pending count")?;
        let mut conn = self.pool.acquire().await?;
        store::pending::count_organizations(&mut conn, ReviewStatus::Pending).await
    }

    // ----- live organizations -----

    /// Create a live organization directly in the pending state
    pub async fn create_organization(
        &self,
        actor: &Actor,
        draft: OrganizationDraft,
    ) -> Result<Committed<OrganizationDetails>> {
        self.traced("create_organization", actor, None, async {
            draft.validate()?;

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let organization = store::organizations::insert(
                &mut tx,
                &actor.user_id,
                &draft.profile,
                ReviewStatus::Pending,
                now,
            )
            .await?;
            let mut services = Vec::with_capacity(draft.services.len());
            for service in &draft.services {
                services.push(
                    store::services::insert(
                        &mut tx,
                        organization.id,
                        service,
                        ReviewStatus::Pending,
                        now,
                    )
                    .await?,
                );
            }
            tx.commit().await?;

            let mut details = OrganizationDetails {
                organization,
                services,
            };
            let warning = self.attach_documents(&mut details).await;
            Ok(Committed {
                value: details,
                warning,
            })
        })
        .await
    }

    pub async fn list_organizations(
        &self,
        actor: &Actor,
        status: Option<&str>,
    ) -> Result<Vec<Organization>> {
        actor.require_admin("list all organizations")?;
        let status = parse_filter(status)?;

        let mut conn = self.pool.acquire().await?;
        store::organizations::list(&mut conn, status).await
    }

    pub async fn list_my_organizations(&self, actor: &Actor) -> Result<Vec<Organization>> {
        let mut conn = self.pool.acquire().await?;
        store::organizations::list_by_owner(&mut conn, &actor.user_id).await
    }

    pub async fn get_organization(&self, actor: &Actor, id: i64) -> Result<OrganizationDetails> {
        let mut conn = self.pool.acquire().await?;
        let organization = store::organizations::get(&mut conn, id)
            .await?
            .ok_or_else(|| RegistryError::not_found("organization", id))?;
        actor.require_owner_or_admin(&organization.owner_user_id, "view this organization")?;

        let services = store::services::list_for_organization(&mut conn, id).await?;
        Ok(OrganizationDetails {
            organization,
            services,
        })
    }

    /// Owner edit of a live organization still under review
    pub async fn update_organization(
        &self,
        actor: &Actor,
        id: i64,
        draft: OrganizationDraft,
    ) -> Result<Committed<OrganizationDetails>> {
        self.traced("update_organization", actor, Some(id), async {
            draft.validate()?;

            let mut tx = self.pool.begin().await?;
            let now = Utc::now();
            let organization = store::organizations::update_profile(&mut tx, id, &draft.profile, now)
                .await?
                .ok_or_else(|| RegistryError::not_found("organization", id))?;
            // The update holds the write lock; a refused edit rolls back with the transaction
            actor.require_live_edit(&organization.owner_user_id, organization.status)?;

            store::services::delete_for_organization(&mut tx, id).await?;
            let mut services = Vec::with_capacity(draft.services.len());
            for service in &draft.services {
                services.push(
                    store::services::insert(&mut tx, id, service, ReviewStatus::Pending, now).await?,
                );
            }
            tx.commit().await?;

            let mut details = OrganizationDetails {
                organization,
                services,
            };
            let warning = self.attach_documents(&mut details).await;
            Ok(Committed {
                value: details,
                warning,
            })
        })
        .await
    }

    pub async fn update_organization_status(
        &self,
        actor: &Actor,
        id: i64,
        status: &str,
    ) -> Result<Organization> {
        self.traced("update_organization_status", actor, Some(id), async {
            actor.require_admin("change the status of an organization")?;
            let target: ReviewStatus = status.parse()?;

            let mut tx = self.pool.begin().await?;
            let current = store::organizations::claim(&mut tx, id)
                .await?
                .ok_or_else(|| RegistryError::not_found("organization", id))?;
            let change = status::transition(current.status, target);
            let updated = store::organizations::set_status(&mut tx, id, change.to, Utc::now())
                .await?
                .ok_or_else(|| RegistryError::not_found("organization", id))?;
            tx.commit().await?;

            self.metrics.record_transition();
            info!(organization_id = id, from = %change.from, to = %change.to, reaffirmed = change.is_noop(), "Organization status changed");
            Ok(updated)
        })
        .await
    }

    pub async fn delete_organization(&self, actor: &Actor, id: i64) -> Result<Organization> {
        self.traced("delete_organization", actor, Some(id), async {
            actor.require_admin("delete organizations")?;
            let deleted = promotion::delete_organization(&self.pool, id).await?;
            self.metrics.record_deletion();
            Ok(deleted)
        })
        .await
    }

    pub async fn list_organization_services(
        &self,
        actor: &Actor,
        organization_id: i64,
    ) -> Result<Vec<Service>> {
        let mut conn = self.pool.acquire().await?;
        let organization = store::organizations::get(&mut conn, organization_id)
            .await?
            .ok_or_else(|| RegistryError::not_found("organization", organization_id))?;
        actor.require_owner_or_admin(&organization.owner_user_id, "view these services")?;

        store::services::list_for_organization(&mut conn, organization_id).await
    }

    // ----- service submissions -----

    /// Propose a new service for an approved organization the caller owns
    pub async fn create_service_submission(
        &self,
        actor: &Actor,
        draft: SubmissionDraft,
    ) -> Result<ServiceSubmission> {
        self.traced(
            "create_service_submission",
            actor,
            Some(draft.organization_id),
            async {
                draft.service.validate()?;

                let mut tx = self.pool.begin().await?;
                let organization = store::organizations::claim(&mut tx, draft.organization_id)
                    .await?
                    .ok_or_else(|| RegistryError::not_found("organization", draft.organization_id))?;
                if !actor.owns(&organization.owner_user_id) {
                    return Err(RegistryError::forbidden(
                        "only the owner may submit services for this organization",
                    ));
                }
                if organization.status != ReviewStatus::Approved {
                    return Err(RegistryError::forbidden(format!(
                        "organization is {} and cannot take new services",
                        organization.status
                    )));
                }

                let submission = store::submissions::insert(
                    &mut tx,
                    organization.id,
                    &actor.user_id,
                    &draft.service,
                    Utc::now(),
                )
                .await?;
                tx.commit().await?;

                info!(
                    submission_id = submission.id,
                    organization_id = organization.id,
                    "Service submission created"
                );
                Ok(submission)
            },
        )
        .await
    }

    pub async fn list_service_submissions(
        &self,
        actor: &Actor,
        status: Option<&str>,
    ) -> Result<Vec<ServiceSubmission>> {
        actor.require_admin("list all service submissions")?;
        let status = parse_filter(status)?;

        let mut conn = self.pool.acquire().await?;
        store::submissions::list(&mut conn, status).await
    }

    pub async fn list_my_service_submissions(
        &self,
        actor: &Actor,
    ) -> Result<Vec<ServiceSubmission>> {
        let mut conn = self.pool.acquire().await?;
        store::submissions::list_by_owner(&mut conn, &actor.user_id).await
    }

    pub async fn update_service_submission_status(
        &self,
        actor: &Actor,
        id: i64,
        status: &str,
    ) -> Result<ServiceSubmission> {
        self.traced("update_service_submission_status", actor, Some(id), async {
            actor.require_admin("change the status of a service submission")?;
            let target: ReviewStatus = status.parse()?;

            let mut tx = self.pool.begin().await?;
            let current = store::submissions::claim(&mut tx, id)
                .await?
                .ok_or_else(|| RegistryError::not_found("service submission", id))?;
            let change = status::transition(current.status, target);
            let updated = store::submissions::set_status(&mut tx, id, change.to, Utc::now())
                .await?
                .ok_or_else(|| RegistryError::not_found("service submission", id))?;
            tx.commit().await?;

            self.metrics.record_transition();
            info!(submission_id = id, from = %change.from, to = %change.to, reaffirmed = change.is_noop(), "Submission status changed");
            Ok(updated)
        })
        .await
    }

    /// Move a submission into the live services of its organization
    pub async fn submit_service_for_approval(&self, actor: &Actor, id: i64) -> Result<Service> {
        self.traced("submit_service_for_approval", actor, Some(id), async {
            let current = self.find_submission(id).await?;
            actor.require_owner_or_admin(&current.owner_user_id, "submit this service")?;

            let service = promotion::submit_service_for_approval(&self.pool, id).await?;
            self.metrics.record_submission_moved();
            Ok(service)
        })
        .await
    }

    pub async fn delete_service_submission(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<ServiceSubmission> {
        self.traced("delete_service_submission", actor, Some(id), async {
            let current = self.find_submission(id).await?;
            actor.require_owner_or_admin(&current.owner_user_id, "delete this submission")?;

            let deleted = promotion::delete_service_submission(&self.pool, id).await?;
            self.metrics.record_deletion();
            Ok(deleted)
        })
        .await
    }

    // ----- live services -----

    pub async fn update_service_status(
        &self,
        actor: &Actor,
        id: i64,
        status: &str,
    ) -> Result<Service> {
        self.traced("update_service_status", actor, Some(id), async {
            actor.require_admin("change the status of a service")?;
            let target: ReviewStatus = status.parse()?;

            let mut tx = self.pool.begin().await?;
            let current = store::services::claim(&mut tx, id)
                .await?
                .ok_or_else(|| RegistryError::not_found("service", id))?;
            let change = status::transition(current.status, target);
            let updated = store::services::set_status(&mut tx, id, change.to, Utc::now())
                .await?
                .ok_or_else(|| RegistryError::not_found("service", id))?;
            tx.commit().await?;

            self.metrics.record_transition();
            info!(service_id = id, from = %change.from, to = %change.to, reaffirmed = change.is_noop(), "Service status changed");
            Ok(updated)
        })
        .await
    }

    pub async fn delete_service(&self, actor: &Actor, id: i64) -> Result<Service> {
        self.traced("delete_service", actor, Some(id), async {
            actor.require_admin("delete services")?;

            let mut conn = self.pool.acquire().await?;
            let deleted = store::services::delete(&mut conn, id)
                .await?
                .ok_or_else(|| RegistryError::not_found("service", id))?;
            self.metrics.record_deletion();
            Ok(deleted)
        })
        .await
    }

    // ----- helpers -----

    async fn find_submission(&self, id: i64) -> Result<ServiceSubmission> {
        let mut conn = self.pool.acquire().await?;
        store::submissions::get(&mut conn, id)
            .await?
            .ok_or_else(|| RegistryError::not_found("service submission", id))
    }

    /// Generate and store registration documents, reporting any failure as a warning
    async fn attach_documents(&self, details: &mut OrganizationDetails) -> Option<RegistryError> {
        let pipeline = self.documents.as_ref()?;
        let publication = pipeline
            .publish(&details.organization, &details.services)
            .await;

        let urls = publication.urls;
        let mut failure = publication.failure;

        if urls.docx_url.is_some() || urls.pdf_url.is_some() {
            let stored = match self.pool.acquire().await {
                Ok(mut conn) => {
                    store::organizations::set_document_urls(
                        &mut conn,
                        details.organization.id,
                        urls.docx_url.as_deref(),
                        urls.pdf_url.as_deref(),
                    )
                    .await
                }
                Err(e) => Err(e.into()),
            };

            match stored {
                Ok(_) => {
                    details.organization.docx_url = urls.docx_url;
                    details.organization.pdf_url = urls.pdf_url;
                }
                Err(e) => {
                    warn!(organization_id = details.organization.id, error = %e, "Failed to record document URLs");
                    failure.get_or_insert(RegistryError::StorageUnavailable(e.to_string()));
                }
            }
        }

        if failure.is_some() {
            self.metrics.record_document_failure();
        }
        failure
    }

    /// Run an operation inside a correlated span and log its outcome
    async fn traced<T, F>(
        &self,
        operation: &'static str,
        actor: &Actor,
        entity_id: Option<i64>,
        work: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span(operation, &actor.user_id, entity_id, &correlation_id);

        async move {
            let timer = OperationTimer::new(operation);
            let result = work.await;
            match &result {
                Ok(_) => timer.finish(),
                Err(e) => warn!(error = %e, kind = ?e.kind(), "Registry operation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn parse_filter(status: Option<&str>) -> Result<Option<ReviewStatus>> {
    match status.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}
