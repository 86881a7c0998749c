//! Generation and cleanup of Kanister execution requests.
//!
//! A run has two phases that never interleave:
//!
//! 1. Generation: discover namespaces and claims, read the blueprint
//!    annotation of each, and create one execution request per
//!    (subject, policy) pair. The first discovery or create error ends the
//!    run.
//! 2. Cleanup: list the managed requests in the target namespace and apply
//!    group-wise retention. A failed list ends the run; failed deletions are
//!    reported and skipped.
//!
//! Every collaborator call is awaited in turn. Nothing is spawned.

mod error;
pub mod policy;
pub mod request;

use std::sync::Arc;

pub use error::SyncError;
pub use policy::extract_policies;
pub use request::build_request;

use crate::{
    backend::{RequestStore, ResourceCatalog},
    config::{RetentionConfig, SchedulerConfig},
    models::{Subject, SubjectScope},
    retention::{self, CleanupRunResult},
};

/// Counters from the generation phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub namespaces_discovered: usize,
    pub claims_discovered: usize,
    /// Subjects that carried at least one policy.
    pub subjects_processed: usize,
    pub requests_created: usize,
}

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub generation: GenerationResult,
    pub cleanup: CleanupRunResult,
}

/// Drives one reconciliation run against injected collaborators.
pub struct Synchronizer {
    catalog: Arc<dyn ResourceCatalog>,
    store: Arc<dyn RequestStore>,
    namespace: String,
    retention: RetentionConfig,
}

impl Synchronizer {
    pub fn new(
        catalog: Arc<dyn ResourceCatalog>,
        store: Arc<dyn RequestStore>,
        namespace: impl Into<String>,
        retention: RetentionConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            namespace: namespace.into(),
            retention,
        }
    }

    /// Build a synchronizer from loaded configuration.
    pub fn from_config(
        catalog: Arc<dyn ResourceCatalog>,
        store: Arc<dyn RequestStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(
            catalog,
            store,
            config.sync.namespace.clone(),
            config.retention.clone(),
        )
    }

    /// Run generation, then cleanup.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let generation = self.generate().await?;
        let cleanup = self.cleanup().await?;

        tracing::info!(
            namespaces = generation.namespaces_discovered,
            claims = generation.claims_discovered,
            subjects = generation.subjects_processed,
            created = generation.requests_created,
            groups = cleanup.groups,
            deleted = cleanup.deleted,
            not_found = cleanup.not_found,
            skipped_incomplete = cleanup.skipped_incomplete,
            would_delete = cleanup.would_delete,
            failed_deletions = cleanup.failures.len(),
            "Run complete"
        );

        Ok(RunSummary {
            generation,
            cleanup,
        })
    }

    /// Generation phase.
    ///
    /// Namespaces are processed first. Claims are then listed in every
    /// namespace, annotated or not, and processed only once all of them are
    /// known, so a failing claim listing creates no claim requests.
    pub async fn generate(&self) -> Result<GenerationResult, SyncError> {
        let mut result = GenerationResult::default();

        let namespaces = self
            .catalog
            .list_subjects(&SubjectScope::Namespaces)
            .await
            .map_err(SyncError::Discovery)?;
        result.namespaces_discovered = namespaces.len();
        tracing::info!(count = namespaces.len(), "Discovered namespaces");

        for namespace in &namespaces {
            self.process_subject(namespace, &mut result).await?;
        }

        let mut claims = Vec::new();
        for namespace in &namespaces {
            let found = self
                .catalog
                .list_subjects(&SubjectScope::Claims {
                    namespace: namespace.name.clone(),
                })
                .await
                .map_err(SyncError::Discovery)?;
            tracing::debug!(
                namespace = %namespace.name,
                count = found.len(),
                "Listed claims"
            );
            claims.extend(found);
        }
        result.claims_discovered = claims.len();
        tracing::info!(count = claims.len(), "Discovered claims");

        for claim in &claims {
            self.process_subject(claim, &mut result).await?;
        }

        Ok(result)
    }

    /// Cleanup phase.
    pub async fn cleanup(&self) -> Result<CleanupRunResult, SyncError> {
        retention::run_cleanup(self.store.as_ref(), &self.namespace, &self.retention).await
    }

    async fn process_subject(
        &self,
        subject: &Subject,
        result: &mut GenerationResult,
    ) -> Result<(), SyncError> {
        let policies = extract_policies(&subject.annotations);
        if policies.is_empty() {
            tracing::trace!(kind = %subject.kind, name = %subject.name, "No backup policies");
            return Ok(());
        }

        tracing::info!(
            kind = %subject.kind,
            name = %subject.name,
            namespace = subject.namespace.as_deref().unwrap_or_default(),
            policies = ?policies,
            "Processing subject"
        );
        result.subjects_processed += 1;

        for policy in &policies {
            let draft = build_request(subject, policy, &self.namespace);
            tracing::debug!(
                generate_name = %draft.generate_name,
                namespace = %draft.namespace,
                policy = %policy,
                "Creating execution request"
            );

            let created = self
                .store
                .create(&draft)
                .await
                .map_err(|source| SyncError::Create {
                    generate_name: draft.generate_name.clone(),
                    source,
                })?;

            tracing::info!(
                name = %created.name,
                generate_name = %created.generate_name,
                namespace = %created.namespace,
                policy = %policy,
                subject = %draft.subject,
                "Created execution request"
            );
            result.requests_created += 1;
        }

        Ok(())
    }
}
