//! Executes a retention plan against the request store.

use crate::{
    backend::{DeleteOutcome, RequestStore},
    config::RetentionConfig,
    models::LabelSelector,
    sync::SyncError,
};

use super::engine;

/// A deletion that failed. Recorded and logged; never aborts cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub name: String,
    pub namespace: String,
    pub error: String,
}

/// Results from a single cleanup run.
#[derive(Debug, Default)]
pub struct CleanupRunResult {
    /// Number of groups seen.
    pub groups: usize,
    /// Records deleted.
    pub deleted: usize,
    /// Records already gone when the delete was issued.
    pub not_found: usize,
    /// Non-complete records among the excess that were left in place.
    pub skipped_incomplete: usize,
    /// Records that would have been deleted in dry-run mode.
    pub would_delete: usize,
    pub failures: Vec<DeletionFailure>,
}

impl CleanupRunResult {
    /// Check if any records were deleted.
    pub fn has_deletions(&self) -> bool {
        self.deleted > 0
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Run one cleanup pass over the managed requests in `namespace`.
///
/// Only a failed list is fatal. Each deletion is attempted independently and
/// failures are collected in the result.
pub async fn run_cleanup(
    store: &dyn RequestStore,
    namespace: &str,
    config: &RetentionConfig,
) -> Result<CleanupRunResult, SyncError> {
    let records = store
        .list(namespace, &LabelSelector::managed())
        .await
        .map_err(SyncError::List)?;

    tracing::info!(
        namespace = %namespace,
        records = records.len(),
        keep_completed = config.keep_completed,
        dry_run = config.dry_run,
        "Listed execution requests for cleanup"
    );

    let plan = engine::plan(records, config.keep_completed);
    let mut result = CleanupRunResult {
        groups: plan.groups.len(),
        skipped_incomplete: plan.skipped_count(),
        ..Default::default()
    };

    for group in &plan.groups {
        for skipped in &group.skipped {
            tracing::debug!(
                group = %group.key,
                name = %skipped.name,
                state = %skipped.state,
                "Keeping execution request that is not complete"
            );
        }

        for record in &group.delete {
            if config.dry_run {
                tracing::info!(
                    group = %group.key,
                    name = %record.name,
                    namespace = %record.namespace,
                    "DRY RUN: Would delete execution request"
                );
                result.would_delete += 1;
                continue;
            }

            tracing::info!(
                group = %group.key,
                name = %record.name,
                namespace = %record.namespace,
                "Deleting execution request"
            );

            match store.delete(&record.namespace, &record.name).await {
                Ok(DeleteOutcome::Deleted) => {
                    tracing::info!(name = %record.name, "Deleted execution request");
                    result.deleted += 1;
                }
                Ok(DeleteOutcome::NotFound) => {
                    tracing::info!(name = %record.name, "Execution request already deleted");
                    result.not_found += 1;
                }
                Err(e) => {
                    tracing::error!(
                        name = %record.name,
                        namespace = %record.namespace,
                        error = %e,
                        "Failed to delete execution request"
                    );
                    result.failures.push(DeletionFailure {
                        name: record.name.clone(),
                        namespace: record.namespace.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    Ok(result)
}
