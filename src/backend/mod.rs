//! Collaborators the synchronizer talks through.
//!
//! Two seams, both injected as trait objects:
//!
//! - [`ResourceCatalog`]: enumerates namespaces and claims with their annotations.
//! - [`RequestStore`]: creates, lists, and deletes execution requests.
//!
//! [`kubernetes::KubeClient`] implements both against the Kubernetes API;
//! [`memory::MemoryBackend`] implements both in memory for tests.

mod error;
pub mod kubernetes;
pub mod memory;

use async_trait::async_trait;
pub use error::{BackendError, BackendResult};

use crate::models::{
    ExecutionRequest, ExecutionRequestDraft, LabelSelector, Subject, SubjectScope,
};

/// Source of backup subjects.
///
/// Implementations return complete annotation maps and handle pagination
/// themselves.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn list_subjects(&self, scope: &SubjectScope) -> BackendResult<Vec<Subject>>;
}

/// Outcome of a delete call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The record was already gone (e.g. removed by a concurrent run).
    NotFound,
}

/// Storage for execution requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Create a request. The backend assigns the name suffix and creation time.
    async fn create(&self, draft: &ExecutionRequestDraft) -> BackendResult<ExecutionRequest>;

    /// List requests in `namespace` matching `selector`.
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> BackendResult<Vec<ExecutionRequest>>;

    /// Delete a request by its full name.
    async fn delete(&self, namespace: &str, name: &str) -> BackendResult<DeleteOutcome>;
}
