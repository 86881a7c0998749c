//! In-memory catalog and request store.
//!
//! Behaves like the Kubernetes backend where it matters to the synchronizer:
//! names get a random suffix on create, creation timestamps are strictly
//! increasing, listing filters by namespace and label selector, and deleting
//! a missing record reports [`DeleteOutcome::NotFound`]. Failures can be
//! injected per operation.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;

use super::{BackendError, BackendResult, DeleteOutcome, RequestStore, ResourceCatalog};
use crate::models::{
    ExecutionRequest, ExecutionRequestDraft, LabelSelector, RequestState, Subject, SubjectScope,
};

/// Alphabet Kubernetes uses for `generateName` suffixes (no vowels, no
/// look-alike digits).
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const SUFFIX_LEN: usize = 5;

#[derive(Default)]
struct Inner {
    namespaces: Vec<Subject>,
    claims: Vec<Subject>,
    requests: Vec<ExecutionRequest>,
    last_created_at: Option<DateTime<Utc>>,
    creates: usize,
    deleted: Vec<String>,
    fail_catalog: bool,
    fail_claims: HashSet<String>,
    fail_create_after: Option<usize>,
    fail_list: bool,
    fail_delete: HashSet<String>,
}

impl Inner {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn unique_name(&self, prefix: &str) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let suffix: String = (0..SUFFIX_LEN)
                .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
                .collect();
            let name = format!("{}-{}", prefix, suffix);
            if !self.requests.iter().any(|r| r.name == name) {
                return name;
            }
        }
    }
}

/// In-memory implementation of [`ResourceCatalog`] and [`RequestStore`].
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace subject.
    pub fn add_namespace(&self, subject: Subject) {
        self.inner.lock().namespaces.push(subject);
    }

    /// Register a claim subject. Its namespace decides which scope lists it.
    pub fn add_claim(&self, subject: Subject) {
        self.inner.lock().claims.push(subject);
    }

    /// Seed a stored request as-is (name, timestamp and state included).
    pub fn insert_request(&self, request: ExecutionRequest) {
        let mut inner = self.inner.lock();
        if let Some(ts) = request.created_at
            && inner.last_created_at.is_none_or(|last| ts > last)
        {
            inner.last_created_at = Some(ts);
        }
        inner.requests.push(request);
    }

    /// Change the state of a stored request, as the executor would.
    pub fn set_state(&self, name: &str, state: RequestState) -> bool {
        let mut inner = self.inner.lock();
        match inner.requests.iter_mut().find(|r| r.name == name) {
            Some(request) => {
                request.state = state;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all stored requests in insertion order.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.inner.lock().requests.clone()
    }

    /// Names removed through [`RequestStore::delete`], in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().deleted.clone()
    }

    /// Number of successful create calls.
    pub fn create_count(&self) -> usize {
        self.inner.lock().creates
    }

    /// Make every catalog call fail.
    pub fn fail_catalog(&self) {
        self.inner.lock().fail_catalog = true;
    }

    /// Make listing the claims of `namespace` fail.
    pub fn fail_claims_in(&self, namespace: impl Into<String>) {
        self.inner.lock().fail_claims.insert(namespace.into());
    }

    /// Let `n` creates succeed, then fail every following create.
    pub fn fail_create_after(&self, n: usize) {
        self.inner.lock().fail_create_after = Some(n);
    }

    /// Make every list call fail.
    pub fn fail_list(&self) {
        self.inner.lock().fail_list = true;
    }

    /// Make deleting `name` fail.
    pub fn fail_delete(&self, name: impl Into<String>) {
        self.inner.lock().fail_delete.insert(name.into());
    }
}

#[async_trait]
impl ResourceCatalog for MemoryBackend {
    async fn list_subjects(&self, scope: &SubjectScope) -> BackendResult<Vec<Subject>> {
        let inner = self.inner.lock();
        if inner.fail_catalog {
            return Err(BackendError::Internal("catalog unavailable".into()));
        }
        Ok(match scope {
            SubjectScope::Namespaces => inner.namespaces.clone(),
            SubjectScope::Claims { namespace } if inner.fail_claims.contains(namespace) => {
                return Err(BackendError::Internal(format!(
                    "claims in {} unavailable",
                    namespace
                )));
            }
            SubjectScope::Claims { namespace } => inner
                .claims
                .iter()
                .filter(|c| c.namespace.as_deref() == Some(namespace.as_str()))
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl RequestStore for MemoryBackend {
    async fn create(&self, draft: &ExecutionRequestDraft) -> BackendResult<ExecutionRequest> {
        let mut inner = self.inner.lock();
        if inner.fail_create_after.is_some_and(|n| inner.creates >= n) {
            return Err(BackendError::Api {
                status: 500,
                message: format!("rejected create of {}", draft.generate_name),
            });
        }

        let request = ExecutionRequest {
            name: inner.unique_name(&draft.generate_name),
            generate_name: draft.generate_name.clone(),
            namespace: draft.namespace.clone(),
            policy: Some(draft.policy.clone()),
            subject: Some(draft.subject.clone()),
            created_at: Some(inner.next_timestamp()),
            state: RequestState::Pending,
            labels: draft.labels.clone(),
        };
        inner.creates += 1;
        inner.requests.push(request.clone());
        Ok(request)
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> BackendResult<Vec<ExecutionRequest>> {
        let inner = self.inner.lock();
        if inner.fail_list {
            return Err(BackendError::Internal("list unavailable".into()));
        }
        Ok(inner
            .requests
            .iter()
            .filter(|r| r.namespace == namespace && selector.matches(&r.labels))
            .cloned()
            .collect())
    }

    async fn delete(&self, namespace: &str, name: &str) -> BackendResult<DeleteOutcome> {
        let mut inner = self.inner.lock();
        if inner.fail_delete.contains(name) {
            return Err(BackendError::Api {
                status: 500,
                message: format!("rejected delete of {}", name),
            });
        }
        let Some(pos) = inner
            .requests
            .iter()
            .position(|r| r.namespace == namespace && r.name == name)
        else {
            return Ok(DeleteOutcome::NotFound);
        };
        inner.requests.remove(pos);
        inner.deleted.push(name.to_string());
        Ok(DeleteOutcome::Deleted)
    }
}
