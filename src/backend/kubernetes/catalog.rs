use async_trait::async_trait;

use super::{KubeClient, types::MetadataOnly};
use crate::{
    backend::{BackendResult, ResourceCatalog},
    models::{Subject, SubjectScope},
};

#[async_trait]
impl ResourceCatalog for KubeClient {
    async fn list_subjects(&self, scope: &SubjectScope) -> BackendResult<Vec<Subject>> {
        let subjects: Vec<Subject> = match scope {
            SubjectScope::Namespaces => self
                .list_all::<MetadataOnly>("/api/v1/namespaces", None)
                .await?
                .into_iter()
                .filter_map(MetadataOnly::into_namespace_subject)
                .collect(),
            SubjectScope::Claims { namespace } => self
                .list_all::<MetadataOnly>(
                    &format!("/api/v1/namespaces/{}/persistentvolumeclaims", namespace),
                    None,
                )
                .await?
                .into_iter()
                .filter_map(|item| item.into_claim_subject(namespace))
                .collect(),
        };

        tracing::debug!(scope = ?scope, count = subjects.len(), "Listed subjects");
        Ok(subjects)
    }
}
