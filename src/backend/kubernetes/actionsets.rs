use async_trait::async_trait;
use reqwest::Method;

use super::{
    KubeClient,
    types::{ACTION_SET_KIND, ActionSet},
};
use crate::{
    backend::{BackendError, BackendResult, DeleteOutcome, RequestStore},
    models::{ExecutionRequest, ExecutionRequestDraft, LabelSelector},
};

fn collection_path(namespace: &str) -> String {
    format!("/apis/cr.kanister.io/v1alpha1/namespaces/{}/actionsets", namespace)
}

#[async_trait]
impl RequestStore for KubeClient {
    async fn create(&self, draft: &ExecutionRequestDraft) -> BackendResult<ExecutionRequest> {
        let manifest = ActionSet::from_draft(draft);
        let created: ActionSet = self
            .send_json(
                self.request(Method::POST, &collection_path(&draft.namespace))
                    .json(&manifest),
            )
            .await?;

        if created.metadata.name.as_deref().is_none_or(str::is_empty) {
            return Err(BackendError::InvalidResponse(format!(
                "created {} has no name",
                ACTION_SET_KIND
            )));
        }
        Ok(created.into_request(&draft.namespace))
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> BackendResult<Vec<ExecutionRequest>> {
        let selector = selector.to_string();
        let sets: Vec<ActionSet> = self
            .list_all(
                &collection_path(namespace),
                (!selector.is_empty()).then_some(selector.as_str()),
            )
            .await?;

        Ok(sets
            .into_iter()
            .map(|set| set.into_request(namespace))
            .collect())
    }

    async fn delete(&self, namespace: &str, name: &str) -> BackendResult<DeleteOutcome> {
        let path = format!("{}/{}", collection_path(namespace), name);
        match self.send(self.request(Method::DELETE, &path)).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(BackendError::NotFound(_)) => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e),
        }
    }
}
