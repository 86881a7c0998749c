//! Wire types for the parts of the Kubernetes API this tool reads and writes.
//!
//! Only the fields that matter here are modelled; everything else in the
//! server's responses is ignored on decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    BACKUP_ACTION, ExecutionRequest, ExecutionRequestDraft, RequestState, Subject, SubjectKind,
    SubjectRef,
};

pub const KANISTER_API_VERSION: &str = "cr.kanister.io/v1alpha1";
pub const ACTION_SET_KIND: &str = "ActionSet";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMeta {
    #[serde(rename = "continue")]
    pub continue_token: Option<String>,
}

/// Any `*List` response.
#[derive(Debug, Deserialize)]
pub struct ObjectList<T> {
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Option<Vec<T>>,
}

/// Namespace or PersistentVolumeClaim; only metadata is needed.
#[derive(Debug, Deserialize)]
pub struct MetadataOnly {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// `Status` object returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    pub message: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSet {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<ActionSetSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionSetStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionSetSpec {
    pub actions: Option<Vec<ActionSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub blueprint: String,
    #[serde(default)]
    pub object: ObjectReference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionSetStatus {
    pub state: Option<String>,
}

impl MetadataOnly {
    pub fn into_namespace_subject(self) -> Option<Subject> {
        let name = self.metadata.name?;
        Some(Subject {
            kind: SubjectKind::Namespace,
            name,
            namespace: None,
            annotations: self.metadata.annotations.unwrap_or_default(),
        })
    }

    pub fn into_claim_subject(self, namespace: &str) -> Option<Subject> {
        let name = self.metadata.name?;
        Some(Subject {
            kind: SubjectKind::Claim,
            name,
            namespace: Some(self.metadata.namespace.unwrap_or_else(|| namespace.to_string())),
            annotations: self.metadata.annotations.unwrap_or_default(),
        })
    }
}

impl ObjectReference {
    fn from_subject(subject: &SubjectRef) -> Self {
        Self {
            kind: subject.kind.as_str().to_string(),
            name: subject.name.clone(),
            namespace: subject.namespace.clone().unwrap_or_default(),
        }
    }

    fn to_subject(&self) -> Option<SubjectRef> {
        let kind = match self.kind.to_ascii_lowercase().as_str() {
            "namespace" => SubjectKind::Namespace,
            "pvc" | "persistentvolumeclaim" => SubjectKind::Claim,
            _ => return None,
        };
        Some(SubjectRef {
            kind,
            name: self.name.clone(),
            namespace: (!self.namespace.is_empty()).then(|| self.namespace.clone()),
        })
    }
}

impl ActionSet {
    /// Build the ActionSet manifest for a draft. The trailing `-` on
    /// `generateName` makes the server-assigned suffix read as `prefix-xxxxx`.
    pub fn from_draft(draft: &ExecutionRequestDraft) -> Self {
        Self {
            api_version: KANISTER_API_VERSION.to_string(),
            kind: ACTION_SET_KIND.to_string(),
            metadata: ObjectMeta {
                generate_name: Some(format!("{}-", draft.generate_name)),
                namespace: Some(draft.namespace.clone()),
                labels: Some(draft.labels.clone()),
                ..Default::default()
            },
            spec: Some(ActionSetSpec {
                actions: Some(vec![ActionSpec {
                    name: BACKUP_ACTION.to_string(),
                    blueprint: draft.policy.clone(),
                    object: ObjectReference::from_subject(&draft.subject),
                }]),
            }),
            status: None,
        }
    }

    /// Decode into the domain record. `namespace` is used when the server
    /// omits `metadata.namespace`.
    pub fn into_request(self, namespace: &str) -> ExecutionRequest {
        let action = self
            .spec
            .and_then(|spec| spec.actions)
            .and_then(|actions| actions.into_iter().next());
        let generate_name = self
            .metadata
            .generate_name
            .map(|mut g| {
                if g.ends_with('-') {
                    g.pop();
                }
                g
            })
            .unwrap_or_default();

        ExecutionRequest {
            name: self.metadata.name.unwrap_or_default(),
            generate_name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            policy: action.as_ref().map(|a| a.blueprint.clone()),
            subject: action.as_ref().and_then(|a| a.object.to_subject()),
            created_at: self.metadata.creation_timestamp,
            state: RequestState::from_status(
                self.status.as_ref().and_then(|s| s.state.as_deref()),
            ),
            labels: self.metadata.labels.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::managed_labels;

    #[test]
    fn test_manifest_from_claim_draft() {
        let draft = ExecutionRequestDraft {
            generate_name: "auto-daily-team-a-data".into(),
            namespace: "kanister".into(),
            policy: "daily".into(),
            subject: Subject::claim("team-a", "data").reference(),
            labels: managed_labels(),
        };

        let value = serde_json::to_value(ActionSet::from_draft(&draft)).unwrap();
        assert_eq!(
            value,
            json!({
                "apiVersion": "cr.kanister.io/v1alpha1",
                "kind": "ActionSet",
                "metadata": {
                    "generateName": "auto-daily-team-a-data-",
                    "namespace": "kanister",
                    "labels": {"app.kubernetes.io/managed-by": "backup-scheduler"}
                },
                "spec": {
                    "actions": [{
                        "name": "backup",
                        "blueprint": "daily",
                        "object": {"kind": "Pvc", "name": "data", "namespace": "team-a"}
                    }]
                }
            })
        );
    }

    #[test]
    fn test_namespace_object_omits_namespace() {
        let draft = ExecutionRequestDraft {
            generate_name: "auto-daily-team-a".into(),
            namespace: "kanister".into(),
            policy: "daily".into(),
            subject: Subject::namespace("team-a").reference(),
            labels: managed_labels(),
        };
        let value = serde_json::to_value(ActionSet::from_draft(&draft)).unwrap();
        assert_eq!(
            value["spec"]["actions"][0]["object"],
            json!({"kind": "Namespace", "name": "team-a"})
        );
    }

    #[test]
    fn test_decode_stored_action_set() {
        let set: ActionSet = serde_json::from_value(json!({
            "apiVersion": "cr.kanister.io/v1alpha1",
            "kind": "ActionSet",
            "metadata": {
                "name": "auto-daily-team-a-x7k2p",
                "generateName": "auto-daily-team-a-",
                "namespace": "kanister",
                "creationTimestamp": "2024-05-01T10:00:00Z",
                "labels": {"app.kubernetes.io/managed-by": "backup-scheduler"},
                "uid": "ignored"
            },
            "spec": {"actions": [{
                "name": "backup",
                "blueprint": "daily",
                "object": {"kind": "Namespace", "name": "team-a", "apiVersion": "v1"}
            }]},
            "status": {"state": "complete", "actions": []}
        }))
        .unwrap();

        let request = set.into_request("kanister");
        assert_eq!(request.name, "auto-daily-team-a-x7k2p");
        assert_eq!(request.generate_name, "auto-daily-team-a");
        assert_eq!(request.state, RequestState::Complete);
        assert_eq!(request.policy.as_deref(), Some("daily"));
        assert_eq!(
            request.subject,
            Some(Subject::namespace("team-a").reference())
        );
        assert_eq!(
            request.created_at.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
        assert!(request.is_managed());
    }

    #[test]
    fn test_decode_sparse_action_set() {
        let set: ActionSet = serde_json::from_value(json!({
            "metadata": {"name": "manual-run"},
            "spec": null
        }))
        .unwrap();

        let request = set.into_request("kanister");
        assert_eq!(request.name, "manual-run");
        assert_eq!(request.generate_name, "");
        assert_eq!(request.namespace, "kanister");
        assert_eq!(request.state, RequestState::Pending);
        assert!(request.subject.is_none());
        assert!(request.created_at.is_none());
        assert!(!request.is_managed());
    }

    #[test]
    fn test_decode_list_with_null_items() {
        let list: ObjectList<MetadataOnly> =
            serde_json::from_value(json!({"metadata": {}, "items": null})).unwrap();
        assert!(list.items.is_none());
        assert!(list.metadata.continue_token.is_none());
    }

    #[test]
    fn test_claim_subject_falls_back_to_listed_namespace() {
        let item: MetadataOnly = serde_json::from_value(json!({
            "metadata": {"name": "data", "annotations": {"a": "b"}}
        }))
        .unwrap();
        let subject = item.into_claim_subject("team-a").unwrap();
        assert_eq!(subject, Subject::claim("team-a", "data").with_annotation("a", "b"));
    }
}
