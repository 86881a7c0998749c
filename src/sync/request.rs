//! Builds execution request drafts for (subject, policy) pairs.

use crate::models::{ExecutionRequestDraft, Subject, SubjectKind, managed_labels};

const PREFIX: &str = "auto";

/// Grouping key for requests born from `subject` and `policy`.
///
/// Namespaces yield `auto-<policy>-<name>`, claims yield
/// `auto-<policy>-<namespace>-<name>`.
pub fn generate_name(subject: &Subject, policy: &str) -> String {
    match subject.kind {
        SubjectKind::Namespace => format!("{}-{}-{}", PREFIX, policy, subject.name),
        SubjectKind::Claim => format!(
            "{}-{}-{}-{}",
            PREFIX,
            policy,
            subject.namespace.as_deref().unwrap_or_default(),
            subject.name
        ),
    }
}

/// Draft of the request to create in `target_namespace`.
pub fn build_request(
    subject: &Subject,
    policy: &str,
    target_namespace: &str,
) -> ExecutionRequestDraft {
    ExecutionRequestDraft {
        generate_name: generate_name(subject, policy),
        namespace: target_namespace.to_string(),
        policy: policy.to_string(),
        subject: subject.reference(),
        labels: managed_labels(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{APP_ID, MANAGED_BY_LABEL, SubjectRef};

    #[test]
    fn test_namespace_request() {
        let draft = build_request(&Subject::namespace("team-a"), "daily", "kanister");

        assert_eq!(draft.generate_name, "auto-daily-team-a");
        assert_eq!(draft.namespace, "kanister");
        assert_eq!(draft.policy, "daily");
        assert_eq!(
            draft.subject,
            SubjectRef {
                kind: SubjectKind::Namespace,
                name: "team-a".into(),
                namespace: None,
            }
        );
        assert_eq!(draft.labels.get(MANAGED_BY_LABEL).map(String::as_str), Some(APP_ID));
    }

    #[test]
    fn test_claim_request() {
        let draft = build_request(&Subject::claim("team-a", "data"), "daily", "backups");

        assert_eq!(draft.generate_name, "auto-daily-team-a-data");
        assert_eq!(draft.namespace, "backups");
        assert_eq!(draft.subject.kind, SubjectKind::Claim);
        assert_eq!(draft.subject.namespace.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_generate_name_is_deterministic() {
        let subject = Subject::claim("team-a", "data").with_annotation("x", "y");
        assert_eq!(
            generate_name(&subject, "weekly"),
            generate_name(&subject.clone(), "weekly")
        );
        assert_ne!(
            generate_name(&subject, "weekly"),
            generate_name(&subject, "daily")
        );
    }

    #[test]
    fn test_annotations_do_not_affect_draft() {
        let plain = build_request(&Subject::namespace("team-a"), "daily", "kanister");
        let annotated = build_request(
            &Subject::namespace("team-a").with_annotation("foo", "bar"),
            "daily",
            "kanister",
        );
        assert_eq!(plain, annotated);
    }
}
