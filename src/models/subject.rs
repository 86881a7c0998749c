use std::{collections::BTreeMap, fmt};

/// The kind of resource a backup subject refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// A whole namespace (cluster-scoped object).
    Namespace,
    /// A PersistentVolumeClaim living inside a namespace.
    Claim,
}

impl SubjectKind {
    /// Object kind as written into the execution request's object reference.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::Claim => "Pvc",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered resource that may request backups through its annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    /// Owning namespace. Always `None` for namespace subjects.
    pub namespace: Option<String>,
    pub annotations: BTreeMap<String, String>,
}

impl Subject {
    pub fn namespace(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Namespace,
            name: name.into(),
            namespace: None,
            annotations: BTreeMap::new(),
        }
    }

    pub fn claim(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Claim,
            name: name.into(),
            namespace: Some(namespace.into()),
            annotations: BTreeMap::new(),
        }
    }

    /// Add an annotation to the subject.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Reference to this subject, as embedded in execution requests.
    pub fn reference(&self) -> SubjectRef {
        SubjectRef {
            kind: self.kind,
            name: self.name.clone(),
            namespace: match self.kind {
                SubjectKind::Namespace => None,
                SubjectKind::Claim => self.namespace.clone(),
            },
        }
    }
}

/// Which set of subjects to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectScope {
    /// All namespaces in the cluster.
    Namespaces,
    /// All claims in one namespace.
    Claims { namespace: String },
}

/// Kind/name/namespace of the subject that triggered an execution request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub name: String,
    pub namespace: Option<String>,
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_reference_has_no_namespace() {
        let subject = Subject::namespace("team-a");
        let reference = subject.reference();
        assert_eq!(reference.kind, SubjectKind::Namespace);
        assert_eq!(reference.name, "team-a");
        assert_eq!(reference.namespace, None);
        assert_eq!(reference.to_string(), "Namespace/team-a");
    }

    #[test]
    fn test_claim_reference_keeps_namespace() {
        let reference = Subject::claim("team-a", "data").reference();
        assert_eq!(reference.kind, SubjectKind::Claim);
        assert_eq!(reference.namespace.as_deref(), Some("team-a"));
        assert_eq!(reference.to_string(), "Pvc/team-a/data");
    }
}
