use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};

use super::{APP_ID, MANAGED_BY_LABEL, SubjectRef};

/// Lifecycle state of an execution request, as reported by the executor.
///
/// Decoded once when a record is read from the store. Only
/// [`RequestState::Complete`] has any meaning to retention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    /// Created but not yet picked up. Records without a status land here.
    #[default]
    Pending,
    Running,
    Complete,
    Failed,
    /// Any other value the executor reports.
    Unknown(String),
}

impl RequestState {
    /// Decode the executor's `status.state` string.
    pub fn from_status(state: Option<&str>) -> Self {
        match state {
            None | Some("") | Some("pending") => Self::Pending,
            Some("running") => Self::Running,
            Some("complete") => Self::Complete,
            Some("failed") => Self::Failed,
            Some(other) => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Unknown(s) => s,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An execution request ready to be submitted to the store.
///
/// `generate_name` is a prefix: the store appends a uniquifying suffix when
/// it creates the record. The prefix is also the retention grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequestDraft {
    pub generate_name: String,
    /// Namespace the request is created in (not the subject's namespace).
    pub namespace: String,
    pub policy: String,
    pub subject: SubjectRef,
    pub labels: BTreeMap<String, String>,
}

/// An execution request as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Full backend-assigned name (prefix plus suffix).
    pub name: String,
    /// Grouping key. Empty for records created without a prefix.
    pub generate_name: String,
    pub namespace: String,
    pub policy: Option<String>,
    pub subject: Option<SubjectRef>,
    pub created_at: Option<DateTime<Utc>>,
    pub state: RequestState,
    pub labels: BTreeMap<String, String>,
}

impl ExecutionRequest {
    /// Whether the record carries the management label.
    pub fn is_managed(&self) -> bool {
        self.labels.get(MANAGED_BY_LABEL).map(String::as_str) == Some(APP_ID)
    }
}

/// Equality-based label selector (`key=value,key2=value2`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// The selector matching every request this tool owns.
    pub fn managed() -> Self {
        Self::default().with(MANAGED_BY_LABEL, APP_ID)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.match_labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

/// Labels attached to every request this tool creates.
pub fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), APP_ID.to_string())])
}
