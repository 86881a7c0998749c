//! Retention planning.
//!
//! Pure: takes the listed records and the retention count and decides which
//! records to delete. Executing the plan is the worker's job.

use std::{cmp::Ordering, collections::BTreeMap};

use crate::models::ExecutionRequest;

/// What retention decided for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    /// Shared `generate_name` of the group.
    pub key: String,
    /// Number of records in the group.
    pub size: usize,
    /// `max(0, size - keep)`.
    pub excess: usize,
    /// Complete records among the `excess` oldest, oldest first.
    pub delete: Vec<ExecutionRequest>,
    /// Non-complete records among the `excess` oldest. Left untouched.
    pub skipped: Vec<ExecutionRequest>,
}

/// Deletion plan across every group, ordered by group key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub groups: Vec<GroupPlan>,
    /// Records without the management label. Never grouped or deleted.
    pub unmanaged: usize,
}

impl RetentionPlan {
    /// Records to delete, in execution order.
    pub fn deletions(&self) -> impl Iterator<Item = &ExecutionRequest> {
        self.groups.iter().flat_map(|g| g.delete.iter())
    }

    pub fn deletion_count(&self) -> usize {
        self.groups.iter().map(|g| g.delete.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.groups.iter().map(|g| g.skipped.len()).sum()
    }
}

/// Oldest first. Records without a timestamp sort before all others; ties
/// fall back to the name so the order is total.
fn by_age(a: &ExecutionRequest, b: &ExecutionRequest) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.name.cmp(&b.name))
}

/// Plan which records to delete so each group keeps its `keep` newest.
///
/// Groups are keyed on exact `generate_name`. Within a group the oldest
/// `max(0, n - keep)` records are candidates, and only the complete ones are
/// deleted. A `keep` of zero or less makes every complete record eligible.
/// Records this tool does not manage are dropped before grouping.
pub fn plan(records: Vec<ExecutionRequest>, keep: i64) -> RetentionPlan {
    let mut groups: BTreeMap<String, Vec<ExecutionRequest>> = BTreeMap::new();
    let mut unmanaged = 0;
    for record in records {
        if !record.is_managed() {
            tracing::debug!(
                name = %record.name,
                namespace = %record.namespace,
                "Ignoring execution request without the management label"
            );
            unmanaged += 1;
            continue;
        }
        groups
            .entry(record.generate_name.clone())
            .or_default()
            .push(record);
    }

    let keep = if keep <= 0 {
        0
    } else {
        usize::try_from(keep).unwrap_or(usize::MAX)
    };

    let groups = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(by_age);
            let size = members.len();
            let excess = size.saturating_sub(keep);

            let (delete, skipped): (Vec<_>, Vec<_>) = members
                .into_iter()
                .take(excess)
                .partition(|r| r.state.is_complete());

            GroupPlan {
                key,
                size,
                excess,
                delete,
                skipped,
            }
        })
        .collect();

    RetentionPlan { groups, unmanaged }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::models::{RequestState, managed_labels};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn record(
        key: &str,
        name: &str,
        created_at: Option<DateTime<Utc>>,
        state: RequestState,
    ) -> ExecutionRequest {
        ExecutionRequest {
            name: name.to_string(),
            generate_name: key.to_string(),
            namespace: "kanister".to_string(),
            policy: Some("daily".to_string()),
            subject: None,
            created_at,
            state,
            labels: managed_labels(),
        }
    }

    fn group(states: &[RequestState]) -> Vec<ExecutionRequest> {
        states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                record(
                    "auto-daily-team-a",
                    &format!("t{}", i + 1),
                    Some(at(i as u32 + 1)),
                    state.clone(),
                )
            })
            .collect()
    }

    fn deleted_names(plan: &RetentionPlan) -> Vec<&str> {
        plan.deletions().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_deletes_oldest_complete_beyond_keep() {
        let mut records = group(&vec![RequestState::Complete; 5]);
        records.reverse();

        let plan = plan(records, 3);
        assert_eq!(deleted_names(&plan), vec!["t1", "t2"]);
        assert_eq!(plan.groups[0].excess, 2);
        assert!(plan.groups[0].skipped.is_empty());
    }

    #[test]
    fn test_non_complete_candidate_is_skipped() {
        let records = group(&[
            RequestState::Complete,
            RequestState::Running,
            RequestState::Complete,
            RequestState::Complete,
            RequestState::Complete,
        ]);

        let plan = plan(records, 3);
        assert_eq!(deleted_names(&plan), vec!["t1"]);
        assert_eq!(plan.groups[0].excess, 2);
        assert_eq!(plan.groups[0].skipped[0].name, "t2");
        assert_eq!(plan.skipped_count(), 1);
    }

    #[rstest]
    #[case(5)]
    #[case(6)]
    #[case(100)]
    #[case(i64::MAX)]
    fn test_nothing_deleted_when_group_fits(#[case] keep: i64) {
        let plan = plan(group(&vec![RequestState::Complete; 5]), keep);
        assert_eq!(plan.deletion_count(), 0);
        assert_eq!(plan.groups[0].excess, 0);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    fn test_non_positive_keep_makes_every_complete_record_eligible(#[case] keep: i64) {
        let records = group(&[
            RequestState::Complete,
            RequestState::Failed,
            RequestState::Complete,
        ]);
        let plan = plan(records, keep);
        assert_eq!(deleted_names(&plan), vec!["t1", "t3"]);
        assert_eq!(plan.groups[0].skipped[0].name, "t2");
    }

    #[rstest]
    #[case(RequestState::Pending)]
    #[case(RequestState::Running)]
    #[case(RequestState::Failed)]
    #[case(RequestState::Unknown("cancelled".into()))]
    fn test_never_deletes_non_complete(#[case] state: RequestState) {
        let plan = plan(group(&vec![state; 6]), 1);
        assert_eq!(plan.deletion_count(), 0);
        assert_eq!(plan.skipped_count(), 5);
    }

    #[test]
    fn test_groups_are_independent_and_ordered() {
        let mut records = group(&vec![RequestState::Complete; 3]);
        records.push(record("auto-weekly-team-a", "w1", Some(at(1)), RequestState::Complete));
        records.push(record("auto-daily-team-a-data", "d1", Some(at(1)), RequestState::Complete));
        records.push(record("auto-daily-team-a-data", "d2", Some(at(2)), RequestState::Complete));

        let plan = plan(records, 1);
        let keys: Vec<_> = plan.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["auto-daily-team-a", "auto-daily-team-a-data", "auto-weekly-team-a"]
        );
        assert_eq!(deleted_names(&plan), vec!["t1", "t2", "d1"]);
    }

    #[test]
    fn test_prefix_match_is_exact() {
        let records = vec![
            record("auto-daily-team-a", "a1", Some(at(1)), RequestState::Complete),
            record("auto-daily-team-ab", "b1", Some(at(2)), RequestState::Complete),
        ];
        let plan = plan(records, 1);
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.deletion_count(), 0);
    }

    #[test]
    fn test_ties_and_missing_timestamps() {
        let records = vec![
            record("g", "b", Some(at(1)), RequestState::Complete),
            record("g", "a", Some(at(1)), RequestState::Complete),
            record("g", "z", None, RequestState::Complete),
            record("g", "newest", Some(at(9)), RequestState::Complete),
        ];
        let plan = plan(records, 1);
        assert_eq!(deleted_names(&plan), vec!["z", "a", "b"]);
        assert_eq!(plan.groups[0].size, 4);
    }

    #[test]
    fn test_unlabeled_record_is_never_deleted() {
        let mut foreign = record("auto-daily-team-a", "t0", Some(at(0)), RequestState::Complete);
        foreign.labels.clear();
        let mut records = group(&vec![RequestState::Complete; 3]);
        records.push(foreign);

        let plan = plan(records, 1);
        assert_eq!(deleted_names(&plan), vec!["t1", "t2"]);
        assert_eq!(plan.groups[0].size, 3);
        assert_eq!(plan.unmanaged, 1);
    }

    #[test]
    fn test_empty_input() {
        let plan = plan(Vec::new(), 3);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.deletion_count(), 0);
    }
}
