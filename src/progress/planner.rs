//! Task reassignment planner.
//!
//! Maps a target distribution onto concrete tasks while keeping as many
//! tasks at their current status as the target allows. Tasks that cannot
//! stay are sorted by current bucket (not started, in progress, done) and
//! poured into the remaining slots in the same bucket order.

use super::ProgressError;
use super::solver::{Bucket, Distribution, IssuePolicy};
use crate::types::{Status, Task};
use serde::{Deserialize, Serialize};
use tracing::error;

/// One planned task write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task_id: String,
    pub title: String,
    pub from: Status,
    pub to: Status,
    /// Task version observed when the plan was made.
    pub version: i64,
}

/// Planned writes for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub target: Distribution,
    pub changes: Vec<StatusChange>,
}

/// Assign every movable task a bucket so the realized split equals `target`.
///
/// Tasks excluded by `policy` are ignored. A realized split that differs
/// from the target is an internal defect and is returned as
/// [`ProgressError::ConsistencyViolation`].
pub fn plan(target: Distribution, tasks: &[Task], policy: IssuePolicy) -> Result<Plan, ProgressError> {
    let movable: Vec<(&Task, Bucket)> = tasks
        .iter()
        .filter_map(|t| Bucket::of(t.status, policy).map(|b| (t, b)))
        .collect();

    let mut assigned: Vec<Option<Bucket>> = vec![None; movable.len()];
    let mut filled = Distribution::default();
    let mut remaining: Vec<usize> = Vec::new();

    // Keep tasks in place while their bucket still has room.
    for (idx, (_, bucket)) in movable.iter().enumerate() {
        if filled.count(*bucket) < target.count(*bucket) {
            *filled.count_mut(*bucket) += 1;
            assigned[idx] = Some(*bucket);
        } else {
            remaining.push(idx);
        }
    }

    // Stable: equal buckets keep input order.
    remaining.sort_by_key(|idx| movable[*idx].1);

    let mut pool = remaining.into_iter();
    for bucket in Bucket::ALL {
        let deficit = target.count(bucket).saturating_sub(filled.count(bucket));
        for idx in pool.by_ref().take(deficit) {
            *filled.count_mut(bucket) += 1;
            assigned[idx] = Some(bucket);
        }
    }

    let realized = assigned
        .iter()
        .flatten()
        .fold(Distribution::default(), |mut dist, bucket| {
            *dist.count_mut(*bucket) += 1;
            dist
        });
    let unassigned = assigned.iter().any(Option::is_none);

    if realized != target || unassigned {
        let task_list: Vec<String> = movable
            .iter()
            .map(|(t, _)| format!("{}:{}", t.id, t.status))
            .collect();
        error!(
            target_distribution = ?target,
            realized_distribution = ?realized,
            tasks = ?task_list,
            "Reassignment plan does not match target distribution"
        );
        return Err(ProgressError::ConsistencyViolation {
            target,
            realized,
            tasks: task_list,
        });
    }

    let changes = movable
        .iter()
        .zip(assigned)
        .filter_map(|((task, current), bucket)| {
            // Compare buckets, not statuses: an issue task kept in the
            // not-started slot is not rewritten.
            let bucket = bucket?;
            (bucket != *current).then(|| StatusChange {
                task_id: task.id.clone(),
                title: task.title.clone(),
                from: task.status,
                to: bucket.status(),
                version: task.version,
            })
        })
        .collect();

    Ok(Plan { target, changes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::aggregate::fixtures::{task, tasks};
    use crate::types::Status::*;

    fn realized_after(tasks: &[Task], plan: &Plan) -> Distribution {
        let mut dist = Distribution::default();
        for t in tasks {
            let status = plan
                .changes
                .iter()
                .find(|c| c.task_id == t.id)
                .map(|c| c.to)
                .unwrap_or(t.status);
            if let Some(b) = Bucket::of(status, IssuePolicy::Fold) {
                *dist.count_mut(b) += 1;
            }
        }
        dist
    }

    #[test]
    fn test_one_done_task_drops_to_not_started() {
        let ts = tasks(&[Done, Done, NotStarted]);
        let plan = plan(Distribution::new(1, 0, 2), &ts, IssuePolicy::Fold).unwrap();

        assert_eq!(plan.changes.len(), 1);
        // The first done task is kept; the second one overflows.
        assert_eq!(plan.changes[0].task_id, "t1");
        assert_eq!(plan.changes[0].from, Done);
        assert_eq!(plan.changes[0].to, NotStarted);
    }

    #[test]
    fn test_matching_distribution_changes_nothing() {
        let ts = tasks(&[Done, InProgress, NotStarted]);
        let plan = plan(Distribution::new(1, 1, 1), &ts, IssuePolicy::Fold).unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_overflow_fills_lower_buckets_first() {
        // Everything done; target wants one of each.
        let ts = tasks(&[Done, Done, Done]);
        let plan = plan(Distribution::new(1, 1, 1), &ts, IssuePolicy::Fold).unwrap();

        assert_eq!(plan.changes.len(), 2);
        assert_eq!(plan.changes[0].task_id, "t1");
        assert_eq!(plan.changes[0].to, NotStarted);
        assert_eq!(plan.changes[1].task_id, "t2");
        assert_eq!(plan.changes[1].to, InProgress);
        assert_eq!(realized_after(&ts, &plan), Distribution::new(1, 1, 1));
    }

    #[test]
    fn test_remaining_pool_sorted_by_current_bucket() {
        // Target all in progress: the not-started task is poured before the done one,
        // but both end up in progress either way.
        let ts = tasks(&[Done, NotStarted, InProgress]);
        let plan = plan(Distribution::new(0, 3, 0), &ts, IssuePolicy::Fold).unwrap();
        assert_eq!(plan.changes.len(), 2);
        assert!(plan.changes.iter().all(|c| c.to == InProgress));
    }

    #[test]
    fn test_issue_task_kept_in_not_started_slot_stays_issue() {
        let ts = vec![task("a", Issue, None), task("b", Done, None)];
        let plan = plan(Distribution::new(1, 0, 1), &ts, IssuePolicy::Fold).unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_issue_tasks_filling_not_started_slots_are_not_rewritten() {
        let ts = vec![
            task("a", Issue, None),
            task("b", Issue, None),
            task("c", Done, None),
        ];
        let plan = plan(Distribution::new(1, 0, 2), &ts, IssuePolicy::Fold).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].task_id, "b");
        assert_eq!(plan.changes[0].from, Issue);
        assert_eq!(plan.changes[0].to, Done);
    }

    #[test]
    fn test_issue_task_can_be_reassigned_when_folded() {
        let ts = vec![task("a", Issue, None), task("b", Done, None)];
        let plan = plan(Distribution::new(2, 0, 0), &ts, IssuePolicy::Fold).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].task_id, "a");
        assert_eq!(plan.changes[0].to, Done);
    }

    #[test]
    fn test_excluded_issue_tasks_are_untouched() {
        let ts = vec![task("a", Issue, None), task("b", NotStarted, None)];
        let plan = plan(Distribution::new(1, 0, 0), &ts, IssuePolicy::Exclude).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].task_id, "b");
    }

    #[test]
    fn test_mismatched_task_count_is_a_consistency_violation() {
        let ts = tasks(&[Done, Done]);
        let err = plan(Distribution::new(1, 1, 1), &ts, IssuePolicy::Fold).unwrap_err();
        assert!(matches!(err, ProgressError::ConsistencyViolation { .. }));
    }

    #[test]
    fn test_changes_carry_observed_version() {
        let mut t = task("a", NotStarted, None);
        t.version = 7;
        let plan = plan(Distribution::new(1, 0, 0), &[t], IssuePolicy::Fold).unwrap();
        assert_eq!(plan.changes[0].version, 7);
    }
}
