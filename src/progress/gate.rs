//! Completion gate for goals and projects.
//!
//! A goal may be marked done only when every task is complete; a project
//! only when every goal passes that same check (or, without goals, every
//! direct task is complete). Nothing with zero children is completable.
//!
//! Cancelling a completion recomputes the status from the children, unlike
//! cascade demotion which always lands on in progress.

use super::aggregate::{goal_progress, is_task_complete, task_progress};
use crate::types::{GoalTree, Status, Task};
use serde::{Deserialize, Serialize};

/// Blocker reported for an entity without children.
pub const NO_CHILDREN: &str = "no children";

/// Result of a completion check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub completable: bool,
    /// Children below 100%, or [`NO_CHILDREN`].
    pub blockers: Vec<String>,
}

impl CompletionCheck {
    fn from_blockers(blockers: Vec<String>) -> Self {
        Self {
            completable: blockers.is_empty(),
            blockers,
        }
    }

    fn childless() -> Self {
        Self {
            completable: false,
            blockers: vec![NO_CHILDREN.to_string()],
        }
    }
}

pub fn check_goal(tasks: &[Task]) -> CompletionCheck {
    if tasks.is_empty() {
        return CompletionCheck::childless();
    }
    CompletionCheck::from_blockers(
        tasks
            .iter()
            .filter(|t| !is_task_complete(t))
            .map(|t| format!("task {} at {}%", t.id, task_progress(t)))
            .collect(),
    )
}

pub fn check_project(goals: &[GoalTree], direct_tasks: &[Task]) -> CompletionCheck {
    if goals.is_empty() {
        return check_goal(direct_tasks);
    }
    CompletionCheck::from_blockers(
        goals
            .iter()
            .filter(|g| !check_goal(&g.tasks).completable)
            .map(|g| format!("goal {} at {}%", g.goal.id, goal_progress(&g.tasks)))
            .collect(),
    )
}

/// Status a goal falls back to when its completion is cancelled.
pub fn derive_goal_status(tasks: &[Task]) -> Status {
    if check_goal(tasks).completable {
        Status::Done
    } else if tasks
        .iter()
        .any(|t| t.status == Status::InProgress || task_progress(t) > 0)
    {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

/// Status a project falls back to when its completion is cancelled.
pub fn derive_project_status(goals: &[GoalTree], direct_tasks: &[Task]) -> Status {
    if goals.is_empty() {
        return derive_goal_status(direct_tasks);
    }
    if check_project(goals, direct_tasks).completable {
        Status::Done
    } else if goals.iter().any(|g| derive_goal_status(&g.tasks) != Status::NotStarted) {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::aggregate::fixtures::{goal_tree, task, tasks};
    use crate::types::Status::*;

    #[test]
    fn test_goal_with_incomplete_task_is_blocked() {
        let check = check_goal(&tasks(&[Done, InProgress]));
        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["task t1 at 50%".to_string()]);
    }

    #[test]
    fn test_goal_with_all_done_is_completable() {
        let mut ts = tasks(&[Done]);
        ts.push(task("x", InProgress, Some(100)));
        assert!(check_goal(&ts).completable);
    }

    #[test]
    fn test_childless_entities_are_never_completable() {
        assert!(!check_goal(&[]).completable);
        let check = check_project(&[], &[]);
        assert!(!check.completable);
        assert_eq!(check.blockers, vec![NO_CHILDREN.to_string()]);
    }

    #[test]
    fn test_project_blocked_by_goal_below_100() {
        let goals = vec![
            goal_tree("a", tasks(&[Done])),
            goal_tree("b", tasks(&[Done, NotStarted])),
        ];
        let check = check_project(&goals, &[]);
        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["goal b at 50%".to_string()]);
    }

    #[test]
    fn test_goal_rounding_up_to_100_still_blocks_project() {
        let mut ts = tasks(&[Done; 199]);
        ts.push(task("late", InProgress, Some(99)));
        let goals = vec![goal_tree("a", ts)];

        let check = check_project(&goals, &[]);

        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["goal a at 100%".to_string()]);
    }

    #[test]
    fn test_project_with_empty_goal_is_blocked() {
        let goals = vec![goal_tree("a", tasks(&[Done])), goal_tree("b", vec![])];
        assert!(!check_project(&goals, &[]).completable);
    }

    #[test]
    fn test_project_without_goals_checks_direct_tasks() {
        assert!(check_project(&[], &tasks(&[Done, Done])).completable);
        assert!(!check_project(&[], &tasks(&[Done, Issue])).completable);
    }

    #[test]
    fn test_derived_status_after_cancel() {
        assert_eq!(derive_goal_status(&tasks(&[Done, Done])), Done);
        assert_eq!(derive_goal_status(&tasks(&[Done, NotStarted])), InProgress);
        assert_eq!(derive_goal_status(&tasks(&[NotStarted, Issue])), NotStarted);
        assert_eq!(derive_goal_status(&[]), NotStarted);
    }

    #[test]
    fn test_derived_project_status() {
        let idle = vec![goal_tree("a", tasks(&[NotStarted]))];
        assert_eq!(derive_project_status(&idle, &[]), NotStarted);
        let started = vec![
            goal_tree("a", tasks(&[NotStarted])),
            goal_tree("b", tasks(&[InProgress])),
        ];
        assert_eq!(derive_project_status(&started, &[]), InProgress);
    }
}
