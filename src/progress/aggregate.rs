//! Bottom-up progress aggregation.
//!
//! A goal's progress is the mean of its tasks. A project's progress is the
//! mean of its goals, one vote per goal regardless of task count; only a
//! project without goals falls back to the mean of its direct tasks.
//! Nothing here is cached: every call recomputes from the task snapshot.

use super::mapping::{DONE_PERCENT, clamp_progress, status_to_progress};
use crate::types::{GoalTree, ProjectTree, Status, Task};
use serde::{Deserialize, Serialize};

/// Effective percentage of a single task: stored progress when present,
/// otherwise the canonical value of its status (0 for `Issue`).
pub fn task_progress(task: &Task) -> i32 {
    task.progress
        .map(clamp_progress)
        .or_else(|| status_to_progress(task.status))
        .unwrap_or(0)
}

/// Whether a task counts as fully complete.
pub fn is_task_complete(task: &Task) -> bool {
    task.status == Status::Done || task_progress(task) == DONE_PERCENT
}

/// Integer mean rounded half up. Empty input yields 0.
pub fn mean_rounded<I>(values: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), v| (sum + i64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)) as i32
}

/// Progress of a goal given its tasks.
pub fn goal_progress(tasks: &[Task]) -> i32 {
    mean_rounded(tasks.iter().map(task_progress))
}

/// Progress of a project given its goals and direct tasks.
pub fn project_progress(goals: &[GoalTree], direct_tasks: &[Task]) -> i32 {
    if goals.is_empty() {
        goal_progress(direct_tasks)
    } else {
        mean_rounded(goals.iter().map(|g| goal_progress(&g.tasks)))
    }
}

impl GoalTree {
    pub fn progress_percentage(&self) -> i32 {
        goal_progress(&self.tasks)
    }
}

impl ProjectTree {
    pub fn progress_percentage(&self) -> i32 {
        project_progress(&self.goals, &self.tasks)
    }
}

/// Per-goal line of a progress report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub progress: i32,
    pub task_count: usize,
    pub completed_tasks: usize,
}

impl From<&GoalTree> for GoalProgress {
    fn from(tree: &GoalTree) -> Self {
        Self {
            id: tree.goal.id.clone(),
            title: tree.goal.title.clone(),
            status: tree.goal.status,
            progress: tree.progress_percentage(),
            task_count: tree.tasks.len(),
            completed_tasks: tree.tasks.iter().filter(|t| is_task_complete(t)).count(),
        }
    }
}

/// Read-side summary of a whole project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub progress: i32,
    pub goals: Vec<GoalProgress>,
    pub direct_task_count: usize,
}

impl From<&ProjectTree> for ProjectProgress {
    fn from(tree: &ProjectTree) -> Self {
        Self {
            id: tree.project.id.clone(),
            name: tree.project.name.clone(),
            status: tree.project.status,
            progress: tree.progress_percentage(),
            goals: tree.goals.iter().map(GoalProgress::from).collect(),
            direct_task_count: tree.tasks.len(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{goal_tree, task, tasks};
    use super::*;
    use crate::types::Status::*;

    #[test]
    fn test_task_progress_prefers_stored_value() {
        assert_eq!(task_progress(&task("a", InProgress, Some(30))), 30);
        assert_eq!(task_progress(&task("a", InProgress, None)), 50);
        assert_eq!(task_progress(&task("a", Issue, None)), 0);
        assert_eq!(task_progress(&task("a", Issue, Some(70))), 70);
    }

    #[test]
    fn test_goal_progress_extremes() {
        assert_eq!(goal_progress(&tasks(&[Done, Done, Done])), 100);
        assert_eq!(goal_progress(&tasks(&[NotStarted, NotStarted])), 0);
        assert_eq!(goal_progress(&[]), 0);
    }

    #[test]
    fn test_goal_progress_rounds_half_up() {
        // (100 + 100 + 0) / 3 = 66.67
        assert_eq!(goal_progress(&tasks(&[Done, Done, NotStarted])), 67);
        // (100 + 100 + 50 + 0) / 4 = 62.5
        assert_eq!(goal_progress(&tasks(&[Done, Done, InProgress, NotStarted])), 63);
    }

    #[test]
    fn test_project_progress_is_goal_weighted() {
        let goal_a = goal_tree("a", tasks(&[Done]));
        let goal_b = goal_tree("b", tasks(&[NotStarted; 9]));
        assert_eq!(project_progress(&[goal_a, goal_b], &[]), 50);
    }

    #[test]
    fn test_project_without_goals_uses_direct_tasks() {
        assert_eq!(project_progress(&[], &tasks(&[Done, NotStarted])), 50);
        assert_eq!(project_progress(&[], &[]), 0);
    }

    #[test]
    fn test_direct_tasks_ignored_when_goals_exist() {
        let goal = goal_tree("a", tasks(&[Done]));
        assert_eq!(project_progress(&[goal], &tasks(&[NotStarted])), 100);
    }
}
