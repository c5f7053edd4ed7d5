//! Demotion of manually completed ancestors.
//!
//! When a task changes and is not fully complete, a parent goal or project
//! stored as done goes back to in progress. Demotion never recomputes
//! progress and never promotes: re-completion is always a manual action.

use super::aggregate::is_task_complete;
use super::store::{ProgressStore, StoreError};
use crate::types::{Actor, ChangeReason, Goal, Project, Status, Task};
use tracing::info;

/// Ancestors demoted by one cascade run.
#[derive(Debug, Clone, Default)]
pub struct Demotions {
    pub goal: Option<Goal>,
    pub project: Option<Project>,
}

impl Demotions {
    pub fn is_empty(&self) -> bool {
        self.goal.is_none() && self.project.is_none()
    }
}

/// Demote the task's goal and project if they are marked done.
///
/// Both lookups run concurrently and both must succeed.
pub async fn demote_ancestors<S>(store: &S, task: &Task, actor: &Actor) -> Result<Demotions, StoreError>
where
    S: ProgressStore + ?Sized,
{
    if is_task_complete(task) {
        return Ok(Demotions::default());
    }

    let goal = async {
        match task.goal_id.as_deref() {
            Some(goal_id) => demote_goal(store, goal_id, actor).await,
            None => Ok(None),
        }
    };
    let project = demote_project(store, &task.project_id, actor);

    let (goal, project) = tokio::join!(goal, project);
    Ok(Demotions {
        goal: goal?,
        project: project?,
    })
}

async fn demote_goal<S>(store: &S, goal_id: &str, actor: &Actor) -> Result<Option<Goal>, StoreError>
where
    S: ProgressStore + ?Sized,
{
    let goal = store.get_goal(goal_id).await?;
    if goal.status != Status::Done {
        return Ok(None);
    }
    let goal = store
        .update_goal_status(goal_id, Status::InProgress, ChangeReason::Cascade, actor)
        .await?;
    info!(goal_id = %goal_id, "Goal demoted to in_progress after child change");
    Ok(Some(goal))
}

async fn demote_project<S>(
    store: &S,
    project_id: &str,
    actor: &Actor,
) -> Result<Option<Project>, StoreError>
where
    S: ProgressStore + ?Sized,
{
    let project = store.get_project(project_id).await?;
    if project.status != Status::Done {
        return Ok(None);
    }
    let project = store
        .update_project_status(project_id, Status::InProgress, ChangeReason::Cascade, actor)
        .await?;
    info!(project_id = %project_id, "Project demoted to in_progress after descendant change");
    Ok(Some(project))
}
