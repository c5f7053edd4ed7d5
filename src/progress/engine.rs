//! Progress engine: wires the pure pieces to a [`ProgressStore`].

use super::aggregate::{is_task_complete, mean_rounded, task_progress};
use super::cascade::demote_ancestors;
use super::gate::{self, CompletionCheck};
use super::mapping::{resolve_edit, status_to_progress};
use super::planner::{self, StatusChange};
use super::solver::{Bucket, Distribution, IssuePolicy, Pinned, Solution, solve};
use super::store::{ProgressStore, TaskStatusUpdate};
use super::{FailedUpdate, ProgressError, ProjectMode};
use crate::types::{
    Actor, ChangeReason, Entity, EntityKind, EntityRef, GoalTree, ProjectTree, Status, Task,
    TaskPatch,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Behavior switches for reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    pub issue_policy: IssuePolicy,
    pub project_mode: ProjectMode,
    /// Reject writes to tasks that changed since they were read.
    pub strict_versions: bool,
}

/// Result of a reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub entity: EntityRef,
    pub requested_percentage: i32,
    pub achieved_percentage: i32,
    pub exact: bool,
    /// No tasks to reconcile; nothing was written.
    pub empty: bool,
    pub tasks_changed: usize,
    /// Chosen split when a single pool was solved (goal, flattened project,
    /// or project without goals).
    pub distribution: Option<Distribution>,
    pub changes: Vec<StatusChange>,
}

impl ReconcileOutcome {
    fn empty(entity: EntityRef, target: i32) -> Self {
        Self {
            entity,
            requested_percentage: target,
            achieved_percentage: target,
            exact: true,
            empty: true,
            tasks_changed: 0,
            distribution: None,
            changes: Vec::new(),
        }
    }
}

/// A solved pool and the writes that realize it.
struct PoolPlan {
    solution: Solution,
    changes: Vec<StatusChange>,
}

pub struct ProgressEngine<S: ProgressStore> {
    store: Arc<S>,
    settings: ReconcileSettings,
}

impl<S: ProgressStore> Clone for ProgressEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings,
        }
    }
}

impl<S: ProgressStore> ProgressEngine<S> {
    pub fn new(store: Arc<S>, settings: ReconcileSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> ReconcileSettings {
        self.settings
    }

    /// Load a goal with its tasks.
    pub async fn goal_tree(&self, goal_id: &str) -> Result<GoalTree, ProgressError> {
        let goal = self.store.get_goal(goal_id).await?;
        let tasks = self.store.get_child_tasks(&EntityRef::goal(goal_id)).await?;
        Ok(GoalTree { goal, tasks })
    }

    /// Load a project with its goals, their tasks, and its direct tasks.
    pub async fn project_tree(&self, project_id: &str) -> Result<ProjectTree, ProgressError> {
        let project = self.store.get_project(project_id).await?;
        let mut goals = Vec::new();
        for goal in self.store.get_project_goals(project_id).await? {
            let tasks = self.store.get_child_tasks(&EntityRef::goal(&goal.id)).await?;
            goals.push(GoalTree { goal, tasks });
        }
        let tasks = self
            .store
            .get_child_tasks(&EntityRef::project(project_id))
            .await?;
        Ok(ProjectTree {
            project,
            goals,
            tasks,
        })
    }

    /// Current percentage of a goal or project, recomputed from its tasks.
    pub async fn compute_aggregate_progress(&self, entity: &EntityRef) -> Result<i32, ProgressError> {
        match entity.kind {
            EntityKind::Goal => Ok(self.goal_tree(&entity.id).await?.progress_percentage()),
            EntityKind::Project => Ok(self.project_tree(&entity.id).await?.progress_percentage()),
        }
    }

    /// Rewrite task statuses so the entity's progress lands as close to
    /// `target` as the task count allows, changing as few tasks as possible.
    ///
    /// `mode` overrides the configured project mode; it is ignored for goals.
    pub async fn reconcile_progress(
        &self,
        entity: &EntityRef,
        target: i32,
        mode: Option<ProjectMode>,
        actor: &Actor,
    ) -> Result<ReconcileOutcome, ProgressError> {
        if !(0..=100).contains(&target) {
            return Err(ProgressError::InvalidTarget(target));
        }

        let outcome = match entity.kind {
            EntityKind::Goal => {
                let tasks = self.store.get_child_tasks(entity).await?;
                self.reconcile_pool(entity, target, &tasks, actor).await?
            }
            EntityKind::Project => {
                let tree = self.project_tree(&entity.id).await?;
                let mode = mode.unwrap_or(self.settings.project_mode);
                if tree.goals.is_empty() {
                    self.reconcile_pool(entity, target, &tree.tasks, actor).await?
                } else {
                    match mode {
                        ProjectMode::Flatten => {
                            let tasks: Vec<Task> =
                                tree.goals.into_iter().flat_map(|g| g.tasks).collect();
                            self.reconcile_pool(entity, target, &tasks, actor).await?
                        }
                        ProjectMode::PerGoal => self.reconcile_goals(entity, target, &tree.goals, actor).await?,
                    }
                }
            }
        };

        info!(
            entity = %entity,
            requested = outcome.requested_percentage,
            achieved = outcome.achieved_percentage,
            exact = outcome.exact,
            tasks_changed = outcome.tasks_changed,
            "Progress reconciled"
        );
        Ok(outcome)
    }

    async fn reconcile_pool(
        &self,
        entity: &EntityRef,
        target: i32,
        tasks: &[Task],
        actor: &Actor,
    ) -> Result<ReconcileOutcome, ProgressError> {
        let Some(pool) = self.plan_pool(target, tasks)? else {
            return Ok(ReconcileOutcome::empty(entity.clone(), target));
        };
        self.apply_changes(&pool.changes, actor).await?;
        Ok(ReconcileOutcome {
            entity: entity.clone(),
            requested_percentage: target,
            achieved_percentage: pool.solution.achieved_percentage,
            exact: pool.solution.exact,
            empty: false,
            tasks_changed: pool.changes.len(),
            distribution: Some(pool.solution.distribution),
            changes: pool.changes,
        })
    }

    /// Reconcile every goal to the same target and apply all writes as one batch.
    async fn reconcile_goals(
        &self,
        entity: &EntityRef,
        target: i32,
        goals: &[GoalTree],
        actor: &Actor,
    ) -> Result<ReconcileOutcome, ProgressError> {
        let mut achieved = Vec::with_capacity(goals.len());
        let mut changes = Vec::new();
        let mut any_tasks = false;

        for goal in goals {
            match self.plan_pool(target, &goal.tasks)? {
                Some(pool) => {
                    any_tasks = true;
                    achieved.push(pool.solution.achieved_percentage);
                    changes.extend(pool.changes);
                }
                // An empty goal stays at 0% and still counts toward the mean.
                None => achieved.push(0),
            }
        }

        if !any_tasks {
            return Ok(ReconcileOutcome::empty(entity.clone(), target));
        }

        self.apply_changes(&changes, actor).await?;
        let achieved_percentage = mean_rounded(achieved);
        Ok(ReconcileOutcome {
            entity: entity.clone(),
            requested_percentage: target,
            achieved_percentage,
            exact: achieved_percentage == target,
            empty: false,
            tasks_changed: changes.len(),
            distribution: None,
            changes,
        })
    }

    fn plan_pool(&self, target: i32, tasks: &[Task]) -> Result<Option<PoolPlan>, ProgressError> {
        let policy = self.settings.issue_policy;
        let current = Distribution::from_tasks(tasks, policy);
        let pinned = tasks
            .iter()
            .filter(|t| Bucket::of(t.status, policy).is_none())
            .fold(Pinned::none(), |acc, t| Pinned {
                points: acc.points + i64::from(task_progress(t)),
                count: acc.count + 1,
            });

        let Some(solution) = solve(target, current, pinned) else {
            return Ok(None);
        };
        debug!(
            ?current,
            chosen = ?solution.distribution,
            achieved = solution.achieved_percentage,
            "Solved distribution"
        );
        let plan = planner::plan(solution.distribution, tasks, policy)?;
        Ok(Some(PoolPlan {
            solution,
            changes: plan.changes,
        }))
    }

    /// Issue all writes concurrently, wait for every one, then cascade.
    async fn apply_changes(&self, changes: &[StatusChange], actor: &Actor) -> Result<Vec<Task>, ProgressError> {
        let mut set = JoinSet::new();
        let mut pending: HashSet<String> = HashSet::new();

        for change in changes {
            let update = TaskStatusUpdate {
                task_id: change.task_id.clone(),
                status: change.to,
                progress: status_to_progress(change.to),
                expected_version: self.settings.strict_versions.then_some(change.version),
                reason: ChangeReason::Reconcile,
            };
            let store = Arc::clone(&self.store);
            let actor = actor.clone();
            pending.insert(change.task_id.clone());
            set.spawn(async move {
                let result = store.update_task_status(&update, &actor).await;
                (update.task_id, result)
            });
        }

        let mut applied = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((task_id, result)) => {
                    pending.remove(&task_id);
                    match result {
                        Ok(task) => applied.push(task),
                        Err(e) => failed.push(FailedUpdate {
                            task_id,
                            reason: e.to_string(),
                        }),
                    }
                }
                Err(e) => warn!(error = %e, "Task update did not complete"),
            }
        }
        // Whatever is left panicked or was cancelled before reporting back.
        failed.extend(pending.into_iter().map(|task_id| FailedUpdate {
            task_id,
            reason: "update aborted".to_string(),
        }));

        for task in cascade_sources(&applied) {
            demote_ancestors(self.store.as_ref(), task, actor).await?;
        }

        if !failed.is_empty() {
            warn!(
                applied = applied.len(),
                failed = failed.len(),
                "Reconciliation batch partially failed"
            );
            return Err(ProgressError::PartialBatchFailure {
                applied: applied.into_iter().map(|t| t.id).collect(),
                failed,
            });
        }
        Ok(applied)
    }

    /// Check whether a goal or project may be marked done.
    pub async fn can_mark_complete(&self, entity: &EntityRef) -> Result<CompletionCheck, ProgressError> {
        match entity.kind {
            EntityKind::Goal => {
                let tasks = self.store.get_child_tasks(entity).await?;
                Ok(gate::check_goal(&tasks))
            }
            EntityKind::Project => {
                let tree = self.project_tree(&entity.id).await?;
                Ok(gate::check_project(&tree.goals, &tree.tasks))
            }
        }
    }

    /// Mark a goal or project done, or cancel a completion.
    ///
    /// Marking an already-done entity is a no-op. Cancelling recomputes the
    /// status from the children.
    pub async fn set_completion(
        &self,
        entity: &EntityRef,
        complete: bool,
        actor: &Actor,
    ) -> Result<Entity, ProgressError> {
        match entity.kind {
            EntityKind::Goal => {
                let tree = self.goal_tree(&entity.id).await?;
                let (status, reason) = if complete {
                    if tree.goal.status == Status::Done {
                        return Ok(Entity::Goal(tree.goal));
                    }
                    self.ensure_completable(entity, gate::check_goal(&tree.tasks))?;
                    (Status::Done, ChangeReason::Complete)
                } else {
                    (gate::derive_goal_status(&tree.tasks), ChangeReason::Cancel)
                };
                let goal = self
                    .store
                    .update_goal_status(&entity.id, status, reason, actor)
                    .await?;
                info!(goal_id = %goal.id, status = %goal.status, reason = reason.as_str(), "Goal status set");
                Ok(Entity::Goal(goal))
            }
            EntityKind::Project => {
                let tree = self.project_tree(&entity.id).await?;
                let (status, reason) = if complete {
                    if tree.project.status == Status::Done {
                        return Ok(Entity::Project(tree.project));
                    }
                    self.ensure_completable(entity, gate::check_project(&tree.goals, &tree.tasks))?;
                    (Status::Done, ChangeReason::Complete)
                } else {
                    (
                        gate::derive_project_status(&tree.goals, &tree.tasks),
                        ChangeReason::Cancel,
                    )
                };
                let project = self
                    .store
                    .update_project_status(&entity.id, status, reason, actor)
                    .await?;
                info!(project_id = %project.id, status = %project.status, reason = reason.as_str(), "Project status set");
                Ok(Entity::Project(project))
            }
        }
    }

    fn ensure_completable(&self, entity: &EntityRef, check: CompletionCheck) -> Result<(), ProgressError> {
        if check.completable {
            return Ok(());
        }
        Err(ProgressError::CompletionBlocked {
            entity: entity.clone(),
            blockers: check.blockers,
        })
    }

    /// Demote completed ancestors after a task was added under them.
    pub async fn task_created(&self, task: &Task, actor: &Actor) -> Result<(), ProgressError> {
        let demoted = demote_ancestors(self.store.as_ref(), task, actor).await?;
        if !demoted.is_empty() {
            debug!(task_id = %task.id, "New task demoted completed ancestors");
        }
        Ok(())
    }

    /// Edit a task, keeping status and progress consistent, then cascade.
    pub async fn update_task(&self, task_id: &str, patch: TaskPatch, actor: &Actor) -> Result<Task, ProgressError> {
        let current = self.store.get_task(task_id).await?;
        let (status, progress) = resolve_edit(current.status, current.progress, patch.status, patch.progress);
        let resolved = TaskPatch {
            status: Some(status),
            progress: Some(progress),
            ..patch
        };

        let task = self.store.update_task(task_id, &resolved, actor).await?;
        let demoted = demote_ancestors(self.store.as_ref(), &task, actor).await?;
        if !demoted.is_empty() {
            debug!(task_id = %task_id, "Task edit demoted completed ancestors");
        }
        Ok(task)
    }
}

/// One incomplete task per distinct parent chain. Complete tasks never
/// demote, so they must not claim a chain.
fn cascade_sources(applied: &[Task]) -> Vec<&Task> {
    let mut seen = HashSet::new();
    applied
        .iter()
        .filter(|t| !is_task_complete(t))
        .filter(|t| seen.insert((t.goal_id.clone(), t.project_id.clone())))
        .collect()
}
