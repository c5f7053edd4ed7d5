//! Integration tests for the progress engine over the SQLite store.
//!
//! Covers reconciliation (goal, per-goal and flattened projects, issue
//! policies, version checks), the completion gate, and ancestor demotion.

use async_trait::async_trait;
use project_progress_mcp::db::Database;
use project_progress_mcp::db::tasks::NewTask;
use project_progress_mcp::progress::{
    Distribution, IssuePolicy, ProgressEngine, ProgressError, ProgressStore, ProjectMode,
    ReconcileSettings, StoreError, TaskStatusUpdate,
};
use project_progress_mcp::types::{
    Actor, ChangeReason, EntityRef, Goal, NodeKind, Project, Status, Task, TaskPatch,
};
use std::sync::Arc;

fn alice() -> Actor {
    Actor::new("alice")
}

fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"))
}

fn engine(db: &Arc<Database>) -> ProgressEngine<Database> {
    ProgressEngine::new(Arc::clone(db), ReconcileSettings::default())
}

fn engine_with(db: &Arc<Database>, settings: ReconcileSettings) -> ProgressEngine<Database> {
    ProgressEngine::new(Arc::clone(db), settings)
}

fn add_project(db: &Database, id: &str) {
    db.create_project(Some(id.to_string()), format!("Project {id}"), None, &alice())
        .expect("Failed to create project");
}

fn add_goal(db: &Database, project_id: &str, id: &str) {
    db.create_goal(
        Some(id.to_string()),
        project_id,
        format!("Goal {id}"),
        None,
        &alice(),
    )
    .expect("Failed to create goal");
}

/// Create tasks `{goal}-0`, `{goal}-1`, ... with the given statuses.
fn add_tasks(db: &Database, goal_id: &str, statuses: &[Status]) -> Vec<Task> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            db.create_task(
                NewTask {
                    id: Some(format!("{goal_id}-{i}")),
                    title: format!("Task {i}"),
                    goal_id: Some(goal_id.to_string()),
                    status: Some(*status),
                    ..Default::default()
                },
                &alice(),
            )
            .expect("Failed to create task")
        })
        .collect()
}

fn status_of(db: &Database, task_id: &str) -> Status {
    db.get_task(task_id).unwrap().expect("task exists").status
}

mod reconcile_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    #[tokio::test]
    async fn two_done_one_open_reconciled_to_one_third() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Done, Done, NotStarted]);
        let engine = engine(&db);
        assert_eq!(
            engine.compute_aggregate_progress(&EntityRef::goal("g1")).await.unwrap(),
            67
        );

        let outcome = engine
            .reconcile_progress(&EntityRef::goal("g1"), 33, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.achieved_percentage, 33);
        assert!(outcome.exact);
        assert_eq!(outcome.tasks_changed, 1);
        assert_eq!(outcome.distribution, Some(Distribution::new(1, 0, 2)));
        assert_eq!(outcome.changes[0].task_id, "g1-1");
        assert_eq!(outcome.changes[0].to, NotStarted);
        assert_eq!(status_of(&db, "g1-0"), Done);
        assert_eq!(status_of(&db, "g1-1"), NotStarted);
        assert_eq!(
            engine.compute_aggregate_progress(&EntityRef::goal("g1")).await.unwrap(),
            33
        );
    }

    #[tokio::test]
    async fn repeating_an_exact_reconcile_changes_nothing() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Done, Done, NotStarted]);
        let engine = engine(&db);

        let first = engine
            .reconcile_progress(&EntityRef::goal("g1"), 33, None, &alice())
            .await
            .unwrap();
        let second = engine
            .reconcile_progress(&EntityRef::goal("g1"), 33, None, &alice())
            .await
            .unwrap();

        assert!(first.exact);
        assert_eq!(second.tasks_changed, 0);
        assert!(second.changes.is_empty());
        assert_eq!(second.achieved_percentage, 33);
    }

    #[tokio::test]
    async fn tie_on_error_moves_a_single_task() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Done, Done, InProgress, NotStarted]);
        let engine = engine(&db);

        let outcome = engine
            .reconcile_progress(&EntityRef::goal("g1"), 50, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.achieved_percentage, 50);
        assert_eq!(outcome.distribution, Some(Distribution::new(1, 2, 1)));
        assert_eq!(outcome.tasks_changed, 1);
        assert_eq!(status_of(&db, "g1-1"), InProgress);
    }

    #[tokio::test]
    async fn reachable_targets_are_hit_exactly() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[NotStarted; 4]);
        let engine = engine(&db);

        for target in [0, 25, 50, 75, 100, 50, 0] {
            let outcome = engine
                .reconcile_progress(&EntityRef::goal("g1"), target, None, &alice())
                .await
                .unwrap();
            assert!(outcome.exact, "target {target} should be reachable");
            assert_eq!(outcome.achieved_percentage, target);
        }
    }

    #[tokio::test]
    async fn unreachable_target_reports_closest_value() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[NotStarted, NotStarted]);

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::goal("g1"), 33, None, &alice())
            .await
            .unwrap();

        assert!(!outcome.exact);
        assert_eq!(outcome.requested_percentage, 33);
        assert_eq!(outcome.achieved_percentage, 25);
    }

    #[tokio::test]
    async fn empty_goal_is_a_flagged_noop() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::goal("g1"), 40, None, &alice())
            .await
            .unwrap();

        assert!(outcome.empty);
        assert_eq!(outcome.tasks_changed, 0);
        assert_eq!(outcome.achieved_percentage, 40);
    }

    #[tokio::test]
    async fn out_of_range_target_is_rejected_before_lookup() {
        let db = setup_db();
        let engine = engine(&db);

        for target in [-1, 101] {
            let err = engine
                .reconcile_progress(&EntityRef::goal("missing"), target, None, &alice())
                .await
                .unwrap_err();
            assert!(matches!(err, ProgressError::InvalidTarget(t) if t == target));
        }
    }

    #[tokio::test]
    async fn missing_goal_is_not_found() {
        let db = setup_db();

        let err = engine(&db)
            .reconcile_progress(&EntityRef::goal("missing"), 50, None, &alice())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressError::Store(StoreError::NotFound { kind: NodeKind::Goal, .. })
        ));
    }

    #[tokio::test]
    async fn reconcile_records_history_with_reason() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[NotStarted]);

        engine(&db)
            .reconcile_progress(&EntityRef::goal("g1"), 100, None, &Actor::new("bob"))
            .await
            .unwrap();

        let history = db.get_status_history(NodeKind::Task, "g1-0").unwrap();
        let last = history.last().expect("history recorded");
        assert_eq!(last.status, Done);
        assert_eq!(last.progress, Some(100));
        assert_eq!(last.reason, ChangeReason::Reconcile);
        assert_eq!(last.actor, "bob");
    }
}

mod project_mode_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    #[tokio::test]
    async fn per_goal_reconciles_each_goal_to_the_target() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_goal(&db, "p1", "g2");
        add_tasks(&db, "g1", &[NotStarted; 2]);
        add_tasks(&db, "g2", &[NotStarted; 4]);
        let engine = engine(&db);

        let outcome = engine
            .reconcile_progress(&EntityRef::project("p1"), 50, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.achieved_percentage, 50);
        assert!(outcome.exact);
        assert_eq!(outcome.tasks_changed, 3);
        assert!(outcome.distribution.is_none());
        assert_eq!(engine.goal_tree("g1").await.unwrap().progress_percentage(), 50);
        assert_eq!(engine.goal_tree("g2").await.unwrap().progress_percentage(), 50);
    }

    #[tokio::test]
    async fn per_goal_counts_empty_goals_as_zero() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_goal(&db, "p1", "g2");
        add_tasks(&db, "g1", &[NotStarted; 2]);

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::project("p1"), 100, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.achieved_percentage, 50);
        assert!(!outcome.exact);
        assert!(!outcome.empty);
    }

    #[tokio::test]
    async fn flatten_solves_over_all_goal_tasks() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_goal(&db, "p1", "g2");
        add_tasks(&db, "g1", &[NotStarted]);
        add_tasks(&db, "g2", &[NotStarted; 3]);

        let outcome = engine(&db)
            .reconcile_progress(
                &EntityRef::project("p1"),
                25,
                Some(ProjectMode::Flatten),
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.distribution, Some(Distribution::new(1, 0, 3)));
        assert_eq!(outcome.achieved_percentage, 25);
        assert_eq!(outcome.tasks_changed, 1);
    }

    #[tokio::test]
    async fn project_without_goals_uses_direct_tasks() {
        let db = setup_db();
        add_project(&db, "p1");
        for i in 0..2 {
            db.create_task(
                NewTask {
                    id: Some(format!("d{i}")),
                    title: format!("Direct {i}"),
                    project_id: Some("p1".to_string()),
                    ..Default::default()
                },
                &alice(),
            )
            .unwrap();
        }

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::project("p1"), 100, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.tasks_changed, 2);
        assert_eq!(status_of(&db, "d0"), Done);
        assert_eq!(status_of(&db, "d1"), Done);
    }

    #[tokio::test]
    async fn project_progress_is_goal_weighted() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "a");
        add_goal(&db, "p1", "b");
        add_tasks(&db, "a", &[Done]);
        add_tasks(&db, "b", &[NotStarted; 9]);

        let progress = engine(&db)
            .compute_aggregate_progress(&EntityRef::project("p1"))
            .await
            .unwrap();

        assert_eq!(progress, 50);
    }
}

mod issue_policy_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    fn seed_with_issue(db: &Database) {
        add_project(db, "p1");
        add_goal(db, "p1", "g1");
        db.create_task(
            NewTask {
                id: Some("blocked".to_string()),
                title: "Blocked".to_string(),
                goal_id: Some("g1".to_string()),
                status: Some(Issue),
                progress: Some(40),
                ..Default::default()
            },
            &alice(),
        )
        .unwrap();
        add_tasks(db, "g1", &[NotStarted, NotStarted]);
    }

    #[tokio::test]
    async fn fold_lets_issue_tasks_be_reassigned() {
        let db = setup_db();
        seed_with_issue(&db);

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::goal("g1"), 100, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.tasks_changed, 3);
        assert_eq!(status_of(&db, "blocked"), Done);
    }

    #[tokio::test]
    async fn folded_issue_task_in_place_is_not_rewritten() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Issue, Done]);

        let outcome = engine(&db)
            .reconcile_progress(&EntityRef::goal("g1"), 50, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.achieved_percentage, 50);
        assert_eq!(outcome.tasks_changed, 0);
        assert!(outcome.changes.is_empty());
        assert_eq!(status_of(&db, "g1-0"), Issue);
        assert_eq!(db.get_status_history(NodeKind::Task, "g1-0").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exclude_pins_issue_tasks() {
        let db = setup_db();
        seed_with_issue(&db);
        let settings = ReconcileSettings {
            issue_policy: IssuePolicy::Exclude,
            ..Default::default()
        };

        let outcome = engine_with(&db, settings)
            .reconcile_progress(&EntityRef::goal("g1"), 50, None, &alice())
            .await
            .unwrap();

        // 40 pinned + 100 + 0 over three tasks
        assert_eq!(outcome.achieved_percentage, 47);
        assert!(!outcome.exact);
        assert_eq!(outcome.tasks_changed, 1);
        assert_eq!(status_of(&db, "blocked"), Issue);
        assert!(outcome.changes.iter().all(|c| c.task_id != "blocked"));
    }
}

mod completion_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    #[tokio::test]
    async fn goal_with_open_task_cannot_complete() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Done, NotStarted]);
        let engine = engine(&db);

        let check = engine.can_mark_complete(&EntityRef::goal("g1")).await.unwrap();
        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["task g1-1 at 0%"]);

        let err = engine
            .set_completion(&EntityRef::goal("g1"), true, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CompletionBlocked { .. }));
        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, NotStarted);
    }

    #[tokio::test]
    async fn project_blocked_by_incomplete_goal() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_goal(&db, "p1", "g2");
        add_tasks(&db, "g1", &[Done]);
        add_tasks(&db, "g2", &[Done, InProgress]);

        let check = engine(&db)
            .can_mark_complete(&EntityRef::project("p1"))
            .await
            .unwrap();

        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["goal g2 at 75%"]);
    }

    #[tokio::test]
    async fn complete_then_cancel_goal() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Done, Done]);
        let engine = engine(&db);

        let goal = engine
            .set_completion(&EntityRef::goal("g1"), true, &alice())
            .await
            .unwrap();
        assert_eq!(goal.status(), Done);

        // Marking again is a no-op
        engine
            .set_completion(&EntityRef::goal("g1"), true, &alice())
            .await
            .unwrap();
        let history = db.get_status_history(NodeKind::Goal, "g1").unwrap();
        assert_eq!(
            history.iter().filter(|e| e.reason == ChangeReason::Complete).count(),
            1
        );

        // Cancelling recomputes from the children, which are all done
        let goal = engine
            .set_completion(&EntityRef::goal("g1"), false, &alice())
            .await
            .unwrap();
        assert_eq!(goal.status(), Done);
        let last = db.get_status_history(NodeKind::Goal, "g1").unwrap();
        assert_eq!(last.last().unwrap().reason, ChangeReason::Cancel);
    }

    #[tokio::test]
    async fn childless_goal_is_never_completable() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");

        let check = engine(&db).can_mark_complete(&EntityRef::goal("g1")).await.unwrap();

        assert!(!check.completable);
        assert_eq!(check.blockers, vec!["no children"]);
    }
}

mod cascade_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    async fn completed_project(db: &Arc<Database>) -> ProgressEngine<Database> {
        add_project(db, "p1");
        add_goal(db, "p1", "g1");
        add_tasks(db, "g1", &[Done, Done]);
        let engine = engine(db);
        engine
            .set_completion(&EntityRef::goal("g1"), true, &alice())
            .await
            .unwrap();
        engine
            .set_completion(&EntityRef::project("p1"), true, &alice())
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn reopening_a_task_demotes_goal_and_project() {
        let db = setup_db();
        let engine = completed_project(&db).await;

        let patch = TaskPatch {
            progress: Some(Some(40)),
            ..Default::default()
        };
        let task = engine.update_task("g1-0", patch, &alice()).await.unwrap();

        assert_eq!(task.status, InProgress);
        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, InProgress);
        assert_eq!(db.get_project("p1").unwrap().unwrap().status, InProgress);
        let history = db.get_status_history(NodeKind::Project, "p1").unwrap();
        assert_eq!(history.last().unwrap().reason, ChangeReason::Cascade);
    }

    #[tokio::test]
    async fn completing_edit_leaves_ancestors_done() {
        let db = setup_db();
        let engine = completed_project(&db).await;

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        engine.update_task("g1-0", patch, &alice()).await.unwrap();

        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, Done);
        assert_eq!(db.get_project("p1").unwrap().unwrap().status, Done);
    }

    #[tokio::test]
    async fn issue_status_survives_progress_edit() {
        let db = setup_db();
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[Issue]);

        let patch = TaskPatch {
            progress: Some(Some(80)),
            ..Default::default()
        };
        let task = engine(&db).update_task("g1-0", patch, &alice()).await.unwrap();

        assert_eq!(task.status, Issue);
        assert_eq!(task.progress, Some(80));
    }

    #[tokio::test]
    async fn adding_an_open_task_demotes_completed_ancestors() {
        let db = setup_db();
        let engine = completed_project(&db).await;

        let task = db
            .create_task(
                NewTask {
                    title: "Late addition".to_string(),
                    goal_id: Some("g1".to_string()),
                    ..Default::default()
                },
                &alice(),
            )
            .unwrap();
        engine.task_created(&task, &alice()).await.unwrap();

        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, InProgress);
        assert_eq!(db.get_project("p1").unwrap().unwrap().status, InProgress);
        let history = db.get_status_history(NodeKind::Goal, "g1").unwrap();
        assert_eq!(history.last().unwrap().reason, ChangeReason::Cascade);
    }

    #[tokio::test]
    async fn adding_a_done_task_leaves_ancestors_done() {
        let db = setup_db();
        let engine = completed_project(&db).await;

        let task = db
            .create_task(
                NewTask {
                    title: "Already shipped".to_string(),
                    goal_id: Some("g1".to_string()),
                    status: Some(Done),
                    ..Default::default()
                },
                &alice(),
            )
            .unwrap();
        engine.task_created(&task, &alice()).await.unwrap();

        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, Done);
        assert_eq!(db.get_project("p1").unwrap().unwrap().status, Done);
    }

    #[tokio::test]
    async fn reconcile_below_done_demotes_completed_goal() {
        let db = setup_db();
        let engine = completed_project(&db).await;

        engine
            .reconcile_progress(&EntityRef::goal("g1"), 50, None, &alice())
            .await
            .unwrap();

        assert_eq!(db.get_goal("g1").unwrap().unwrap().status, InProgress);
        assert_eq!(db.get_project("p1").unwrap().unwrap().status, InProgress);
    }
}

/// Store wrapper that edits one task behind the engine's back right before
/// the engine writes it.
struct RacingStore {
    db: Database,
    contested: String,
}

#[async_trait]
impl ProgressStore for RacingStore {
    async fn get_task(&self, task_id: &str) -> Result<Task, StoreError> {
        ProgressStore::get_task(&self.db, task_id).await
    }

    async fn get_child_tasks(&self, parent: &EntityRef) -> Result<Vec<Task>, StoreError> {
        ProgressStore::get_child_tasks(&self.db, parent).await
    }

    async fn get_goal(&self, goal_id: &str) -> Result<Goal, StoreError> {
        ProgressStore::get_goal(&self.db, goal_id).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, StoreError> {
        ProgressStore::get_project(&self.db, project_id).await
    }

    async fn get_project_goals(&self, project_id: &str) -> Result<Vec<Goal>, StoreError> {
        ProgressStore::get_project_goals(&self.db, project_id).await
    }

    async fn update_task_status(
        &self,
        update: &TaskStatusUpdate,
        actor: &Actor,
    ) -> Result<Task, StoreError> {
        if update.task_id == self.contested {
            let rename = TaskPatch {
                title: Some("Edited elsewhere".to_string()),
                ..Default::default()
            };
            ProgressStore::update_task(&self.db, &update.task_id, &rename, &Actor::new("mallory"))
                .await?;
        }
        ProgressStore::update_task_status(&self.db, update, actor).await
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        actor: &Actor,
    ) -> Result<Task, StoreError> {
        ProgressStore::update_task(&self.db, task_id, patch, actor).await
    }

    async fn update_goal_status(
        &self,
        goal_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Goal, StoreError> {
        ProgressStore::update_goal_status(&self.db, goal_id, status, reason, actor).await
    }

    async fn update_project_status(
        &self,
        project_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Project, StoreError> {
        ProgressStore::update_project_status(&self.db, project_id, status, reason, actor).await
    }
}

mod concurrency_tests {
    use super::*;
    use project_progress_mcp::types::Status::*;

    fn racing(contested: &str) -> (Arc<RacingStore>, Database) {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        add_project(&db, "p1");
        add_goal(&db, "p1", "g1");
        add_tasks(&db, "g1", &[NotStarted; 3]);
        let store = Arc::new(RacingStore {
            db: db.clone(),
            contested: contested.to_string(),
        });
        (store, db)
    }

    #[tokio::test]
    async fn strict_versions_report_stale_writes_as_partial_failure() {
        let (store, db) = racing("g1-1");
        let settings = ReconcileSettings {
            strict_versions: true,
            ..Default::default()
        };
        let engine = ProgressEngine::new(store, settings);

        let err = engine
            .reconcile_progress(&EntityRef::goal("g1"), 100, None, &alice())
            .await
            .unwrap_err();

        match err {
            ProgressError::PartialBatchFailure { applied, failed } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].task_id, "g1-1");
                assert!(failed[0].reason.contains("changed concurrently"));
                let mut applied = applied;
                applied.sort();
                assert_eq!(applied, vec!["g1-0", "g1-2"]);
            }
            other => panic!("expected partial batch failure, got {other:?}"),
        }
        assert_eq!(status_of(&db, "g1-0"), Done);
        assert_eq!(status_of(&db, "g1-1"), NotStarted);
        assert_eq!(status_of(&db, "g1-2"), Done);
    }

    #[tokio::test]
    async fn relaxed_versions_accept_the_race() {
        let (store, db) = racing("g1-1");
        let engine = ProgressEngine::new(store, ReconcileSettings::default());

        let outcome = engine
            .reconcile_progress(&EntityRef::goal("g1"), 100, None, &alice())
            .await
            .unwrap();

        assert_eq!(outcome.tasks_changed, 3);
        let task = db.get_task("g1-1").unwrap().unwrap();
        assert_eq!(task.status, Done);
        assert_eq!(task.title, "Edited elsewhere");
    }
}
