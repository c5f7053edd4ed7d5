//! [`ProgressStore`] implementation over the SQLite database.
//!
//! Every call runs on the blocking pool against a clone of the handle, so
//! the engine can issue concurrent writes without stalling the runtime.

use super::Database;
use crate::progress::{ProgressStore, StoreError, TaskStatusUpdate};
use crate::types::{
    Actor, ChangeReason, EntityKind, EntityRef, Goal, NodeKind, Project, Status, Task, TaskPatch,
};
use async_trait::async_trait;

/// Recover a typed store error from a database error, or wrap it as a backend failure.
pub fn into_store_error(err: anyhow::Error) -> StoreError {
    match err.downcast::<StoreError>() {
        Ok(err) => err,
        Err(err) => StoreError::backend(format!("{err:#}")),
    }
}

impl Database {
    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(StoreError::backend)?
            .map_err(into_store_error)
    }
}

fn missing(kind: NodeKind, id: &str) -> anyhow::Error {
    StoreError::not_found(kind, id).into()
}

#[async_trait]
impl ProgressStore for Database {
    async fn get_task(&self, task_id: &str) -> Result<Task, StoreError> {
        let id = task_id.to_string();
        self.blocking(move |db| db.get_task(&id)?.ok_or_else(|| missing(NodeKind::Task, &id)))
            .await
    }

    async fn get_child_tasks(&self, parent: &EntityRef) -> Result<Vec<Task>, StoreError> {
        let parent = parent.clone();
        self.blocking(move |db| match parent.kind {
            EntityKind::Goal => {
                db.require_goal(&parent.id)?;
                db.list_goal_tasks(&parent.id)
            }
            EntityKind::Project => {
                db.require_project(&parent.id)?;
                db.list_direct_project_tasks(&parent.id)
            }
        })
        .await
    }

    async fn get_goal(&self, goal_id: &str) -> Result<Goal, StoreError> {
        let id = goal_id.to_string();
        self.blocking(move |db| db.require_goal(&id)).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, StoreError> {
        let id = project_id.to_string();
        self.blocking(move |db| db.require_project(&id)).await
    }

    async fn get_project_goals(&self, project_id: &str) -> Result<Vec<Goal>, StoreError> {
        let id = project_id.to_string();
        self.blocking(move |db| {
            db.require_project(&id)?;
            db.list_goals(&id)
        })
        .await
    }

    async fn update_task_status(
        &self,
        update: &TaskStatusUpdate,
        actor: &Actor,
    ) -> Result<Task, StoreError> {
        let update = update.clone();
        let actor = actor.clone();
        self.blocking(move |db| db.set_task_status(&update, &actor)).await
    }

    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        actor: &Actor,
    ) -> Result<Task, StoreError> {
        let id = task_id.to_string();
        let patch = patch.clone();
        let actor = actor.clone();
        self.blocking(move |db| db.update_task(&id, &patch, &actor)).await
    }

    async fn update_goal_status(
        &self,
        goal_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Goal, StoreError> {
        let id = goal_id.to_string();
        let actor = actor.clone();
        self.blocking(move |db| db.set_goal_status(&id, status, reason, &actor))
            .await
    }

    async fn update_project_status(
        &self,
        project_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Project, StoreError> {
        let id = project_id.to_string();
        let actor = actor.clone();
        self.blocking(move |db| db.set_project_status(&id, status, reason, &actor))
            .await
    }
}
