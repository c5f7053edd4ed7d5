//! Storage port consumed by the engine.

use crate::types::{Actor, ChangeReason, EntityRef, Goal, NodeKind, Project, Status, Task, TaskPatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at the storage boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: NodeKind, id: String },

    #[error("task {task_id} changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        task_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: NodeKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// A single status write issued by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub status: Status,
    pub progress: Option<i32>,
    /// When set, the write only lands if the stored version still matches.
    pub expected_version: Option<i64>,
    pub reason: ChangeReason,
}

/// Request/response access to the project hierarchy.
///
/// Implementations look parents up by id; the engine never holds
/// back-pointers between entities.
#[async_trait]
pub trait ProgressStore: Send + Sync + 'static {
    async fn get_task(&self, task_id: &str) -> Result<Task, StoreError>;

    /// Tasks directly under a goal, or directly under a project (not under any goal).
    async fn get_child_tasks(&self, parent: &EntityRef) -> Result<Vec<Task>, StoreError>;

    async fn get_goal(&self, goal_id: &str) -> Result<Goal, StoreError>;

    async fn get_project(&self, project_id: &str) -> Result<Project, StoreError>;

    /// Goals of a project in display order.
    async fn get_project_goals(&self, project_id: &str) -> Result<Vec<Goal>, StoreError>;

    /// Set status and progress together.
    async fn update_task_status(
        &self,
        update: &TaskStatusUpdate,
        actor: &Actor,
    ) -> Result<Task, StoreError>;

    /// Apply a resolved field edit.
    async fn update_task(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        actor: &Actor,
    ) -> Result<Task, StoreError>;

    async fn update_goal_status(
        &self,
        goal_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Goal, StoreError>;

    async fn update_project_status(
        &self,
        project_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Project, StoreError>;
}
