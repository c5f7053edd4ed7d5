//! Task CRUD and status writes.

use super::history::record_status_change;
use super::{Database, now_ms};
use crate::progress::mapping::resolve_edit;
use crate::progress::{StoreError, TaskStatusUpdate};
use crate::types::{Actor, ChangeReason, NodeKind, Status, Task, TaskPatch};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Deserialize;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, title, description, status, progress, goal_id, project_id, version,
     created_by, updated_by, created_at, updated_at";

/// Fields for a new task. A task needs a goal or a project; when only the
/// goal is given the project is taken from it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub goal_id: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<Status>,
    pub progress: Option<i32>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

// =============================================================================
// Junction table helpers for assignees
// =============================================================================

/// Replace all assignees of a task.
fn sync_assignees(conn: &Connection, task_id: &str, assignees: &[String]) -> Result<()> {
    conn.execute("DELETE FROM task_assignees WHERE task_id = ?1", params![task_id])?;
    for user_id in assignees {
        conn.execute(
            "INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
            params![task_id, user_id],
        )?;
    }
    Ok(())
}

fn load_assignees(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT user_id FROM task_assignees WHERE task_id = ?1 ORDER BY user_id")?;
    let assignees = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(assignees)
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: row.get("status")?,
        progress: row.get("progress")?,
        goal_id: row.get("goal_id")?,
        project_id: row.get("project_id")?,
        assignees: Vec::new(),
        version: row.get("version")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_task(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    match task {
        Some(mut task) => {
            task.assignees = load_assignees(conn, &task.id)?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

fn require_task(conn: &Connection, task_id: &str) -> Result<Task> {
    load_task(conn, task_id)?.ok_or_else(|| StoreError::not_found(NodeKind::Task, task_id).into())
}

/// Query tasks with a WHERE clause over a single parameter, in display order.
fn query_tasks(conn: &Connection, filter: &str, param: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE {filter} ORDER BY created_at ASC, rowid ASC"
    ))?;
    let mut tasks = stmt
        .query_map(params![param], parse_task_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for task in &mut tasks {
        task.assignees = load_assignees(conn, &task.id)?;
    }
    Ok(tasks)
}

impl Database {
    /// Create a task under a goal or directly under a project.
    pub fn create_task(&self, new: NewTask, actor: &Actor) -> Result<Task> {
        let project_id = match (new.goal_id.as_deref(), new.project_id.as_deref()) {
            (Some(goal_id), requested) => {
                let goal = self.require_goal(goal_id)?;
                if let Some(project_id) = requested
                    && project_id != goal.project_id
                {
                    bail!(
                        "goal {} belongs to project {}, not {}",
                        goal_id,
                        goal.project_id,
                        project_id
                    );
                }
                goal.project_id
            }
            (None, Some(project_id)) => self.require_project(project_id)?.id,
            (None, None) => bail!("a task needs a goal_id or a project_id"),
        };

        let task_id = new.id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let (status, progress) =
            resolve_edit(Status::NotStarted, None, new.status, new.progress.map(Some));
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO tasks (
                    id, title, description, status, progress, goal_id, project_id, version,
                    created_by, updated_by, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8, ?9, ?9)",
                params![
                    &task_id,
                    &new.title,
                    &new.description,
                    status,
                    progress,
                    &new.goal_id,
                    &project_id,
                    &actor.id,
                    now,
                ],
            )?;
            sync_assignees(&tx, &task_id, &new.assignees)?;
            record_status_change(&tx, NodeKind::Task, &task_id, status, progress, actor, ChangeReason::Create)?;

            let task = require_task(&tx, &task_id)?;
            tx.commit()?;
            Ok(task)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| load_task(conn, task_id))
    }

    /// Tasks of a goal in display order.
    pub fn list_goal_tasks(&self, goal_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| query_tasks(conn, "goal_id = ?1", goal_id))
    }

    /// Tasks attached directly to a project (not under any goal).
    pub fn list_direct_project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| query_tasks(conn, "project_id = ?1 AND goal_id IS NULL", project_id))
    }

    /// Every task of a project, under a goal or not.
    pub fn list_project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| query_tasks(conn, "project_id = ?1", project_id))
    }

    /// Tasks assigned to a user, across all projects.
    pub fn list_assigned_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "id IN (SELECT task_id FROM task_assignees WHERE user_id = ?1)",
                user_id,
            )
        })
    }

    /// Apply a field patch as given. Status and progress are written verbatim;
    /// callers resolve their consistency first.
    ///
    /// Bumps the version. A status or progress change is recorded in the history.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch, actor: &Actor) -> Result<Task> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let current = require_task(&tx, task_id)?;

            let title = patch.title.clone().unwrap_or(current.title);
            let description = match &patch.description {
                Some(description) => description.clone(),
                None => current.description,
            };
            let status = patch.status.unwrap_or(current.status);
            let progress = patch.progress.unwrap_or(current.progress);

            tx.execute(
                "UPDATE tasks SET
                    title = ?1, description = ?2, status = ?3, progress = ?4,
                    version = version + 1, updated_by = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![&title, &description, status, progress, &actor.id, now, task_id],
            )?;

            if let Some(assignees) = &patch.assignees {
                sync_assignees(&tx, task_id, assignees)?;
            }
            if status != current.status || progress != current.progress {
                record_status_change(&tx, NodeKind::Task, task_id, status, progress, actor, ChangeReason::Edit)?;
            }

            let task = require_task(&tx, task_id)?;
            tx.commit()?;
            Ok(task)
        })
    }

    /// Write status and progress together.
    ///
    /// When the update carries an expected version, a task whose stored
    /// version differs is rejected with [`StoreError::VersionConflict`].
    pub fn set_task_status(&self, update: &TaskStatusUpdate, actor: &Actor) -> Result<Task> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let actual: Option<i64> = tx
                .query_row(
                    "SELECT version FROM tasks WHERE id = ?1",
                    params![&update.task_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(actual) = actual else {
                return Err(StoreError::not_found(NodeKind::Task, &update.task_id).into());
            };
            if let Some(expected) = update.expected_version
                && expected != actual
            {
                return Err(StoreError::VersionConflict {
                    task_id: update.task_id.clone(),
                    expected,
                    actual,
                }
                .into());
            }

            tx.execute(
                "UPDATE tasks SET status = ?1, progress = ?2, version = version + 1,
                    updated_by = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![update.status, update.progress, &actor.id, now, &update.task_id],
            )?;
            record_status_change(
                &tx,
                NodeKind::Task,
                &update.task_id,
                update.status,
                update.progress,
                actor,
                update.reason,
            )?;

            let task = require_task(&tx, &update.task_id)?;
            tx.commit()?;
            Ok(task)
        })
    }

    /// Delete a task. Returns false if it did not exist.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }
}
