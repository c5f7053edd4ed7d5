//! Project CRUD and tree loading.

use super::history::record_status_change;
use super::{Database, now_ms};
use crate::progress::StoreError;
use crate::types::{Actor, ChangeReason, GoalTree, NodeKind, Project, ProjectTree, Status};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, name, description, status, created_by, updated_by, created_at, updated_at";

pub fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: row.get("status")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    /// Create a new project in the not-started state.
    pub fn create_project(
        &self,
        id: Option<String>,
        name: String,
        description: Option<String>,
        actor: &Actor,
    ) -> Result<Project> {
        let project_id = id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO projects (id, name, description, status, created_by, updated_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6)",
                params![&project_id, &name, &description, Status::NotStarted, &actor.id, now],
            )?;
            record_status_change(
                &tx,
                NodeKind::Project,
                &project_id,
                Status::NotStarted,
                None,
                actor,
                ChangeReason::Create,
            )?;

            tx.commit()?;

            Ok(Project {
                id: project_id,
                name,
                description,
                status: Status::NotStarted,
                created_by: actor.id.clone(),
                updated_by: actor.id.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a project by ID.
    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let project = conn
                .query_row(
                    &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                    params![project_id],
                    parse_project_row,
                )
                .optional()?;
            Ok(project)
        })
    }

    /// All projects, oldest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at ASC, rowid ASC"
            ))?;
            let projects = stmt
                .query_map([], parse_project_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    /// Update a project's name and/or description.
    pub fn update_project(
        &self,
        project_id: &str,
        name: Option<String>,
        description: Option<Option<String>>,
        actor: &Actor,
    ) -> Result<Project> {
        let now = now_ms();
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE projects SET
                    name = COALESCE(?1, name),
                    description = CASE WHEN ?2 THEN ?3 ELSE description END,
                    updated_by = ?4,
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    name,
                    description.is_some(),
                    description.flatten(),
                    &actor.id,
                    now,
                    project_id
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(NodeKind::Project, project_id).into());
            }
            Ok(())
        })?;
        self.require_project(project_id)
    }

    /// Set a project's stored status and record it in the history.
    pub fn set_project_status(
        &self,
        project_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Project> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE projects SET status = ?1, updated_by = ?2, updated_at = ?3 WHERE id = ?4",
                params![status, &actor.id, now, project_id],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(NodeKind::Project, project_id).into());
            }
            record_status_change(&tx, NodeKind::Project, project_id, status, None, actor, reason)?;
            tx.commit()?;
            Ok(())
        })?;
        self.require_project(project_id)
    }

    /// Delete a project with its goals and tasks. Returns false if it did not exist.
    pub fn delete_project(&self, project_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
            Ok(deleted > 0)
        })
    }

    /// Load a project with its goals, their tasks, and its direct tasks.
    pub fn get_project_tree(&self, project_id: &str) -> Result<Option<ProjectTree>> {
        let Some(project) = self.get_project(project_id)? else {
            return Ok(None);
        };

        let mut goals = Vec::new();
        for goal in self.list_goals(project_id)? {
            let tasks = self.list_goal_tasks(&goal.id)?;
            goals.push(GoalTree { goal, tasks });
        }
        let tasks = self.list_direct_project_tasks(project_id)?;

        Ok(Some(ProjectTree {
            project,
            goals,
            tasks,
        }))
    }

    pub(crate) fn require_project(&self, project_id: &str) -> Result<Project> {
        self.get_project(project_id)?
            .ok_or_else(|| StoreError::not_found(NodeKind::Project, project_id).into())
    }
}
