//! Goal CRUD.

use super::history::record_status_change;
use super::{Database, now_ms};
use crate::progress::StoreError;
use crate::types::{Actor, ChangeReason, Goal, GoalTree, NodeKind, Status};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

const GOAL_COLUMNS: &str =
    "id, project_id, title, description, status, created_by, updated_by, created_at, updated_at";

pub fn parse_goal_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: row.get("status")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    /// Create a goal under an existing project.
    pub fn create_goal(
        &self,
        id: Option<String>,
        project_id: &str,
        title: String,
        description: Option<String>,
        actor: &Actor,
    ) -> Result<Goal> {
        self.require_project(project_id)?;

        let goal_id = id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO goals (id, project_id, title, description, status, created_by, updated_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?7)",
                params![&goal_id, project_id, &title, &description, Status::NotStarted, &actor.id, now],
            )?;
            record_status_change(
                &tx,
                NodeKind::Goal,
                &goal_id,
                Status::NotStarted,
                None,
                actor,
                ChangeReason::Create,
            )?;

            tx.commit()?;

            Ok(Goal {
                id: goal_id,
                project_id: project_id.to_string(),
                title,
                description,
                status: Status::NotStarted,
                created_by: actor.id.clone(),
                updated_by: actor.id.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a goal by ID.
    pub fn get_goal(&self, goal_id: &str) -> Result<Option<Goal>> {
        self.with_conn(|conn| {
            let goal = conn
                .query_row(
                    &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
                    params![goal_id],
                    parse_goal_row,
                )
                .optional()?;
            Ok(goal)
        })
    }

    /// Goals of a project in display (creation) order.
    pub fn list_goals(&self, project_id: &str) -> Result<Vec<Goal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GOAL_COLUMNS} FROM goals WHERE project_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let goals = stmt
                .query_map(params![project_id], parse_goal_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(goals)
        })
    }

    /// Update a goal's title and/or description.
    pub fn update_goal(
        &self,
        goal_id: &str,
        title: Option<String>,
        description: Option<Option<String>>,
        actor: &Actor,
    ) -> Result<Goal> {
        let now = now_ms();
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE goals SET
                    title = COALESCE(?1, title),
                    description = CASE WHEN ?2 THEN ?3 ELSE description END,
                    updated_by = ?4,
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    title,
                    description.is_some(),
                    description.flatten(),
                    &actor.id,
                    now,
                    goal_id
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(NodeKind::Goal, goal_id).into());
            }
            Ok(())
        })?;
        self.require_goal(goal_id)
    }

    /// Set a goal's stored status and record it in the history.
    pub fn set_goal_status(
        &self,
        goal_id: &str,
        status: Status,
        reason: ChangeReason,
        actor: &Actor,
    ) -> Result<Goal> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE goals SET status = ?1, updated_by = ?2, updated_at = ?3 WHERE id = ?4",
                params![status, &actor.id, now, goal_id],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(NodeKind::Goal, goal_id).into());
            }
            record_status_change(&tx, NodeKind::Goal, goal_id, status, None, actor, reason)?;
            tx.commit()?;
            Ok(())
        })?;
        self.require_goal(goal_id)
    }

    /// Delete a goal and its tasks. Returns false if it did not exist.
    pub fn delete_goal(&self, goal_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM goals WHERE id = ?1", params![goal_id])?;
            Ok(deleted > 0)
        })
    }

    /// Load a goal with its tasks.
    pub fn get_goal_tree(&self, goal_id: &str) -> Result<Option<GoalTree>> {
        let Some(goal) = self.get_goal(goal_id)? else {
            return Ok(None);
        };
        let tasks = self.list_goal_tasks(goal_id)?;
        Ok(Some(GoalTree { goal, tasks }))
    }

    pub(crate) fn require_goal(&self, goal_id: &str) -> Result<Goal> {
        self.get_goal(goal_id)?
            .ok_or_else(|| StoreError::not_found(NodeKind::Goal, goal_id).into())
    }
}
