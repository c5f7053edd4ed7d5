//! Task CRUD tools.

use super::{
    actor_property, get_i32, get_nullable_string, get_string, get_string_array,
    make_tool_with_prompts, require_actor, require_string,
};
use crate::config::Prompts;
use crate::db::Database;
use crate::db::tasks::NewTask;
use crate::error::ToolError;
use crate::progress::ProgressEngine;
use crate::types::{NodeKind, Status, TaskPatch};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};

const STATUS_ENUM: [&str; 4] = ["not_started", "in_progress", "done", "issue"];

pub fn get_tools(prompts: &Prompts) -> Vec<Tool> {
    vec![
        make_tool_with_prompts(
            "create_task",
            "Create a task under a goal (its project is inferred) or directly under a project. Progress, when given, decides the status unless the status is 'issue'.",
            json!({
                "title": { "type": "string", "description": "Task title" },
                "description": { "type": "string", "description": "Task description" },
                "goal": { "type": "string", "description": "Parent goal ID" },
                "project": { "type": "string", "description": "Parent project ID (required without goal)" },
                "status": { "type": "string", "enum": STATUS_ENUM, "description": "Initial status" },
                "progress": { "type": "integer", "minimum": 0, "maximum": 100, "description": "Initial progress percentage" },
                "assignees": { "type": "array", "items": { "type": "string" }, "description": "Assigned user IDs" },
                "actor": actor_property()
            }),
            vec!["title", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "get_task",
            "Get a task by ID.",
            json!({
                "task": { "type": "string", "description": "Task ID" }
            }),
            vec!["task"],
            prompts,
        ),
        make_tool_with_prompts(
            "list_tasks",
            "List tasks of a goal, the direct tasks of a project, or the tasks assigned to a user.",
            json!({
                "goal": { "type": "string", "description": "Goal ID" },
                "project": { "type": "string", "description": "Project ID (direct tasks only unless all=true)" },
                "all": { "type": "boolean", "description": "With project: include tasks under its goals" },
                "assignee": { "type": "string", "description": "User ID" }
            }),
            vec![],
            prompts,
        ),
        make_tool_with_prompts(
            "update_task",
            "Edit a task. Progress is authoritative and drives the status, except that 'issue' is kept. Setting a status alone resets progress to its canonical value. A parent goal or project marked done is moved back to in_progress when the task is no longer complete.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "title": { "type": "string", "description": "New title" },
                "description": { "type": ["string", "null"], "description": "New description (null clears)" },
                "status": { "type": "string", "enum": STATUS_ENUM, "description": "New status" },
                "progress": { "type": ["integer", "null"], "minimum": 0, "maximum": 100, "description": "New progress (null clears)" },
                "assignees": { "type": "array", "items": { "type": "string" }, "description": "Replace assignees" },
                "actor": actor_property()
            }),
            vec!["task", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "delete_task",
            "Delete a task.",
            json!({
                "task": { "type": "string", "description": "Task ID" }
            }),
            vec!["task"],
            prompts,
        ),
    ]
}

fn get_status(args: &Value) -> Result<Option<Status>> {
    match get_string(args, "status") {
        None => Ok(None),
        Some(s) => Status::from_str(&s).map(Some).ok_or_else(|| {
            ToolError::invalid_value("status", &format!("unknown status '{}'", s)).into()
        }),
    }
}

fn check_progress(progress: i32) -> Result<i32> {
    if !(0..=100).contains(&progress) {
        return Err(ToolError::invalid_value("progress", "progress must be between 0 and 100").into());
    }
    Ok(progress)
}

/// Read `progress`: absent, null (clear), or an integer in 0..=100.
fn get_progress_patch(args: &Value) -> Result<Option<Option<i32>>> {
    match args.get("progress") {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(_) => {
            let progress = get_i32(args, "progress").ok_or_else(|| {
                ToolError::invalid_value("progress", "progress must be an integer")
            })?;
            Ok(Some(Some(check_progress(progress)?)))
        }
    }
}

pub async fn create_task(engine: &ProgressEngine<Database>, args: Value) -> Result<Value> {
    let db = engine.store().as_ref();
    let actor = require_actor(&args)?;
    let goal_id = get_string(&args, "goal");
    let project_id = get_string(&args, "project");
    if goal_id.is_none() && project_id.is_none() {
        return Err(ToolError::missing_field("goal").with_details(json!({
            "reason": "a task needs a goal or a project"
        }))
        .into());
    }
    if let (Some(goal_id), Some(project_id)) = (&goal_id, &project_id) {
        let goal = db
            .get_goal(goal_id)?
            .ok_or_else(|| ToolError::not_found(NodeKind::Goal, goal_id))?;
        if &goal.project_id != project_id {
            return Err(ToolError::invalid_value(
                "project",
                &format!("goal {} belongs to project {}", goal_id, goal.project_id),
            )
            .into());
        }
    }

    let new = NewTask {
        id: None,
        title: require_string(&args, "title")?,
        description: get_string(&args, "description"),
        goal_id,
        project_id,
        status: get_status(&args)?,
        progress: get_progress_patch(&args)?.flatten(),
        assignees: get_string_array(&args, "assignees").unwrap_or_default(),
    };

    let task = db.create_task(new, &actor)?;
    engine.task_created(&task, &actor).await?;
    Ok(serde_json::to_value(task)?)
}

pub fn get_task(db: &Database, args: Value) -> Result<Value> {
    let task_id = require_string(&args, "task")?;
    let task = db
        .get_task(&task_id)?
        .ok_or_else(|| ToolError::not_found(NodeKind::Task, &task_id))?;
    Ok(serde_json::to_value(task)?)
}

pub fn list_tasks(db: &Database, args: Value) -> Result<Value> {
    let tasks = if let Some(goal_id) = get_string(&args, "goal") {
        if db.get_goal(&goal_id)?.is_none() {
            return Err(ToolError::not_found(NodeKind::Goal, &goal_id).into());
        }
        db.list_goal_tasks(&goal_id)?
    } else if let Some(project_id) = get_string(&args, "project") {
        if db.get_project(&project_id)?.is_none() {
            return Err(ToolError::not_found(NodeKind::Project, &project_id).into());
        }
        if args.get("all").and_then(|v| v.as_bool()).unwrap_or(false) {
            db.list_project_tasks(&project_id)?
        } else {
            db.list_direct_project_tasks(&project_id)?
        }
    } else if let Some(user_id) = get_string(&args, "assignee") {
        db.list_assigned_tasks(&user_id)?
    } else {
        return Err(ToolError::missing_field("goal")
            .with_details(json!({ "reason": "pass one of goal, project or assignee" }))
            .into());
    };

    Ok(json!({ "count": tasks.len(), "tasks": tasks }))
}

pub async fn update_task(engine: &ProgressEngine<Database>, args: Value) -> Result<Value> {
    let task_id = require_string(&args, "task")?;
    let actor = require_actor(&args)?;
    let patch = TaskPatch {
        title: get_string(&args, "title"),
        description: get_nullable_string(&args, "description"),
        status: get_status(&args)?,
        progress: get_progress_patch(&args)?,
        assignees: get_string_array(&args, "assignees"),
    };

    let task = engine.update_task(&task_id, patch, &actor).await?;
    Ok(serde_json::to_value(task)?)
}

pub fn delete_task(db: &Database, args: Value) -> Result<Value> {
    let task_id = require_string(&args, "task")?;
    if !db.delete_task(&task_id)? {
        return Err(ToolError::not_found(NodeKind::Task, &task_id).into());
    }
    Ok(json!({ "deleted": true, "task": task_id }))
}
