//! Progress, reconciliation and completion tools.

use super::{
    ToolContext, actor_property, entity_properties, get_bool, get_format, get_i32, get_string,
    make_tool_with_prompts, require_actor, require_entity, require_string,
};
use crate::config::Prompts;
use crate::db::Database;
use crate::error::ToolError;
use crate::format::{
    OutputFormat, format_goal_markdown, format_project_markdown, format_reconcile_markdown,
    markdown_to_json,
};
use crate::progress::{GoalProgress, ProgressEngine, ProjectMode, ProjectProgress};
use crate::types::{EntityKind, NodeKind};
use anyhow::Result;
use rmcp::model::{LoggingLevel, Tool};
use serde_json::{Value, json};

const DEFAULT_HISTORY_LIMIT: usize = 50;

fn with_entity(extra: Value) -> Value {
    let mut props = entity_properties();
    if let Value::Object(extra) = extra {
        props.extend(extra);
    }
    Value::Object(props)
}

pub fn get_tools(prompts: &Prompts) -> Vec<Tool> {
    vec![
        make_tool_with_prompts(
            "get_progress",
            "Compute the progress of a goal (mean of its tasks) or a project (mean of its goals, one vote per goal; direct tasks when it has no goals).",
            with_entity(json!({
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default from server config)"
                }
            })),
            vec!["kind", "id"],
            prompts,
        ),
        make_tool_with_prompts(
            "reconcile_progress",
            "Set a goal's or project's progress to a target percentage by changing as few task statuses as possible. Reports the achieved percentage, which can differ from the target when the task count cannot express it exactly.",
            with_entity(json!({
                "target": { "type": "integer", "minimum": 0, "maximum": 100, "description": "Target percentage" },
                "mode": {
                    "type": "string",
                    "enum": ["per_goal", "flatten"],
                    "description": "Projects only: reconcile each goal to the target, or solve once over all goal tasks"
                },
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default from server config)"
                },
                "actor": actor_property()
            })),
            vec!["kind", "id", "target", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "can_complete",
            "Check whether a goal or project can be marked done, listing the children that block it.",
            with_entity(json!({})),
            vec!["kind", "id"],
            prompts,
        ),
        make_tool_with_prompts(
            "set_completion",
            "Mark a goal or project done (only when every child is at 100%), or cancel a completion with complete=false, which recomputes its status from its children.",
            with_entity(json!({
                "complete": { "type": "boolean", "description": "true to mark done, false to cancel" },
                "actor": actor_property()
            })),
            vec!["kind", "id", "complete", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "status_history",
            "Status changes of a task, goal or project with actor and reason, oldest first. Without an entity, the most recent changes overall.",
            json!({
                "kind": { "type": "string", "enum": ["task", "goal", "project"], "description": "Entity kind" },
                "id": { "type": "string", "description": "Entity ID" },
                "limit": { "type": "integer", "description": "Max recent entries when no entity is given (default 50)" }
            }),
            vec![],
            prompts,
        ),
    ]
}

pub async fn get_progress(
    engine: &ProgressEngine<Database>,
    default_format: OutputFormat,
    args: Value,
) -> Result<Value> {
    let entity = require_entity(&args)?;
    let format = get_format(&args, default_format);

    match entity.kind {
        EntityKind::Goal => {
            let tree = engine.goal_tree(&entity.id).await?;
            match format {
                OutputFormat::Markdown => Ok(markdown_to_json(format_goal_markdown(&tree))),
                OutputFormat::Json => Ok(serde_json::to_value(GoalProgress::from(&tree))?),
            }
        }
        EntityKind::Project => {
            let tree = engine.project_tree(&entity.id).await?;
            match format {
                OutputFormat::Markdown => Ok(markdown_to_json(format_project_markdown(&tree))),
                OutputFormat::Json => Ok(serde_json::to_value(ProjectProgress::from(&tree))?),
            }
        }
    }
}

pub async fn reconcile_progress(
    engine: &ProgressEngine<Database>,
    default_format: OutputFormat,
    ctx: &ToolContext,
    args: Value,
) -> Result<Value> {
    let entity = require_entity(&args)?;
    let target = get_i32(&args, "target").ok_or_else(|| ToolError::missing_field("target"))?;
    let mode = match get_string(&args, "mode") {
        Some(mode) => Some(ProjectMode::from_str(&mode).ok_or_else(|| {
            ToolError::invalid_value("mode", "mode must be 'per_goal' or 'flatten'")
        })?),
        None => None,
    };
    let actor = require_actor(&args)?;

    let outcome = engine.reconcile_progress(&entity, target, mode, &actor).await?;

    if !outcome.exact {
        ctx.logger.log_with_data(
            LoggingLevel::Notice,
            &format!(
                "{} reconciled to {}% instead of the requested {}%",
                entity, outcome.achieved_percentage, outcome.requested_percentage
            ),
            json!({
                "entity": entity,
                "requested": outcome.requested_percentage,
                "achieved": outcome.achieved_percentage,
            }),
        );
    }

    match get_format(&args, default_format) {
        OutputFormat::Markdown => Ok(markdown_to_json(format_reconcile_markdown(&outcome))),
        OutputFormat::Json => Ok(serde_json::to_value(outcome)?),
    }
}

pub async fn can_complete(engine: &ProgressEngine<Database>, args: Value) -> Result<Value> {
    let entity = require_entity(&args)?;
    let check = engine.can_mark_complete(&entity).await?;
    Ok(json!({
        "entity": entity,
        "completable": check.completable,
        "blockers": check.blockers,
    }))
}

pub async fn set_completion(
    engine: &ProgressEngine<Database>,
    ctx: &ToolContext,
    args: Value,
) -> Result<Value> {
    let entity = require_entity(&args)?;
    let complete = get_bool(&args, "complete").ok_or_else(|| ToolError::missing_field("complete"))?;
    let actor = require_actor(&args)?;

    let updated = engine.set_completion(&entity, complete, &actor).await?;
    ctx.logger
        .info(&format!("{} is now {}", entity, updated.status()));
    Ok(serde_json::to_value(updated)?)
}

pub fn status_history(db: &Database, args: Value) -> Result<Value> {
    let Some(kind) = get_string(&args, "kind") else {
        let limit = get_i32(&args, "limit")
            .filter(|l| *l > 0)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        let events = db.get_recent_history(limit)?;
        return Ok(json!({ "events": events }));
    };

    let kind = NodeKind::from_str(&kind)
        .ok_or_else(|| ToolError::invalid_value("kind", "kind must be 'task', 'goal' or 'project'"))?;
    let id = require_string(&args, "id")?;
    let events = db.get_status_history(kind, &id)?;
    Ok(json!({ "kind": kind, "id": id, "events": events }))
}
