//! Goal CRUD tools.

use super::{
    actor_property, get_format, get_nullable_string, get_string, make_tool_with_prompts,
    require_actor, require_string,
};
use crate::config::Prompts;
use crate::db::Database;
use crate::error::ToolError;
use crate::format::{OutputFormat, format_goal_markdown, markdown_to_json};
use crate::progress::GoalProgress;
use crate::types::{GoalTree, NodeKind};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};

pub fn get_tools(prompts: &Prompts) -> Vec<Tool> {
    vec![
        make_tool_with_prompts(
            "create_goal",
            "Create a goal inside a project.",
            json!({
                "project": { "type": "string", "description": "Parent project ID" },
                "title": { "type": "string", "description": "Goal title" },
                "description": { "type": "string", "description": "Goal description" },
                "actor": actor_property()
            }),
            vec!["project", "title", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "get_goal",
            "Get a goal with its tasks and computed progress.",
            json!({
                "goal": { "type": "string", "description": "Goal ID" },
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default from server config)"
                }
            }),
            vec!["goal"],
            prompts,
        ),
        make_tool_with_prompts(
            "list_goals",
            "List the goals of a project with their progress.",
            json!({
                "project": { "type": "string", "description": "Project ID" }
            }),
            vec!["project"],
            prompts,
        ),
        make_tool_with_prompts(
            "update_goal",
            "Change a goal's title or description. Pass description=null to clear it. Use set_completion to change its status.",
            json!({
                "goal": { "type": "string", "description": "Goal ID" },
                "title": { "type": "string", "description": "New title" },
                "description": { "type": ["string", "null"], "description": "New description" },
                "actor": actor_property()
            }),
            vec!["goal", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "delete_goal",
            "Delete a goal together with its tasks.",
            json!({
                "goal": { "type": "string", "description": "Goal ID" }
            }),
            vec!["goal"],
            prompts,
        ),
    ]
}

pub fn create_goal(db: &Database, args: Value) -> Result<Value> {
    let project_id = require_string(&args, "project")?;
    let title = require_string(&args, "title")?;
    let description = get_string(&args, "description");
    let actor = require_actor(&args)?;

    let goal = db.create_goal(None, &project_id, title, description, &actor)?;
    Ok(serde_json::to_value(goal)?)
}

pub fn get_goal(db: &Database, default_format: OutputFormat, args: Value) -> Result<Value> {
    let goal_id = require_string(&args, "goal")?;
    let tree = db
        .get_goal_tree(&goal_id)?
        .ok_or_else(|| ToolError::not_found(NodeKind::Goal, &goal_id))?;

    match get_format(&args, default_format) {
        OutputFormat::Markdown => Ok(markdown_to_json(format_goal_markdown(&tree))),
        OutputFormat::Json => {
            let progress = tree.progress_percentage();
            let mut value = serde_json::to_value(&tree)?;
            value["progress"] = json!(progress);
            Ok(value)
        }
    }
}

pub fn list_goals(db: &Database, args: Value) -> Result<Value> {
    let project_id = require_string(&args, "project")?;
    if db.get_project(&project_id)?.is_none() {
        return Err(ToolError::not_found(NodeKind::Project, &project_id).into());
    }

    let mut goals = Vec::new();
    for goal in db.list_goals(&project_id)? {
        let tasks = db.list_goal_tasks(&goal.id)?;
        goals.push(GoalProgress::from(&GoalTree { goal, tasks }));
    }
    Ok(json!({ "project": project_id, "goals": goals }))
}

pub fn update_goal(db: &Database, args: Value) -> Result<Value> {
    let goal_id = require_string(&args, "goal")?;
    let title = get_string(&args, "title");
    let description = get_nullable_string(&args, "description");
    let actor = require_actor(&args)?;

    let goal = db.update_goal(&goal_id, title, description, &actor)?;
    Ok(serde_json::to_value(goal)?)
}

pub fn delete_goal(db: &Database, args: Value) -> Result<Value> {
    let goal_id = require_string(&args, "goal")?;
    if !db.delete_goal(&goal_id)? {
        return Err(ToolError::not_found(NodeKind::Goal, &goal_id).into());
    }
    Ok(json!({ "deleted": true, "goal": goal_id }))
}
