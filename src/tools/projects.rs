//! Project CRUD tools.

use super::{
    actor_property, get_format, get_nullable_string, get_string, make_tool_with_prompts,
    require_actor, require_string,
};
use crate::config::Prompts;
use crate::db::Database;
use crate::error::ToolError;
use crate::format::{OutputFormat, format_project_markdown, markdown_to_json};
use crate::progress::ProjectProgress;
use crate::types::NodeKind;
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};

pub fn get_tools(prompts: &Prompts) -> Vec<Tool> {
    vec![
        make_tool_with_prompts(
            "create_project",
            "Create a new project.",
            json!({
                "name": { "type": "string", "description": "Project name" },
                "description": { "type": "string", "description": "Project description" },
                "actor": actor_property()
            }),
            vec!["name", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "get_project",
            "Get a project with its goals, tasks and computed progress.",
            json!({
                "project": { "type": "string", "description": "Project ID" },
                "format": {
                    "type": "string",
                    "enum": ["json", "markdown"],
                    "description": "Output format (default from server config)"
                }
            }),
            vec!["project"],
            prompts,
        ),
        make_tool_with_prompts(
            "list_projects",
            "List all projects with their progress.",
            json!({}),
            vec![],
            prompts,
        ),
        make_tool_with_prompts(
            "update_project",
            "Rename a project or change its description. Pass description=null to clear it.",
            json!({
                "project": { "type": "string", "description": "Project ID" },
                "name": { "type": "string", "description": "New name" },
                "description": { "type": ["string", "null"], "description": "New description" },
                "actor": actor_property()
            }),
            vec!["project", "actor"],
            prompts,
        ),
        make_tool_with_prompts(
            "delete_project",
            "Delete a project together with all its goals and tasks.",
            json!({
                "project": { "type": "string", "description": "Project ID" }
            }),
            vec!["project"],
            prompts,
        ),
    ]
}

pub fn create_project(db: &Database, args: Value) -> Result<Value> {
    let name = require_string(&args, "name")?;
    let description = get_string(&args, "description");
    let actor = require_actor(&args)?;

    let project = db.create_project(None, name, description, &actor)?;
    Ok(serde_json::to_value(project)?)
}

pub fn get_project(db: &Database, default_format: OutputFormat, args: Value) -> Result<Value> {
    let project_id = require_string(&args, "project")?;
    let tree = db
        .get_project_tree(&project_id)?
        .ok_or_else(|| ToolError::not_found(NodeKind::Project, &project_id))?;

    match get_format(&args, default_format) {
        OutputFormat::Markdown => Ok(markdown_to_json(format_project_markdown(&tree))),
        OutputFormat::Json => {
            let progress = tree.progress_percentage();
            let mut value = serde_json::to_value(&tree)?;
            value["progress"] = json!(progress);
            Ok(value)
        }
    }
}

pub fn list_projects(db: &Database, _args: Value) -> Result<Value> {
    let mut summaries = Vec::new();
    for project in db.list_projects()? {
        if let Some(tree) = db.get_project_tree(&project.id)? {
            summaries.push(ProjectProgress::from(&tree));
        }
    }
    Ok(json!({ "projects": summaries }))
}

pub fn update_project(db: &Database, args: Value) -> Result<Value> {
    let project_id = require_string(&args, "project")?;
    let name = get_string(&args, "name");
    let description = get_nullable_string(&args, "description");
    let actor = require_actor(&args)?;

    let project = db.update_project(&project_id, name, description, &actor)?;
    Ok(serde_json::to_value(project)?)
}

pub fn delete_project(db: &Database, args: Value) -> Result<Value> {
    let project_id = require_string(&args, "project")?;
    if !db.delete_project(&project_id)? {
        return Err(ToolError::not_found(NodeKind::Project, &project_id).into());
    }
    Ok(json!({ "deleted": true, "project": project_id }))
}
