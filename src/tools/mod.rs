//! MCP tool implementations.

pub mod context;
pub mod goals;
pub mod progress;
pub mod projects;
pub mod tasks;

pub use context::ToolContext;

use crate::config::Prompts;
use crate::db::Database;
use crate::error::ToolError;
use crate::format::OutputFormat;
use crate::progress::{ProgressEngine, ReconcileSettings};
use crate::types::{Actor, EntityKind, EntityRef};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::Value;
use std::sync::Arc;

/// Tool handler that processes MCP tool calls.
pub struct ToolHandler {
    pub db: Arc<Database>,
    pub engine: ProgressEngine<Database>,
    pub prompts: Arc<Prompts>,
    pub default_format: OutputFormat,
}

impl ToolHandler {
    pub fn new(
        db: Arc<Database>,
        settings: ReconcileSettings,
        prompts: Arc<Prompts>,
        default_format: OutputFormat,
    ) -> Self {
        let engine = ProgressEngine::new(Arc::clone(&db), settings);
        Self {
            db,
            engine,
            prompts,
            default_format,
        }
    }

    /// Get all available tools.
    pub fn get_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        tools.extend(projects::get_tools(&self.prompts));
        tools.extend(goals::get_tools(&self.prompts));
        tools.extend(tasks::get_tools(&self.prompts));
        tools.extend(progress::get_tools(&self.prompts));
        tools
    }

    /// Call a tool by name.
    pub async fn call_tool(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Result<Value> {
        match name {
            // Project tools
            "create_project" => projects::create_project(&self.db, arguments),
            "get_project" => projects::get_project(&self.db, self.default_format, arguments),
            "list_projects" => projects::list_projects(&self.db, arguments),
            "update_project" => projects::update_project(&self.db, arguments),
            "delete_project" => projects::delete_project(&self.db, arguments),

            // Goal tools
            "create_goal" => goals::create_goal(&self.db, arguments),
            "get_goal" => goals::get_goal(&self.db, self.default_format, arguments),
            "list_goals" => goals::list_goals(&self.db, arguments),
            "update_goal" => goals::update_goal(&self.db, arguments),
            "delete_goal" => goals::delete_goal(&self.db, arguments),

            // Task tools
            "create_task" => tasks::create_task(&self.engine, arguments).await,
            "get_task" => tasks::get_task(&self.db, arguments),
            "list_tasks" => tasks::list_tasks(&self.db, arguments),
            "update_task" => tasks::update_task(&self.engine, arguments).await,
            "delete_task" => tasks::delete_task(&self.db, arguments),

            // Progress tools
            "get_progress" => progress::get_progress(&self.engine, self.default_format, arguments).await,
            "reconcile_progress" => {
                progress::reconcile_progress(&self.engine, self.default_format, ctx, arguments).await
            }
            "can_complete" => progress::can_complete(&self.engine, arguments).await,
            "set_completion" => progress::set_completion(&self.engine, ctx, arguments).await,
            "status_history" => progress::status_history(&self.db, arguments),

            _ => Err(ToolError::unknown_tool(name).into()),
        }
    }
}

/// Helper to create a tool definition.
pub fn make_tool(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Tool {
    let input_schema = rmcp::model::JsonObject::from_iter([
        ("type".to_string(), serde_json::json!("object")),
        ("properties".to_string(), properties),
        ("required".to_string(), serde_json::json!(required)),
    ]);

    Tool::new(name.to_string(), description.to_string(), input_schema)
}

/// Create a tool definition, preferring a description override from prompts.
pub fn make_tool_with_prompts(
    name: &str,
    default_description: &str,
    properties: Value,
    required: Vec<&str>,
    prompts: &Prompts,
) -> Tool {
    let description = prompts
        .get_tool_description(name)
        .unwrap_or(default_description);
    make_tool(name, description, properties, required)
}

/// Schema fragment for the `actor` argument shared by all mutating tools.
pub fn actor_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "ID of the user performing the change"
    })
}

/// Helper to get a string from arguments.
pub fn get_string(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str().map(String::from))
}

/// Helper to get a required string from arguments.
pub fn require_string(args: &Value, key: &str) -> Result<String> {
    get_string(args, key).ok_or_else(|| ToolError::missing_field(key).into())
}

/// Helper to get an i32 from arguments.
pub fn get_i32(args: &Value, key: &str) -> Option<i32> {
    args.get(key).and_then(|v| v.as_i64().map(|n| n as i32))
}

/// Helper to get a bool from arguments.
pub fn get_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}

/// Helper to get a string array from arguments.
pub fn get_string_array(args: &Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(|v| {
        v.as_array().map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    })
}

/// Distinguish an absent key from an explicit null.
///
/// Returns `None` when absent, `Some(None)` for null, `Some(Some(s))` for a string.
pub fn get_nullable_string(args: &Value, key: &str) -> Option<Option<String>> {
    match args.get(key) {
        None => None,
        Some(Value::Null) => Some(None),
        Some(v) => Some(v.as_str().map(String::from)),
    }
}

/// The acting user. Every mutating tool requires one.
pub fn require_actor(args: &Value) -> Result<Actor> {
    let id = require_string(args, "actor")?;
    if id.trim().is_empty() {
        return Err(ToolError::invalid_value("actor", "actor must not be empty").into());
    }
    Ok(Actor::new(id))
}

/// Parse `kind` (goal or project) and `id` into an entity reference.
pub fn require_entity(args: &Value) -> Result<EntityRef> {
    let kind = require_string(args, "kind")?;
    let kind = EntityKind::from_str(&kind)
        .ok_or_else(|| ToolError::invalid_value("kind", "kind must be 'goal' or 'project'"))?;
    let id = require_string(args, "id")?;
    Ok(EntityRef { kind, id })
}

/// Resolve the `format` argument, falling back to the server default.
pub fn get_format(args: &Value, default: OutputFormat) -> OutputFormat {
    get_string(args, "format")
        .and_then(|f| OutputFormat::from_str(&f))
        .unwrap_or(default)
}

/// Schema fragment for goal/project entity arguments.
pub fn entity_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "kind".to_string(),
        serde_json::json!({
            "type": "string",
            "enum": ["goal", "project"],
            "description": "Entity kind"
        }),
    );
    props.insert(
        "id".to_string(),
        serde_json::json!({
            "type": "string",
            "description": "Goal or project ID"
        }),
    );
    props
}
