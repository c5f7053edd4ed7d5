//! Structured error types for tool responses.

use crate::progress::{ProgressError, StoreError};
use crate::types::NodeKind;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTarget,

    // Not found errors
    ProjectNotFound,
    GoalNotFound,
    TaskNotFound,

    // Rejected operations
    CompletionBlocked,
    VersionConflict,
    PartialBatchFailure,

    // Internal errors
    ConsistencyViolation,
    DatabaseError,
    InternalError,
    UnknownTool,
}

/// Structured error for tool responses.
#[derive(Debug, Serialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingRequiredField, format!("{} is required", field)).with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn not_found(kind: NodeKind, id: &str) -> Self {
        let code = match kind {
            NodeKind::Project => ErrorCode::ProjectNotFound,
            NodeKind::Goal => ErrorCode::GoalNotFound,
            NodeKind::Task => ErrorCode::TaskNotFound,
        };
        Self::new(code, format!("{} not found: {}", kind, id))
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { kind, id } => ToolError::not_found(*kind, id),
            StoreError::VersionConflict {
                task_id,
                expected,
                actual,
            } => ToolError::new(ErrorCode::VersionConflict, err.to_string()).with_details(json!({
                "task_id": task_id,
                "expected_version": expected,
                "actual_version": actual,
            })),
            StoreError::Backend(_) => ToolError::database(&err),
        }
    }
}

impl From<ProgressError> for ToolError {
    fn from(err: ProgressError) -> Self {
        let message = err.to_string();
        match err {
            ProgressError::InvalidTarget(_) => {
                ToolError::new(ErrorCode::InvalidTarget, message).with_field("target")
            }
            ProgressError::CompletionBlocked { entity, blockers } => {
                ToolError::new(ErrorCode::CompletionBlocked, message)
                    .with_details(json!({ "entity": entity, "blockers": blockers }))
            }
            ProgressError::PartialBatchFailure { applied, failed } => {
                ToolError::new(ErrorCode::PartialBatchFailure, message)
                    .with_details(json!({ "applied": applied, "failed": failed }))
            }
            ProgressError::ConsistencyViolation {
                target,
                realized,
                tasks,
            } => ToolError::new(ErrorCode::ConsistencyViolation, message).with_details(json!({
                "target": target,
                "realized": realized,
                "tasks": tasks,
            })),
            ProgressError::Store(store) => store.into(),
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ToolError>() {
            Ok(tool_err) => return tool_err,
            Err(err) => err,
        };
        let err = match err.downcast::<ProgressError>() {
            Ok(progress_err) => return progress_err.into(),
            Err(err) => err,
        };
        match err.downcast::<StoreError>() {
            Ok(store_err) => store_err.into(),
            Err(err) => ToolError::internal(format!("{err:#}")),
        }
    }
}
