//! Core types for the project progress server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete status of a task, goal or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    InProgress,
    Done,
    /// Flags a blocked task. Carries no implied percentage.
    Issue,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Issue => "issue",
        }
    }

    /// Parse a status name. Accepts both `in_progress` and `in-progress` spellings.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" | "todo" => Some(Status::NotStarted),
            "in_progress" => Some(Status::InProgress),
            "done" | "completed" => Some(Status::Done),
            "issue" => Some(Status::Issue),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity whose progress is aggregated from children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Goal,
    Project,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Goal => "goal",
            EntityKind::Project => "project",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "goal" => Some(EntityKind::Goal),
            "project" => Some(EntityKind::Project),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any node of the hierarchy, used for history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Project,
    Goal,
    Task,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Project => "project",
            NodeKind::Goal => "goal",
            NodeKind::Task => "task",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project" => Some(NodeKind::Project),
            "goal" => Some(NodeKind::Goal),
            "task" => Some(NodeKind::Task),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EntityKind> for NodeKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Goal => NodeKind::Goal,
            EntityKind::Project => NodeKind::Project,
        }
    }
}

/// Reference to a goal or project by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn goal(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Goal,
            id: id.into(),
        }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Project,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// The user on whose behalf a mutation is performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A leaf work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    /// Stored percentage (0-100). Authoritative when present.
    pub progress: Option<i32>,
    pub goal_id: Option<String>,
    pub project_id: String,
    pub assignees: Vec<String>,
    /// Bumped on every write; used for optimistic concurrency checks.
    pub version: i64,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A grouping of tasks within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Top-level grouping of goals and direct tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A goal with its tasks, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalTree {
    #[serde(flatten)]
    pub goal: Goal,
    pub tasks: Vec<Task>,
}

/// A project with its goals and the tasks attached directly to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTree {
    #[serde(flatten)]
    pub project: Project,
    pub goals: Vec<GoalTree>,
    pub tasks: Vec<Task>,
}

/// A goal or project returned from a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Goal(Goal),
    Project(Project),
}

impl Entity {
    pub fn status(&self) -> Status {
        match self {
            Entity::Goal(g) => g.status,
            Entity::Project(p) => p.status,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Goal(g) => &g.id,
            Entity::Project(p) => &p.id,
        }
    }
}

/// Partial update of a task. `None` leaves a field untouched;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub progress: Option<Option<i32>>,
    pub assignees: Option<Vec<String>>,
}

/// Why a status was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Create,
    Edit,
    Reconcile,
    Cascade,
    Complete,
    Cancel,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::Create => "create",
            ChangeReason::Edit => "edit",
            ChangeReason::Reconcile => "reconcile",
            ChangeReason::Cascade => "cascade",
            ChangeReason::Complete => "complete",
            ChangeReason::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ChangeReason::Create),
            "edit" => Some(ChangeReason::Edit),
            "reconcile" => Some(ChangeReason::Reconcile),
            "cascade" => Some(ChangeReason::Cascade),
            "complete" => Some(ChangeReason::Complete),
            "cancel" => Some(ChangeReason::Cancel),
            _ => None,
        }
    }
}

/// A recorded status change of any node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: i64,
    pub kind: NodeKind,
    pub entity_id: String,
    pub status: Status,
    pub progress: Option<i32>,
    pub actor: String,
    pub reason: ChangeReason,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_accepts_dash_and_underscore() {
        assert_eq!(Status::from_str("in-progress"), Some(Status::InProgress));
        assert_eq!(Status::from_str("IN_PROGRESS"), Some(Status::InProgress));
        assert_eq!(Status::from_str("not-started"), Some(Status::NotStarted));
        assert_eq!(Status::from_str("bogus"), None);
    }

    #[test]
    fn test_status_roundtrip_through_str() {
        for status in [
            Status::NotStarted,
            Status::InProgress,
            Status::Done,
            Status::Issue,
        ] {
            assert_eq!(Status::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_entity_serializes_with_kind_tag() {
        let project = Project {
            id: "p1".into(),
            name: "Launch".into(),
            description: None,
            status: Status::Done,
            created_by: "u1".into(),
            updated_by: "u1".into(),
            created_at: 0,
            updated_at: 0,
        };
        let value = serde_json::to_value(Entity::Project(project)).unwrap();
        assert_eq!(value["kind"], "project");
        assert_eq!(value["status"], "done");
    }
}
