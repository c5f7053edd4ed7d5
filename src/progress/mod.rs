//! Progress aggregation and reconciliation engine.
//!
//! Pure pieces (mapping, aggregation, solver, planner, completion gate) are
//! plain functions over task snapshots. The [`ProgressEngine`] wires them to
//! a [`ProgressStore`] and applies the resulting writes.

pub mod aggregate;
pub mod cascade;
pub mod engine;
pub mod gate;
pub mod mapping;
pub mod planner;
pub mod solver;
pub mod store;

pub use aggregate::{GoalProgress, ProjectProgress, goal_progress, project_progress, task_progress};
pub use engine::{ProgressEngine, ReconcileOutcome, ReconcileSettings};
pub use gate::CompletionCheck;
pub use planner::{Plan, StatusChange};
pub use solver::{Distribution, IssuePolicy, Solution};
pub use store::{ProgressStore, StoreError, TaskStatusUpdate};

use crate::types::EntityRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a project-level reconciliation distributes work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectMode {
    /// Reconcile every goal to the target independently.
    #[default]
    PerGoal,
    /// Solve once over the union of all the project's goal tasks.
    Flatten,
}

impl ProjectMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_goal" => Some(ProjectMode::PerGoal),
            "flatten" => Some(ProjectMode::Flatten),
            _ => None,
        }
    }
}

/// A task write that did not land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub task_id: String,
    pub reason: String,
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("target percentage {0} is outside 0..=100")]
    InvalidTarget(i32),

    #[error("{entity} cannot be marked complete: blocked by {}", .blockers.join(", "))]
    CompletionBlocked {
        entity: EntityRef,
        blockers: Vec<String>,
    },

    #[error("{} of {} task updates failed", .failed.len(), .failed.len() + .applied.len())]
    PartialBatchFailure {
        applied: Vec<String>,
        failed: Vec<FailedUpdate>,
    },

    #[error("planned distribution {target:?} realized as {realized:?} over tasks [{}]", .tasks.join(", "))]
    ConsistencyViolation {
        target: Distribution,
        realized: Distribution,
        tasks: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
