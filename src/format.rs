//! Output formatting for progress reports.

use crate::progress::{ReconcileOutcome, task_progress};
use crate::types::{GoalTree, ProjectTree, Status, Task};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

const BAR_WIDTH: usize = 10;

/// Ten-cell bar, one cell per 10%, rounded down.
fn progress_bar(percent: i32) -> String {
    let filled = (percent.clamp(0, 100) as usize) / (100 / BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Format a status for display ("in_progress" -> "In Progress").
fn format_status_name(status: Status) -> String {
    status
        .as_str()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_task_short(task: &Task) -> String {
    let assignees = if task.assignees.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            task.assignees
                .iter()
                .map(|a| format!("@{}", a))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    let marker = if task.status == Status::Issue { "!!! " } else { "" };

    format!(
        "- {}{} `{}` {} {}%{}\n",
        marker,
        task.title,
        task.id,
        format_status_name(task.status),
        task_progress(task),
        assignees,
    )
}

/// Format a goal and its tasks as markdown.
pub fn format_goal_markdown(tree: &GoalTree) -> String {
    let percent = tree.progress_percentage();
    let mut md = String::new();

    md.push_str(&format!("## Goal: {}\n", tree.goal.title));
    md.push_str(&format!("- **id**: `{}`\n", tree.goal.id));
    md.push_str(&format!("- **status**: {}\n", format_status_name(tree.goal.status)));
    md.push_str(&format!("- **progress**: {} {}%\n", progress_bar(percent), percent));

    if tree.tasks.is_empty() {
        md.push_str("\n_No tasks._\n");
    } else {
        md.push('\n');
        for task in &tree.tasks {
            md.push_str(&format_task_short(task));
        }
    }

    md
}

/// Format a project with its goals and direct tasks as markdown.
pub fn format_project_markdown(tree: &ProjectTree) -> String {
    let percent = tree.progress_percentage();
    let mut md = String::new();

    md.push_str(&format!("# Project: {}\n", tree.project.name));
    md.push_str(&format!("- **id**: `{}`\n", tree.project.id));
    md.push_str(&format!("- **status**: {}\n", format_status_name(tree.project.status)));
    md.push_str(&format!("- **progress**: {} {}%\n", progress_bar(percent), percent));
    if !tree.goals.is_empty() {
        md.push_str(&format!("- **goals**: {}\n", tree.goals.len()));
    }
    md.push('\n');

    for goal in &tree.goals {
        md.push_str(&format_goal_markdown(goal));
        md.push('\n');
    }

    if !tree.tasks.is_empty() {
        md.push_str(&format!("## Direct tasks ({})\n\n", tree.tasks.len()));
        for task in &tree.tasks {
            md.push_str(&format_task_short(task));
        }
    }

    md
}

/// Format a reconciliation outcome as markdown.
pub fn format_reconcile_markdown(outcome: &ReconcileOutcome) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Reconciled {}\n", outcome.entity));
    md.push_str(&format!("- **requested**: {}%\n", outcome.requested_percentage));
    md.push_str(&format!("- **achieved**: {}%\n", outcome.achieved_percentage));
    if outcome.empty {
        md.push_str("- _nothing to reconcile: no tasks_\n");
        return md;
    }
    if !outcome.exact {
        md.push_str("- _target not exactly reachable with the current task count_\n");
    }
    md.push_str(&format!("- **tasks changed**: {}\n", outcome.tasks_changed));

    for change in &outcome.changes {
        md.push_str(&format!(
            "  - {} `{}`: {} -> {}\n",
            change.title,
            change.task_id,
            change.from,
            change.to
        ));
    }

    md
}

/// Convert markdown to JSON value for uniform response handling.
pub fn markdown_to_json(md: String) -> Value {
    serde_json::json!({
        "format": "markdown",
        "content": md
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::aggregate::fixtures::{goal_tree, tasks};
    use crate::types::Status::*;

    #[test]
    fn test_progress_bar_cells() {
        assert_eq!(progress_bar(0), "[----------]");
        assert_eq!(progress_bar(67), "[######----]");
        assert_eq!(progress_bar(100), "[##########]");
    }

    #[test]
    fn test_status_names() {
        assert_eq!(format_status_name(InProgress), "In Progress");
        assert_eq!(format_status_name(Done), "Done");
    }

    #[test]
    fn test_goal_markdown_lists_tasks_with_progress() {
        let md = format_goal_markdown(&goal_tree("g1", tasks(&[Done, Done, NotStarted])));
        assert!(md.contains("- **progress**: [######----] 67%"));
        assert!(md.contains("`t2` Not Started 0%"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from_str("MD"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
