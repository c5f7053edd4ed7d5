//! CLI command definitions for project-progress.
//!
//! The binary serves MCP over stdio by default; the other subcommands run a
//! single engine operation against the configured database and print JSON or
//! markdown to stdout.

use crate::progress::ProjectMode;
use crate::types::EntityKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Project progress MCP server and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the MCP server (default if no subcommand given)
    Serve,

    /// Print the computed progress of a goal or project
    Progress(ProgressArgs),

    /// Reconcile a goal or project to a target percentage
    Reconcile(ReconcileArgs),

    /// Mark a goal or project done, or cancel its completion
    Complete(CompleteArgs),
}

/// Entity kind on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Goal,
    Project,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Goal => EntityKind::Goal,
            KindArg::Project => EntityKind::Project,
        }
    }
}

/// Report format on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Markdown,
}

/// Project reconciliation mode on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    PerGoal,
    Flatten,
}

impl From<ModeArg> for ProjectMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PerGoal => ProjectMode::PerGoal,
            ModeArg::Flatten => ProjectMode::Flatten,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProgressArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    pub id: String,

    /// Output format (default from config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    pub id: String,

    /// Target percentage (0-100)
    pub target: i32,

    /// User performing the change
    #[arg(long)]
    pub actor: String,

    /// Projects only: per-goal (default from config) or flatten
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Output format (default from config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(Args, Debug)]
pub struct CompleteArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    pub id: String,

    /// User performing the change
    #[arg(long)]
    pub actor: String,

    /// Cancel a completion instead of marking done
    #[arg(long)]
    pub cancel: bool,
}
