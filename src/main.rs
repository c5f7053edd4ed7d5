//! Project Progress MCP Server
//!
//! Serves project/goal/task progress tracking and target-driven status
//! reconciliation over MCP, with a few direct CLI subcommands.

use anyhow::Result;
use clap::Parser;
use project_progress_mcp::cli::{Cli, Command, CompleteArgs, FormatArg, ProgressArgs, ReconcileArgs};
use project_progress_mcp::config::{CONFIG_PATH_ENV, Config, ConfigLoader, Prompts};
use project_progress_mcp::db::Database;
use project_progress_mcp::error::ToolError;
use project_progress_mcp::format::{
    OutputFormat, format_goal_markdown, format_project_markdown, format_reconcile_markdown,
};
use project_progress_mcp::logging::{LogLevelFilter, LogTarget, Logger, init_tracing};
use project_progress_mcp::progress::{
    GoalProgress, ProgressEngine, ProjectProgress, ReconcileSettings,
};
use project_progress_mcp::tools::{ToolContext, ToolHandler};
use project_progress_mcp::types::{Actor, EntityKind, EntityRef};
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, Content, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
    transport::io::stdio,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MCP server handler.
#[derive(Clone)]
struct ProgressServer {
    tool_handler: Arc<ToolHandler>,
    prompts: Arc<Prompts>,
    /// Minimum level forwarded to the client (adjustable via logging/setLevel).
    level_filter: Arc<LogLevelFilter>,
}

/// Default server instructions when no prompts.yaml is present.
const DEFAULT_INSTRUCTIONS: &str = "\
Progress tracking for projects, goals and tasks. Read progress with get_progress; \
set a target with reconcile_progress; mark goals or projects done with set_completion \
after checking can_complete. Every change needs an actor.";

impl ServerHandler for ProgressServer {
    fn get_info(&self) -> InitializeResult {
        let instructions = self
            .prompts
            .instructions
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "project-progress-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                logging: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(instructions),
        }
    }

    async fn set_level(
        &self,
        request: rmcp::model::SetLevelRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<(), ErrorData> {
        self.level_filter.set(request.level);
        info!(level = ?request.level, "Logging level updated via MCP");
        Ok(())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_handler.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let tool_name = request.name.to_string();
        let start = std::time::Instant::now();

        let logger = Logger::new()
            .with_peer(context.peer.clone())
            .with_level_filter(Arc::clone(&self.level_filter))
            .with_name(format!("tool:{}", tool_name));
        let tool_ctx = ToolContext::new(logger);

        let args = Value::Object(request.arguments.unwrap_or_default());
        match self.tool_handler.call_tool(&tool_name, args, &tool_ctx).await {
            Ok(result) => {
                debug!(
                    tool = %tool_name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                Ok(CallToolResult {
                    content: vec![Content::text(result.to_string())],
                    is_error: None,
                    meta: None,
                    structured_content: None,
                })
            }
            Err(e) => {
                let tool_err = ToolError::from(e);
                warn!(
                    tool = %tool_name,
                    error_code = ?tool_err.code,
                    error_message = %tool_err.message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call failed"
                );
                let error_json = serde_json::to_string(&tool_err)
                    .unwrap_or_else(|_| json!({ "error": tool_err.to_string() }).to_string());
                Ok(CallToolResult {
                    content: vec![Content::text(error_json)],
                    is_error: Some(true),
                    meta: None,
                    structured_content: None,
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogTarget::parse(&cli.log), cli.verbose)?;

    // An explicit config file is picked up by the loader through the environment
    if let Some(config_path) = &cli.config {
        // SAFETY: single-threaded at this point; the runtime has not spawned tasks yet
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(db_path) = &cli.database {
        loader.config_mut().server.db_path = db_path.into();
    }
    if let Some(path) = loader.config_path() {
        info!(path = %path.display(), "Using config file");
    }

    match cli.command {
        Some(Command::Serve) | None => {
            let prompts = loader.load_prompts();
            run_server(loader.into_config(), prompts).await?;
        }
        Some(Command::Progress(args)) => run_progress(&loader.into_config(), args).await?,
        Some(Command::Reconcile(args)) => run_reconcile(&loader.into_config(), args).await?,
        Some(Command::Complete(args)) => run_complete(&loader.into_config(), args).await?,
    }

    Ok(())
}

/// Run the MCP server on stdio.
async fn run_server(config: Config, prompts: Prompts) -> Result<()> {
    info!("Starting project-progress-mcp server");
    info!(db_path = %config.server.db_path.display(), "Opening database");
    let db = Arc::new(Database::open(&config.server.db_path)?);

    let settings = ReconcileSettings::from(config.reconcile);
    info!(?settings, "Reconciliation settings");

    let prompts = Arc::new(prompts);
    let server = ProgressServer {
        tool_handler: Arc::new(ToolHandler::new(
            db,
            settings,
            Arc::clone(&prompts),
            config.server.default_format,
        )),
        prompts,
        level_filter: Arc::new(LogLevelFilter::default()),
    };

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    info!("Server shut down");
    Ok(())
}

fn open_engine(config: &Config) -> Result<ProgressEngine<Database>> {
    let db = Arc::new(Database::open(&config.server.db_path)?);
    Ok(ProgressEngine::new(db, ReconcileSettings::from(config.reconcile)))
}

fn resolve_format(arg: Option<FormatArg>, config: &Config) -> OutputFormat {
    match arg {
        Some(FormatArg::Json) => OutputFormat::Json,
        Some(FormatArg::Markdown) => OutputFormat::Markdown,
        None => config.server.default_format,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_progress(config: &Config, args: ProgressArgs) -> Result<()> {
    let engine = open_engine(config)?;
    let format = resolve_format(args.format, config);

    match EntityKind::from(args.kind) {
        EntityKind::Goal => {
            let tree = engine.goal_tree(&args.id).await?;
            match format {
                OutputFormat::Markdown => print!("{}", format_goal_markdown(&tree)),
                OutputFormat::Json => print_json(&GoalProgress::from(&tree))?,
            }
        }
        EntityKind::Project => {
            let tree = engine.project_tree(&args.id).await?;
            match format {
                OutputFormat::Markdown => print!("{}", format_project_markdown(&tree)),
                OutputFormat::Json => print_json(&ProjectProgress::from(&tree))?,
            }
        }
    }
    Ok(())
}

async fn run_reconcile(config: &Config, args: ReconcileArgs) -> Result<()> {
    let engine = open_engine(config)?;
    let entity = EntityRef {
        kind: args.kind.into(),
        id: args.id,
    };
    let outcome = engine
        .reconcile_progress(&entity, args.target, args.mode.map(Into::into), &Actor::new(args.actor))
        .await?;

    match resolve_format(args.format, config) {
        OutputFormat::Markdown => print!("{}", format_reconcile_markdown(&outcome)),
        OutputFormat::Json => print_json(&outcome)?,
    }
    Ok(())
}

async fn run_complete(config: &Config, args: CompleteArgs) -> Result<()> {
    let engine = open_engine(config)?;
    let entity = EntityRef {
        kind: args.kind.into(),
        id: args.id,
    };
    let updated = engine
        .set_completion(&entity, !args.cancel, &Actor::new(args.actor))
        .await?;
    print_json(&updated)
}
