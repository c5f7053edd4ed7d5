//! Per-request context passed to tool functions.

use crate::logging::Logger;

/// Per-request context passed to tools that report to the client.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Logger forwarding to tracing and the MCP client.
    pub logger: Logger,
}

impl ToolContext {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}
