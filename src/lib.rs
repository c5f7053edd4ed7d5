//! Project Progress MCP Server Library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod progress;
pub mod tools;
pub mod types;
