//! CLI layer for policy-assistant.
//!
//! Provides the command-line interface using clap, with commands for
//! managing the knowledge base, running the agent pipeline, serving the
//! transports and calling the domain tools directly.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "agent")]
pub use parser::AgentArgs;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands, ToolCommands};
