//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::search::DEFAULT_TOP_K;

/// Policy assistant: answers questions about an organization's policy
/// manual with a retrieval, analysis and coordination agent pipeline.
#[derive(Parser, Debug)]
#[command(name = "policy-assistant")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the knowledge base file.
    ///
    /// Defaults to `.policy-assistant/knowledge.db` in the current directory.
    #[arg(short, long, env = "POLICY_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the knowledge base.
    #[command(after_help = r#"Examples:
  policy-assistant init                    # Initialize in current directory
  policy-assistant init --force            # Re-initialize (destroys existing data)
  policy-assistant --db-path ./kb.db init  # Initialize with custom path
"#)]
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Show knowledge base statistics.
    Status,

    /// Load a markdown policy document into the knowledge base.
    #[command(after_help = r#"Examples:
  policy-assistant ingest manual.md
  policy-assistant ingest travel.md --name "Travel Policy"
  policy-assistant ingest manual.md --chunk-size 800
"#)]
    Ingest {
        /// Path to the markdown file.
        file: PathBuf,

        /// Document name reported as the passage source. Defaults to the file stem.
        #[arg(short, long)]
        name: Option<String>,

        /// Maximum passage size in characters.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// List ingested documents.
    #[command(alias = "ls")]
    List,

    /// Remove a document and its passages.
    #[command(alias = "rm")]
    Remove {
        /// Document name.
        name: String,
    },

    /// Search passages with BM25 full-text ranking.
    #[command(after_help = r#"Examples:
  policy-assistant search "expense approval"
  policy-assistant search "leave" -k 5
  policy-assistant --format json search "travel" | jq '.results[].source'
"#)]
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Ask a policy question and print the structured answer.
    ///
    /// Requires an OpenAI-compatible API key.
    #[cfg(feature = "agent")]
    #[command(after_help = r#"Examples:
  policy-assistant ask "Who approves a 3000 hardware request?"
  policy-assistant --format json ask "How many approval steps for travel?"
  OPENAI_API_KEY=sk-... policy-assistant ask "What can HR approve?"
"#)]
    Ask {
        /// The question.
        query: String,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Ask a policy question and print pipeline events as they arrive.
    #[cfg(feature = "agent")]
    #[command(after_help = r#"Examples:
  policy-assistant stream "Who approves leave?"
  policy-assistant --format ndjson stream "Who approves leave?" | jq .type
"#)]
    Stream {
        /// The question.
        query: String,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Write default prompt templates to disk for customization.
    #[cfg(feature = "agent")]
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  policy-assistant init-prompts                     # Write to ~/.config/policy-assistant/prompts/
  policy-assistant init-prompts --dir ./prompts     # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Serve the HTTP API (JSON and Server-Sent Events).
    #[cfg(feature = "server")]
    #[command(after_help = r#"Examples:
  policy-assistant serve                        # Listen on 0.0.0.0:8000
  policy-assistant serve --addr 127.0.0.1:9000
"#)]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = crate::server::DEFAULT_ADDR)]
        addr: String,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),

    /// Run a domain tool directly, without the model.
    #[command(subcommand)]
    Tools(ToolCommands),
}

/// Options shared by commands that run the agent pipeline.
#[cfg(feature = "agent")]
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AgentArgs {
    /// Model for all three agents (overrides `POLICY_*_MODEL`).
    #[arg(long)]
    pub model: Option<String>,

    /// Passages retrieved per query.
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,

    /// Session identifier for log correlation.
    #[arg(long)]
    pub session_id: Option<String>,
}

/// Domain tool subcommands.
#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Count lines mentioning a keyword.
    #[command(after_help = r#"Examples:
  policy-assistant tools count --file manual.md
  policy-assistant tools count --text "Manager approval\nDirector approval" --keyword approval
"#)]
    Count {
        /// Text to scan.
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// File to scan.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Keyword to count (case-insensitive).
        #[arg(short, long, default_value = crate::tools::DEFAULT_KEYWORD)]
        keyword: String,
    },

    /// Look up a role's approval permissions.
    Role {
        /// Role name (employee, manager, director, hr, ceo).
        role: String,
    },

    /// Evaluate a calculator operation.
    #[command(after_help = r#"Examples:
  policy-assistant tools calc add --a 1200 --b 800
  policy-assistant tools calc divide --a 5000 --b 4
  policy-assistant tools calc factorial --n 5
  policy-assistant tools calc is_prime --n 97
"#)]
    Calc {
        /// Operation: add, subtract, multiply, divide, exponentiate,
        /// factorial, `is_prime`, `square_root`.
        operation: String,

        /// Left operand for binary operations.
        #[arg(long, allow_hyphen_values = true)]
        a: Option<f64>,

        /// Right operand for binary operations.
        #[arg(long, allow_hyphen_values = true)]
        b: Option<f64>,

        /// Operand for unary operations.
        #[arg(long, allow_hyphen_values = true)]
        n: Option<String>,
    },
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  policy-assistant mcp stdio
  OPENAI_API_KEY=sk-... policy-assistant mcp stdio
"#)]
    Stdio,

    /// Start MCP server with streamable HTTP transport.
    #[command(after_help = r#"Examples:
  policy-assistant mcp sse                            # Listen on 127.0.0.1:3000
  policy-assistant mcp sse --host 0.0.0.0 --port 8080
"#)]
    Sse {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
