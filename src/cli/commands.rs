//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

#![allow(clippy::format_push_string)]

use std::path::Path;

use serde_json::{Map, Value};

use crate::chunking::{MIN_CHUNK_SIZE, chunk_markdown};
use crate::cli::output::{
    OutputFormat, format_document_list, format_evaluation, format_keyword_count, format_role,
    format_search_results, format_status,
};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands, ToolCommands};
use crate::error::{CommandError, Result, StorageError};
use crate::search::search_bm25;
use crate::storage::SqliteStorage;
use crate::tools::{Calculation, count_keyword, role_lookup};

#[cfg(feature = "agent")]
use crate::agent::Orchestrator;
#[cfg(feature = "agent")]
use crate::cli::parser::AgentArgs;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success. Commands that write progressively
/// (`stream`, `serve`, `mcp`) return an empty string.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force, format),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Ingest {
            file,
            name,
            chunk_size,
        } => cmd_ingest(&db_path, file, name.as_deref(), *chunk_size, format),
        Commands::List => cmd_list(&db_path, format),
        Commands::Remove { name } => cmd_remove(&db_path, name, format),
        Commands::Search { query, top_k } => cmd_search(&db_path, query, *top_k, format),

        // ── Agent pipeline ──────────────────────────────────────
        #[cfg(feature = "agent")]
        Commands::Ask { query, agent } => cmd_ask(&db_path, query, agent, format),
        #[cfg(feature = "agent")]
        Commands::Stream { query, agent } => cmd_stream(&db_path, query, agent, format),
        #[cfg(feature = "agent")]
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),

        // ── Transports ──────────────────────────────────────────
        #[cfg(feature = "server")]
        Commands::Serve { addr, agent } => cmd_serve(&db_path, addr, agent),
        #[cfg(feature = "mcp")]
        Commands::Mcp(sub) => cmd_mcp(sub, &db_path),

        // ── Domain tools ────────────────────────────────────────
        Commands::Tools(sub) => cmd_tools(sub, format),
    }
}

/// Opens storage and ensures it's initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStorage> {
    let storage = SqliteStorage::open(db_path)?;

    if !storage.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(storage)
}

// ==================== Knowledge Base ====================

fn cmd_init(db_path: &Path, force: bool, format: OutputFormat) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Knowledge base already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to create directory: {e}"))
        })?;
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing knowledge base: {e}"))
        })?;
    }

    let mut storage = SqliteStorage::open(db_path)?;
    storage.init()?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Initialized policy knowledge base at: {}\n",
            db_path.display()
        )),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "success": true,
                "path": db_path.to_string_lossy(),
                "force": force
            });
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let stats = storage.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_ingest(
    db_path: &Path,
    file: &Path,
    name: Option<&str>,
    chunk_size: usize,
    format: OutputFormat,
) -> Result<String> {
    if chunk_size < MIN_CHUNK_SIZE {
        return Err(CommandError::InvalidArgument(format!(
            "chunk size must be at least {MIN_CHUNK_SIZE}"
        ))
        .into());
    }

    let mut storage = open_storage(db_path)?;
    let text = std::fs::read_to_string(file).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to read {}: {e}", file.display()))
    })?;

    let name = name
        .map(str::to_string)
        .or_else(|| {
            file.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .ok_or_else(|| {
            CommandError::InvalidArgument("cannot derive a document name; use --name".to_string())
        })?;
    let filename = file.file_name().and_then(|s| s.to_str());

    let passages = chunk_markdown(&text, chunk_size);
    if passages.is_empty() {
        return Err(CommandError::ExecutionFailed(format!(
            "{} contains no text to index",
            file.display()
        ))
        .into());
    }

    let id = storage.add_document(&name, filename, text.len(), &passages)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Ingested '{name}' ({} bytes) as document {id} with {} passage(s)\n",
            text.len(),
            passages.len()
        )),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "id": id,
                "name": name,
                "filename": filename,
                "size": text.len(),
                "passages": passages.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_list(db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let documents = storage.list_documents()?;
    Ok(format_document_list(&documents, format))
}

fn cmd_remove(db_path: &Path, name: &str, format: OutputFormat) -> Result<String> {
    let mut storage = open_storage(db_path)?;
    if !storage.remove_document(name)? {
        return Err(CommandError::ExecutionFailed(format!("Document not found: {name}")).into());
    }

    match format {
        OutputFormat::Text => Ok(format!("Removed document '{name}'\n")),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({ "success": true, "name": name });
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_search(db_path: &Path, query: &str, top_k: usize, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let passages = search_bm25(&storage, query, top_k)?;
    Ok(format_search_results(query, &passages, format))
}

// ==================== Domain Tools ====================

fn cmd_tools(cmd: &ToolCommands, format: OutputFormat) -> Result<String> {
    match cmd {
        ToolCommands::Count {
            text,
            file,
            keyword,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text.clone(),
                (None, Some(file)) => std::fs::read_to_string(file).map_err(|e| {
                    CommandError::ExecutionFailed(format!(
                        "Failed to read {}: {e}",
                        file.display()
                    ))
                })?,
                (None, None) => {
                    return Err(
                        CommandError::InvalidArgument("--text or --file is required".into()).into(),
                    );
                }
            };
            Ok(format_keyword_count(&count_keyword(&text, keyword), format))
        }
        ToolCommands::Role { role } => Ok(format_role(&role_lookup(role), format)),
        ToolCommands::Calc { operation, a, b, n } => {
            let calculation = parse_calculation(operation, *a, *b, n.as_deref())?;
            Ok(format_evaluation(&calculation.evaluate(), format))
        }
    }
}

/// Builds a [`Calculation`] from loose CLI operands.
///
/// Operands go through the same JSON shape the model uses, so the CLI and the
/// tool-calling path reject the same inputs.
fn parse_calculation(
    operation: &str,
    a: Option<f64>,
    b: Option<f64>,
    n: Option<&str>,
) -> Result<Calculation> {
    let mut fields = Map::new();
    fields.insert(
        "operation".to_string(),
        Value::from(operation.to_lowercase()),
    );
    if let Some(a) = a {
        fields.insert("a".to_string(), Value::from(a));
    }
    if let Some(b) = b {
        fields.insert("b".to_string(), Value::from(b));
    }
    if let Some(n) = n {
        let value = serde_json::from_str::<Value>(n).unwrap_or_else(|_| Value::from(n));
        fields.insert("n".to_string(), value);
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| CommandError::InvalidArgument(format!("{operation}: {e}")).into())
}

// ==================== Agent Pipeline ====================

#[cfg(feature = "agent")]
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Builds an orchestrator over the knowledge base.
///
/// Command-line overrides win over environment configuration.
#[cfg(feature = "agent")]
fn build_orchestrator(db_path: &Path, args: &AgentArgs) -> Result<Orchestrator> {
    use std::sync::Arc;

    use crate::agent::{AgentConfig, create_provider};
    use crate::search::SqliteRetriever;

    let storage = open_storage(db_path)?;

    let mut builder = AgentConfig::builder();
    if let Some(model) = &args.model {
        builder = builder.model(model.clone());
    }
    if let Some(top_k) = args.top_k {
        builder = builder.search_top_k(top_k);
    }
    if let Some(dir) = &args.prompt_dir {
        builder = builder.prompt_dir(dir.clone());
    }
    let config = builder.from_env().build()?;
    let provider = create_provider(&config)?;

    Ok(Orchestrator::new(
        provider,
        Arc::new(SqliteRetriever::new(storage)),
        config,
    ))
}

#[cfg(feature = "agent")]
fn query_request(query: &str, args: &AgentArgs) -> crate::agent::QueryRequest {
    crate::agent::QueryRequest {
        query: query.to_string(),
        session_id: args.session_id.clone(),
    }
}

#[cfg(feature = "agent")]
fn cmd_ask(db_path: &Path, query: &str, args: &AgentArgs, format: OutputFormat) -> Result<String> {
    use crate::cli::output::format_result;

    let orchestrator = build_orchestrator(db_path, args)?;
    let request = query_request(query, args);
    let result = runtime()?.block_on(orchestrator.query(&request))?;
    Ok(format_result(&result, format))
}

#[cfg(feature = "agent")]
fn cmd_stream(
    db_path: &Path,
    query: &str,
    args: &AgentArgs,
    format: OutputFormat,
) -> Result<String> {
    let orchestrator = build_orchestrator(db_path, args)?;
    let request = query_request(query, args);

    runtime()?.block_on(async {
        let mut events = orchestrator.stream(request);
        let mut out = std::io::stdout().lock();
        write_events(&mut events, format, &mut out).await
    })?;

    Ok(String::new())
}

/// Writes pipeline events to `out` as they arrive.
///
/// A terminal `error` event becomes the command's error. In JSON formats it
/// is written first so line consumers see it too.
#[cfg(feature = "agent")]
async fn write_events<S, W>(events: &mut S, format: OutputFormat, out: &mut W) -> Result<()>
where
    S: futures_util::Stream<Item = crate::core::StreamEvent> + Unpin,
    W: std::io::Write,
{
    use futures_util::StreamExt;

    use crate::cli::output::format_event;
    use crate::core::StreamEvent;

    while let Some(event) = events.next().await {
        if let StreamEvent::Error { message } = &event {
            if format != OutputFormat::Text {
                out.write_all(format_event(&event, format).as_bytes())?;
                out.flush()?;
            }
            return Err(CommandError::ExecutionFailed(message.clone()).into());
        }
        out.write_all(format_event(&event, format).as_bytes())?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(feature = "agent")]
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    use crate::agent::PromptSet;

    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str(&format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    ));
                }
                output.push_str("\nEdit these files to customize agent system prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

// ==================== Transports ====================

/// Serves the HTTP API until interrupted.
#[cfg(feature = "server")]
fn cmd_serve(db_path: &Path, addr: &str, args: &AgentArgs) -> Result<String> {
    let orchestrator = build_orchestrator(db_path, args)?;

    runtime()?
        .block_on(crate::server::serve(addr, orchestrator))
        .map_err(|e| CommandError::ExecutionFailed(format!("HTTP server error: {e}")))?;

    Ok(String::new())
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped (SSE).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands, db_path: &Path) -> Result<String> {
    use crate::mcp::{PolicyMcpServer, serve_sse, serve_stdio};

    let server = PolicyMcpServer::new(db_path.to_path_buf())?;

    runtime()?
        .block_on(async {
            match cmd {
                McpCommands::Stdio => serve_stdio(server).await,
                McpCommands::Sse { host, port } => serve_sse(server, host, *port).await,
            }
        })
        .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MANUAL: &str = "# Expense Policy\n\n\
        ## Approval\n\nManager approval is required for expenses up to 5000.\n\
        Director approval is required above that.\n\n\
        ## Travel\n\nTravel must be booked through the travel desk.\n";

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db_path = temp_dir.path().join("kb").join("test.db");
        (temp_dir, db_path)
    }

    fn setup_with_manual() -> (TempDir, PathBuf, PathBuf) {
        let (temp_dir, db_path) = setup();
        cmd_init(&db_path, false, OutputFormat::Text).unwrap_or_else(|_| unreachable!());
        let file = temp_dir.path().join("expenses.md");
        std::fs::write(&file, MANUAL).unwrap_or_else(|_| unreachable!());
        (temp_dir, db_path, file)
    }

    #[test]
    fn test_cmd_init() {
        let (_temp_dir, db_path) = setup();
        let result = cmd_init(&db_path, false, OutputFormat::Text);
        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn test_cmd_init_already_exists() {
        let (_temp_dir, db_path) = setup();
        assert!(cmd_init(&db_path, false, OutputFormat::Text).is_ok());

        let result = cmd_init(&db_path, false, OutputFormat::Text);
        assert!(result.is_err());

        let result = cmd_init(&db_path, true, OutputFormat::Json);
        assert!(result.is_ok_and(|out| out.contains("\"force\": true")));
    }

    #[test]
    fn test_cmd_status_requires_init() {
        let (temp_dir, _) = setup();
        let result = cmd_status(&temp_dir.path().join("missing.db"), OutputFormat::Text);
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::NotInitialized))
        ));
    }

    #[test]
    fn test_ingest_list_search_remove() {
        let (_temp_dir, db_path, file) = setup_with_manual();

        let out = cmd_ingest(&db_path, &file, None, 1500, OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.starts_with("Ingested 'expenses'"));

        let list = cmd_list(&db_path, OutputFormat::Text).unwrap_or_default();
        assert!(list.contains("expenses"));

        let hits = cmd_search(&db_path, "director approval", 3, OutputFormat::Json)
            .unwrap_or_default();
        let json: Value = serde_json::from_str(&hits).unwrap_or_default();
        assert_eq!(json["results"][0]["source"], "expenses");
        assert_eq!(json["results"][0]["metadata"]["heading"], "Approval");

        let status = cmd_status(&db_path, OutputFormat::Text).unwrap_or_default();
        assert!(status.contains("Documents:  1"));

        assert!(cmd_remove(&db_path, "expenses", OutputFormat::Text).is_ok());
        assert!(cmd_remove(&db_path, "expenses", OutputFormat::Text).is_err());
        let list = cmd_list(&db_path, OutputFormat::Text).unwrap_or_default();
        assert!(list.contains("No documents"));
    }

    #[test]
    fn test_ingest_duplicate_name() {
        let (_temp_dir, db_path, file) = setup_with_manual();
        assert!(cmd_ingest(&db_path, &file, Some("Manual"), 1500, OutputFormat::Text).is_ok());
        let result = cmd_ingest(&db_path, &file, Some("Manual"), 1500, OutputFormat::Text);
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::DuplicateDocument { name })) if name == "Manual"
        ));
    }

    #[test]
    fn test_ingest_rejects_small_chunk_size() {
        let (_temp_dir, db_path, file) = setup_with_manual();
        let result = cmd_ingest(&db_path, &file, None, 10, OutputFormat::Text);
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_ingest_empty_file() {
        let (temp_dir, db_path, _) = setup_with_manual();
        let empty = temp_dir.path().join("empty.md");
        std::fs::write(&empty, "\n   \n\n").unwrap_or_else(|_| unreachable!());
        assert!(cmd_ingest(&db_path, &empty, None, 1500, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_search_no_words() {
        let (_temp_dir, db_path, _) = setup_with_manual();
        let out = cmd_search(&db_path, "?!", 3, OutputFormat::Text).unwrap_or_default();
        assert!(out.contains("No passages found"));
    }

    #[test]
    fn test_tools_role() {
        let cmd = ToolCommands::Role {
            role: "Director".to_string(),
        };
        let out = cmd_tools(&cmd, OutputFormat::Json).unwrap_or_default();
        let json: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(json["found"], true);
        assert_eq!(json["rules"]["approval_limit"], 25_000);
    }

    #[test]
    fn test_tools_count_text() {
        let cmd = ToolCommands::Count {
            text: Some("Manager approval\nnothing\nDirector Approval".to_string()),
            file: None,
            keyword: "approval".to_string(),
        };
        let out = cmd_tools(&cmd, OutputFormat::Json).unwrap_or_default();
        let json: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(json["count"], 2);
    }

    #[test]
    fn test_tools_count_file() {
        let (_temp_dir, _, file) = setup_with_manual();
        let cmd = ToolCommands::Count {
            text: None,
            file: Some(file),
            keyword: "approval".to_string(),
        };
        let out = cmd_tools(&cmd, OutputFormat::Text).unwrap_or_default();
        assert!(out.starts_with("'approval' appears on 3 line(s)"));
    }

    #[test]
    fn test_parse_calculation() {
        let calc = parse_calculation("Add", Some(2.0), Some(3.5), None);
        assert!(matches!(calc, Ok(Calculation::Add { a, b }) if (a + b - 5.5).abs() < f64::EPSILON));

        let calc = parse_calculation("factorial", None, None, Some("5"));
        assert!(matches!(calc, Ok(Calculation::Factorial { n: 5 })));

        let calc = parse_calculation("square_root", None, None, Some("2.25"));
        assert!(matches!(calc, Ok(Calculation::SquareRoot { .. })));
    }

    #[test]
    fn test_parse_calculation_errors() {
        assert!(parse_calculation("modulo", Some(1.0), Some(2.0), None).is_err());
        assert!(parse_calculation("add", Some(1.0), None, None).is_err());
        assert!(parse_calculation("factorial", None, None, Some("five")).is_err());
    }

    #[test]
    fn test_tools_calc_reports_domain_error() {
        let cmd = ToolCommands::Calc {
            operation: "divide".to_string(),
            a: Some(10.0),
            b: Some(0.0),
            n: None,
        };
        let out = cmd_tools(&cmd, OutputFormat::Json).unwrap_or_default();
        let json: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(json["operation"], "division");
        assert_eq!(json["error"], "Division by zero is undefined");
    }

    #[cfg(feature = "agent")]
    mod agent {
        use super::*;
        use crate::core::{StepStatus, StreamEvent};
        use futures_util::stream;

        #[test]
        fn test_ask_requires_initialized_store() {
            let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
            let db_path = temp_dir.path().join("missing.db");
            let args = AgentArgs::default();
            let result = cmd_ask(&db_path, "who approves?", &args, OutputFormat::Text);
            assert!(matches!(
                result,
                Err(Error::Storage(StorageError::NotInitialized))
            ));
        }

        #[test]
        fn test_init_prompts_writes_once() {
            let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
            let dir = temp_dir.path().join("prompts");

            let out = cmd_init_prompts(Some(&dir), OutputFormat::Text).unwrap_or_default();
            assert!(out.starts_with("Wrote 4 prompt template(s)"));
            assert!(out.contains("coordinator.md"));

            let out = cmd_init_prompts(Some(&dir), OutputFormat::Text).unwrap_or_default();
            assert!(out.starts_with("All prompt templates already exist"));
        }

        #[tokio::test]
        async fn test_write_events_ndjson() {
            let mut events = stream::iter(vec![
                StreamEvent::thinking("Coordinator Agent analyzing query..."),
                StreamEvent::Content {
                    chunk: "## Answer".to_string(),
                },
                StreamEvent::Done {
                    full_response: "## Answer".to_string(),
                },
            ]);
            let mut out = Vec::new();
            let result = write_events(&mut events, OutputFormat::Ndjson, &mut out).await;
            assert!(result.is_ok());

            let text = String::from_utf8(out).unwrap_or_default();
            let kinds: Vec<String> = text
                .lines()
                .filter_map(|l| serde_json::from_str::<Value>(l).ok())
                .map(|v| v["type"].as_str().unwrap_or_default().to_string())
                .collect();
            assert_eq!(kinds, ["thinking", "content", "done"]);
        }

        #[tokio::test]
        async fn test_write_events_error_is_terminal() {
            let mut events = stream::iter(vec![
                StreamEvent::AgentStep {
                    agent: "Coordinator Agent".to_string(),
                    step: "Received query".to_string(),
                    status: StepStatus::InProgress,
                    response: None,
                },
                StreamEvent::Error {
                    message: "API request failed: boom".to_string(),
                },
            ]);
            let mut out = Vec::new();
            let result = write_events(&mut events, OutputFormat::Text, &mut out).await;
            assert!(matches!(
                result,
                Err(Error::Command(CommandError::ExecutionFailed(m))) if m.contains("boom")
            ));
            let text = String::from_utf8(out).unwrap_or_default();
            assert_eq!(text, "[->] Coordinator Agent: Received query\n");
        }
    }
}
