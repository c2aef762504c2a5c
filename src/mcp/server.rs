//! MCP server implementation.
//!
//! Exposes the query pipeline and the deterministic domain tools as MCP
//! tools, and the ingested policy documents as read-only resources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
    ReadResourceRequestParams, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use tracing::info;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::{Orchestrator, QueryRequest};
use crate::search::SqliteRetriever;
use crate::storage::SqliteStorage;
use crate::tools::{DEFAULT_KEYWORD, count_keyword, role_lookup};

use super::params::{QueryParams, RoleLookupParams, StepCounterParams};

/// URI scheme for document resources.
const RESOURCE_SCHEME: &str = "policy://";

/// Opens storage and verifies it is initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStorage, McpError> {
    let storage = SqliteStorage::open(db_path)
        .map_err(|e| McpError::internal_error(format!("Failed to open storage: {e}"), None))?;

    if !storage.is_initialized().unwrap_or(false) {
        return Err(McpError::internal_error(
            "Knowledge base not initialized. Run `policy-assistant init` first.",
            None,
        ));
    }

    Ok(storage)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Policy assistant MCP server.
#[derive(Clone)]
pub struct PolicyMcpServer {
    tool_router: ToolRouter<Self>,
    db_path: PathBuf,
    orchestrator: Orchestrator,
}

#[tool_router]
impl PolicyMcpServer {
    /// Answers a policy question through the full agent pipeline.
    #[tool(
        name = "query",
        description = "Answer a question about organization policies. Searches the policy knowledge base, analyzes the retrieved sections with domain tools, and returns JSON with a markdown answer, sources, tools used, and reasoning steps."
    )]
    async fn query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = QueryRequest {
            query: params.query,
            session_id: params.session_id,
        };
        let result = self
            .orchestrator
            .query(&request)
            .await
            .map_err(|e| McpError::internal_error(format!("Query pipeline failed: {e}"), None))?;
        json_result(&result)
    }

    /// Counts lines mentioning a keyword.
    #[allow(clippy::unused_async)]
    #[tool(
        name = "step_counter",
        description = "Count the lines of a text that contain a keyword (case-insensitive, default \"approval\"). Returns the count and up to five matching lines."
    )]
    async fn step_counter(
        &self,
        Parameters(params): Parameters<StepCounterParams>,
    ) -> Result<CallToolResult, McpError> {
        let keyword = params.keyword.as_deref().unwrap_or(DEFAULT_KEYWORD);
        json_result(&count_keyword(&params.text, keyword))
    }

    /// Looks up a role's permissions.
    #[allow(clippy::unused_async)]
    #[tool(
        name = "role_lookup",
        description = "Look up the request and approval permissions, approval limit, and escalation chain of an organizational role. Unknown roles return the list of known roles."
    )]
    async fn role_lookup(
        &self,
        Parameters(params): Parameters<RoleLookupParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&role_lookup(&params.role))
    }
}

#[tool_handler]
impl ServerHandler for PolicyMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "policy-assistant".to_string(),
                title: Some("Policy Assistant MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Policy assistant: answers questions about the organization's policy manual. \
                 Use `query` for full answers, `step_counter` and `role_lookup` for direct \
                 lookups. Ingested documents are listed as resources."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let db_path = self.db_path.clone();

        let resources = tokio::task::spawn_blocking(move || {
            let Ok(storage) = open_storage(&db_path) else {
                return Ok(Vec::new());
            };
            let documents = storage.list_documents().map_err(|e| {
                McpError::internal_error(format!("Failed to list documents: {e}"), None)
            })?;

            Ok::<_, McpError>(
                documents
                    .into_iter()
                    .map(|doc| {
                        let mut raw = RawResource::new(
                            format!("{RESOURCE_SCHEME}{}", doc.name),
                            format!("Policy: {}", doc.name),
                        );
                        raw.description = Some(format!(
                            "{} bytes, {} passages",
                            doc.size, doc.passage_count
                        ));
                        raw.mime_type = Some("application/json".to_string());
                        raw.no_annotation()
                    })
                    .collect(),
            )
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))??;

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParams { uri, .. }: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let name = uri
            .strip_prefix(RESOURCE_SCHEME)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                McpError::invalid_params(
                    format!("Invalid URI, expected {RESOURCE_SCHEME}{{document}}: {uri}"),
                    None,
                )
            })?
            .to_string();

        let db_path = self.db_path.clone();
        let content = tokio::task::spawn_blocking(move || {
            let storage = open_storage(&db_path)?;
            let doc = storage
                .get_document(&name)
                .map_err(|e| McpError::internal_error(format!("Storage error: {e}"), None))?
                .ok_or_else(|| {
                    McpError::resource_not_found(format!("Document not found: {name}"), None)
                })?;
            serde_json::to_string_pretty(&doc)
                .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))??;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(content, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let template = RawResourceTemplate {
            uri_template: format!("{RESOURCE_SCHEME}{{document_name}}"),
            name: "Policy document".to_string(),
            title: None,
            description: Some(
                "Returns JSON metadata for an ingested policy document: file name, size, \
                 passage count, and ingestion time."
                    .to_string(),
            ),
            mime_type: Some("application/json".to_string()),
            icons: None,
        };

        Ok(ListResourceTemplatesResult {
            resource_templates: vec![template.no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }
}

impl PolicyMcpServer {
    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates a server over the knowledge base at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not initialized, the agent
    /// configuration cannot be loaded from the environment, or the provider
    /// cannot be created.
    pub fn new(db_path: PathBuf) -> Result<Self, crate::error::Error> {
        let config = AgentConfig::from_env().map_err(|e| {
            crate::error::CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
        })?;
        let provider = create_provider(&config).map_err(|e| {
            crate::error::CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
        })?;

        let storage = SqliteStorage::open(&db_path)?;
        if !storage.is_initialized()? {
            return Err(crate::error::StorageError::NotInitialized.into());
        }
        let retriever = Arc::new(SqliteRetriever::new(storage));
        info!(db = %db_path.display(), "mcp server ready");

        Ok(Self::with_orchestrator(
            db_path,
            Orchestrator::new(provider, retriever, config),
        ))
    }

    /// Creates a server around an existing orchestrator.
    #[must_use]
    pub fn with_orchestrator(db_path: PathBuf, orchestrator: Orchestrator) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db_path,
            orchestrator,
        }
    }
}

impl std::fmt::Debug for PolicyMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyMcpServer")
            .field("db_path", &self.db_path)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::PromptSet;
    use crate::agent::testing::ScriptedProvider;
    use crate::search::StaticRetriever;

    fn server() -> PolicyMcpServer {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orchestrator = Orchestrator::with_prompts(
            Arc::new(ScriptedProvider::new()),
            Arc::new(StaticRetriever::default()),
            config,
            PromptSet::defaults(),
        );
        PolicyMcpServer::with_orchestrator(PathBuf::from("unused.db"), orchestrator)
    }

    #[test]
    fn test_tools_registered() {
        let mut names: Vec<String> = PolicyMcpServer::tool_router()
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["query", "role_lookup", "step_counter"]);
    }

    #[tokio::test]
    async fn test_domain_tools_succeed() {
        let server = server();
        let counted = server
            .step_counter(Parameters(StepCounterParams {
                text: "Approval one\nnone\napproval two".to_string(),
                keyword: None,
            }))
            .await;
        assert!(counted.is_ok());

        let role = server
            .role_lookup(Parameters(RoleLookupParams {
                role: "intern".to_string(),
            }))
            .await;
        assert!(role.is_ok());
    }

    #[tokio::test]
    async fn test_query_rejects_empty() {
        let result = server()
            .query(Parameters(QueryParams {
                query: "   ".to_string(),
                session_id: None,
            }))
            .await;
        assert!(result.is_err());
    }
}
