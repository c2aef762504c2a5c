//! MCP tool parameter types.
//!
//! `schemars` derives the JSON Schema each tool advertises to clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `query` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// The policy question to answer.
    pub query: String,

    /// Optional session identifier for log correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Parameters for the `step_counter` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepCounterParams {
    /// Multiline text to scan.
    pub text: String,

    /// Keyword to count, case-insensitive. Defaults to `"approval"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Parameters for the `role_lookup` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RoleLookupParams {
    /// Role name: `employee`, `manager`, `director`, `hr` or `ceo`.
    pub role: String,
}
