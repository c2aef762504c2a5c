//! MCP (Model Context Protocol) server.
//!
//! Lets external agents ask policy questions and call the domain tools.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag.
//!
//! # Architecture
//!
//! ```text
//! MCP client
//!   ├── query(query, session_id)  → Orchestrator::query → StructuredResult JSON
//!   ├── step_counter(text, keyword) → KeywordCount JSON
//!   └── role_lookup(role)          → RoleLookup JSON
//! Resources: policy://{document} → document metadata
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{QueryParams, RoleLookupParams, StepCounterParams};
pub use server::PolicyMcpServer;
pub use transport::{serve_sse, serve_stdio};
