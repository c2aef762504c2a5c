//! Function-calling types and the analysis agent's tool schemas.
//!
//! These types are independent of any provider SDK. The executor dispatches
//! calls on [`names`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// One of [`names`].
    pub name: String,
    /// What the model is told the tool does.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// A call the model asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back in the result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON string, unparsed.
    pub arguments: String,
}

/// Outcome of one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The [`ToolCall::id`] answered.
    pub tool_call_id: String,
    /// JSON on success, a message on failure.
    pub content: String,
    /// Set when `content` is an error message.
    pub is_error: bool,
}

/// Tool names, as dispatched by the executor.
pub mod names {
    /// Keyword line counter.
    pub const STEP_COUNTER: &str = "step_counter";
    /// Role permission lookup.
    pub const ROLE_LOOKUP: &str = "role_lookup";
    /// Arithmetic.
    pub const CALCULATOR: &str = "calculator";
    /// Knowledge base search.
    pub const SEARCH_KNOWLEDGE_BASE: &str = "search_knowledge_base";
}

/// The tools offered to an agent.
///
/// Only the analysis agent carries tools; retrieval and coordination work
/// from the context they are given.
#[derive(Debug, Clone)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// `step_counter`, `role_lookup`, `calculator` and `search_knowledge_base`.
    #[must_use]
    pub fn analysis_tools() -> Self {
        Self {
            definitions: vec![
                def_step_counter(),
                def_role_lookup(),
                def_calculator(),
                def_search_knowledge_base(),
            ],
        }
    }

    /// The definitions, in the order they are offered.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }
}

/// A closed JSON Schema object with the given properties.
fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn def_step_counter() -> ToolDefinition {
    ToolDefinition {
        name: names::STEP_COUNTER.to_string(),
        description: "Count the lines of a text that mention a keyword (case-insensitive). \
                      Returns the count and up to five matching lines."
            .to_string(),
        parameters: object_schema(
            json!({
                "text": {
                    "type": "string",
                    "description": "Multiline text to scan, e.g. a policy section."
                },
                "keyword": {
                    "type": "string",
                    "description": "Keyword to count. Defaults to 'approval'.",
                    "default": "approval"
                }
            }),
            &["text"],
        ),
    }
}

fn def_role_lookup() -> ToolDefinition {
    ToolDefinition {
        name: names::ROLE_LOOKUP.to_string(),
        description: "Look up what a role may request and approve, its approval limit, \
                      and whose approval it needs. Unknown roles list the known ones."
            .to_string(),
        parameters: object_schema(
            json!({
                "role": {
                    "type": "string",
                    "description": "Role name, e.g. 'manager', 'hr', 'employee'."
                }
            }),
            &["role"],
        ),
    }
}

fn def_calculator() -> ToolDefinition {
    ToolDefinition {
        name: names::CALCULATOR.to_string(),
        description: "Perform arithmetic on amounts and limits. Binary operations take \
                      'a' and 'b'; factorial, is_prime and square_root take 'n'."
            .to_string(),
        parameters: object_schema(
            json!({
                "operation": {
                    "type": "string",
                    "enum": [
                        "add", "subtract", "multiply", "divide", "exponentiate",
                        "factorial", "is_prime", "square_root"
                    ]
                },
                "a": { "type": "number", "description": "Left operand." },
                "b": { "type": "number", "description": "Right operand." },
                "n": { "type": "number", "description": "Single operand." }
            }),
            &["operation"],
        ),
    }
}

fn def_search_knowledge_base() -> ToolDefinition {
    ToolDefinition {
        name: names::SEARCH_KNOWLEDGE_BASE.to_string(),
        description: "Search the policy knowledge base for passages relevant to a query."
            .to_string(),
        parameters: object_schema(
            json!({
                "query": {
                    "type": "string",
                    "description": "Search query text."
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum passages to return. Defaults to the configured value."
                }
            }),
            &["query"],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_tool_order() {
        let tools = ToolSet::analysis_tools();
        let offered: Vec<&str> = tools
            .definitions()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(
            offered,
            [
                names::STEP_COUNTER,
                names::ROLE_LOOKUP,
                names::CALCULATOR,
                names::SEARCH_KNOWLEDGE_BASE
            ]
        );
    }

    #[test]
    fn test_schemas_are_closed_objects() {
        for def in ToolSet::analysis_tools().definitions() {
            assert!(!def.description.is_empty(), "{} has no description", def.name);
            assert_eq!(def.parameters["type"], "object");
            assert_eq!(def.parameters["additionalProperties"], false);
            assert!(def.parameters["required"].is_array());
        }
    }

    #[test]
    fn test_role_lookup_requires_role() {
        assert_eq!(def_role_lookup().parameters["required"], json!(["role"]));
    }

    #[test]
    fn test_calculator_schema_lists_operations() {
        let ops = &def_calculator().parameters["properties"]["operation"]["enum"];
        assert_eq!(ops.as_array().map_or(0, Vec::len), 8);
    }
}
