//! Tool schema construction.
//!
//! Turns one registered callable into the JSON-shaped record the model
//! reads to decide when and how to invoke the tool. The schema's `name` is
//! always the callable's own identifier; nothing here renames.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::ToolError;
use super::signature::{inspect, RegisteredFunction};

/// The `parameters` object of a tool schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaParameters {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter name → `{"type": <tag>}`.
    pub properties: Map<String, Value>,
    /// Names of parameters without defaults, in declaration order.
    pub required: Vec<String>,
}

/// A callable's calling contract as handed to the model.
///
/// The sentinel schema carries no `parameters`; every real tool does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<SchemaParameters>,
}

/// Builds the schema for one registered callable.
///
/// Fails only when the signature itself is unavailable; unknown parameter
/// types were already absorbed by the type-mapping fallback.
pub fn build(func: &RegisteredFunction) -> Result<ToolSchema, ToolError> {
    let desc = inspect(func)?;

    let mut properties = Map::new();
    for param in &desc.parameters {
        properties.insert(
            param.name.clone(),
            json!({ "type": param.type_tag.as_str() }),
        );
    }

    Ok(ToolSchema {
        name: desc.name.clone(),
        description: desc.description.clone(),
        parameters: Some(SchemaParameters {
            kind: "object".to_string(),
            properties,
            required: desc.required_names(),
        }),
    })
}
