use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::result::ToolResult;

/// A tool as listed to callers. `input_schema` is a JSON Schema object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", alias = "input_schema", default)]
    pub input_schema: Value,
}

pub type ToolFuture = BoxFuture<'static, ToolResult>;

pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

pub struct ToolEntry {
    pub name: String,
    pub handler: ToolHandler,
    pub spec: ToolSpec,
}
