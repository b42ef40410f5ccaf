use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use super::types::{ToolEntry, ToolHandler, ToolSpec};
use crate::result::ToolResult;

/// Named tools in registration order.
pub struct ToolRegistry {
    tools: RwLock<Vec<ToolEntry>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, name: &str, handler: ToolHandler, mut spec: ToolSpec) -> Result<(), String> {
        if name.is_empty() {
            return Err("invalid tool".to_string());
        }
        if spec.name.is_empty() {
            spec.name = name.to_string();
        }
        if spec.name != name {
            return Err("schema name mismatch".to_string());
        }

        let mut tools = self.tools.write().map_err(|_| "lock error".to_string())?;
        if tools.iter().any(|entry| entry.name == name) {
            return Err("tool already registered".to_string());
        }
        tools.push(ToolEntry {
            name: name.to_string(),
            handler,
            spec,
        });
        Ok(())
    }

    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        let handler = {
            let tools = match self.tools.read() {
                Ok(lock) => lock,
                Err(_) => return ToolResult::failure("lock error"),
            };
            match tools.iter().find(|entry| entry.name == name) {
                Some(entry) => entry.handler.clone(),
                None => return ToolResult::failure("tool not found"),
            }
        };
        debug!(tool = name, "executing tool");
        handler(args).await
    }

    pub fn list_tools(&self) -> Vec<ToolSpec> {
        let tools = match self.tools.read() {
            Ok(lock) => lock,
            Err(_) => return vec![],
        };
        tools.iter().map(|entry| entry.spec.clone()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        let tools = match self.tools.read() {
            Ok(lock) => lock,
            Err(_) => return false,
        };
        tools.iter().any(|entry| entry.name == name)
    }

    pub fn count(&self) -> usize {
        let tools = match self.tools.read() {
            Ok(lock) => lock,
            Err(_) => return 0,
        };
        tools.len()
    }
}
