use serde_json::Value;
use tracing::warn;

use crate::result::ToolResult;

const UNRECOGNIZED: &str = "Could not extract response data";

/// Shapes a `tools/call` result may arrive in.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// `{content: [{text: "<json>"}, ..]}` with a non-empty first text.
    TextContent(String),
    /// `{value: <payload>}`.
    DirectValue(Value),
    Unrecognized,
}

impl Envelope {
    pub fn decode(raw: &Value) -> Self {
        let first_text = raw
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty());
        if let Some(text) = first_text {
            return Envelope::TextContent(text.to_string());
        }
        if let Some(value) = raw.get("value") {
            return Envelope::DirectValue(value.clone());
        }
        Envelope::Unrecognized
    }
}

pub fn normalize(raw: &Value) -> ToolResult {
    match Envelope::decode(raw) {
        Envelope::TextContent(text) => match serde_json::from_str::<Value>(&text) {
            Ok(payload) => ToolResult::success(payload),
            Err(err) => {
                warn!(error = %err, "tool returned text that is not json");
                ToolResult::failure(err.to_string())
            }
        },
        Envelope::DirectValue(payload) => ToolResult::success(payload),
        Envelope::Unrecognized => {
            warn!(raw = %raw, "unrecognized tool result envelope");
            ToolResult::failure(UNRECOGNIZED)
        }
    }
}
