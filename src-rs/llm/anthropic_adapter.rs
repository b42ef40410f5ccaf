use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::rotation::Rotator;
use super::types::{CompletionRequest, ContentBlock, LLMResponse, Message, ProviderAdapter, ProviderError, Role};
use crate::config::DEFAULT_ANTHROPIC_MODEL;
use crate::tools::ToolSpec;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub struct AnthropicAdapter {
    cfg: AnthropicConfig,
    rotator: Rotator,
    client: Client,
}

impl AnthropicAdapter {
    pub fn new(mut cfg: AnthropicConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = "https://api.anthropic.com".to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = DEFAULT_ANTHROPIC_MODEL.to_string();
        }
        if cfg.max_tokens == 0 {
            cfg.max_tokens = 2048;
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|err| ProviderError::new("client_error", &err.to_string(), false))?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.unwrap_or(self.cfg.temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.cfg.max_tokens);
        let payload = build_payload(
            &model,
            &request.messages,
            request.system.as_deref(),
            request.tools.as_ref(),
            temperature,
            max_tokens,
        );

        let tries = self.rotator.len();
        if tries == 0 {
            return Err(ProviderError::new("auth_error", "no Anthropic API keys", false));
        }
        let mut last_err = None;
        for _ in 0..tries {
            let key = match self.rotator.next() {
                Some(key) => key,
                None => break,
            };
            match send_request(&self.client, &self.cfg.base_url, &key, &payload) {
                Ok(resp) => return Ok(resp),
                Err(err) if err.retryable => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
    }
}

fn build_payload(
    model: &str,
    messages: &[Message],
    system: Option<&str>,
    tools: Option<&Vec<ToolSpec>>,
    temperature: f64,
    max_tokens: u32,
) -> Value {
    let converted: Vec<Value> = messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            let blocks: Vec<Value> = msg.content.iter().map(block_to_wire).collect();
            json!({"role": role, "content": blocks})
        })
        .collect();

    let mut payload = json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "messages": converted,
    });

    if let Some(system) = system {
        if !system.trim().is_empty() {
            payload["system"] = Value::String(system.to_string());
        }
    }

    if let Some(tools) = tools {
        let defs: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect();
        payload["tools"] = Value::Array(defs);
    }

    payload
}

fn block_to_wire(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        // tool_result content must be a string or a block list
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let text = match content {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": text,
                "is_error": is_error,
            })
        }
    }
}

fn send_request(client: &Client, base_url: &str, api_key: &str, payload: &Value) -> Result<LLMResponse, ProviderError> {
    let endpoint = format!("{}/v1/messages", base_url.trim_end_matches('/'));
    let resp = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(payload)
        .send()
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if status.is_client_error() || status.is_server_error() {
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::new("auth_error", &body, true));
        }
        if status.as_u16() == 429 || status.as_u16() == 529 {
            return Err(ProviderError::new("rate_limit", &body, true));
        }
        if status.is_server_error() {
            return Err(ProviderError::new("server_error", &body, true));
        }
        return Err(ProviderError::new("api_error", &body, false));
    }

    let raw: Value = serde_json::from_str(&body).map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
    let (content, stop_reason) = parse_response(&raw);
    Ok(LLMResponse {
        content,
        stop_reason,
        raw: Some(raw),
    })
}

fn parse_response(raw: &Value) -> (Vec<ContentBlock>, Option<String>) {
    let stop_reason = raw.get("stop_reason").and_then(|v| v.as_str()).map(|s| s.to_string());
    let mut content = Vec::new();
    let blocks = match raw.get("content").and_then(|v| v.as_array()) {
        Some(blocks) => blocks,
        None => return (content, stop_reason),
    };

    for block in blocks {
        match block.get("type").and_then(|v| v.as_str()) {
            Some("text") => {
                let text = block.get("text").and_then(|v| v.as_str()).unwrap_or("");
                content.push(ContentBlock::Text { text: text.to_string() });
            }
            Some("tool_use") => {
                let id = block.get("id").and_then(|v| v.as_str()).unwrap_or("");
                let name = block.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let input = block.get("input").cloned().unwrap_or(json!({}));
                content.push(ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                });
            }
            _ => {}
        }
    }

    (content, stop_reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_system_tools_and_tool_results() {
        let tools = vec![ToolSpec {
            name: "get_hk_current_weather".to_string(),
            description: "Current weather".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let messages = vec![
            Message::user_text("weather now?"),
            Message::assistant(vec![ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "get_hk_current_weather".to_string(),
                input: json!({}),
            }]),
            Message::tool_result("toolu_1", json!({"result": "Sunny"}), false),
        ];
        let payload = build_payload("m", &messages, Some("be brief"), Some(&tools), 0.7, 512);

        assert_eq!(payload["system"], "be brief");
        assert_eq!(payload["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(payload["messages"][1]["content"][0]["type"], "tool_use");
        let result = &payload["messages"][2]["content"][0];
        assert_eq!(result["type"], "tool_result");
        assert_eq!(result["tool_use_id"], "toolu_1");
        assert_eq!(result["content"], "{\"result\":\"Sunny\"}");
    }

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let raw = json!({
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_9", "name": "get_hk_forecast", "input": {"days": 9}}
            ],
            "stop_reason": "tool_use"
        });
        let (content, stop) = parse_response(&raw);
        assert_eq!(stop.as_deref(), Some("tool_use"));
        assert_eq!(content.len(), 2);
        assert_eq!(
            content[1],
            ContentBlock::ToolUse {
                id: "toolu_9".to_string(),
                name: "get_hk_forecast".to_string(),
                input: json!({"days": 9}),
            }
        );
    }
}
