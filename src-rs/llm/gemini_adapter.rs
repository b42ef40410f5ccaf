use std::collections::HashMap;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use super::rotation::Rotator;
use super::types::{CompletionRequest, ContentBlock, LLMResponse, Message, ProviderAdapter, ProviderError, Role};
use crate::config::DEFAULT_GEMINI_MODEL;
use crate::tools::ToolSpec;

pub struct GeminiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

pub struct GeminiAdapter {
    cfg: GeminiConfig,
    rotator: Rotator,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(mut cfg: GeminiConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = "https://generativelanguage.googleapis.com".to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = DEFAULT_GEMINI_MODEL.to_string();
        }
        if cfg.temperature == 0.0 {
            cfg.temperature = 0.3;
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|err| ProviderError::new("client_error", &err.to_string(), false))?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.unwrap_or(self.cfg.temperature);
        let payload = build_payload(
            &request.messages,
            request.system.as_deref(),
            request.tools.as_ref(),
            temperature,
            request.max_tokens,
        );

        let tries = self.rotator.len();
        if tries == 0 {
            return Err(ProviderError::new("auth_error", "no Gemini API keys", false));
        }
        let mut last_err = None;
        for _ in 0..tries {
            let key = match self.rotator.next() {
                Some(key) => key,
                None => break,
            };
            match send_request(&self.client, &self.cfg.base_url, &model, &key, &payload) {
                Ok(resp) => return Ok(resp),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
    }
}

fn build_payload(
    messages: &[Message],
    system: Option<&str>,
    tools: Option<&Vec<ToolSpec>>,
    temperature: f64,
    max_tokens: Option<u32>,
) -> Value {
    // functionResponse parts are keyed by function name, not call id
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut contents = Vec::new();

    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        let mut parts = Vec::new();
        for block in &msg.content {
            match block {
                ContentBlock::Text { text } => parts.push(json!({"text": text})),
                ContentBlock::ToolUse { id, name, input } => {
                    call_names.insert(id.as_str(), name.as_str());
                    parts.push(json!({"functionCall": {"name": name, "args": input}}));
                }
                ContentBlock::ToolResult {
                    tool_use_id, content, ..
                } => {
                    let name = call_names.get(tool_use_id.as_str()).copied().unwrap_or("");
                    let response = if content.is_object() {
                        content.clone()
                    } else {
                        json!({"result": content})
                    };
                    parts.push(json!({"functionResponse": {"name": name, "response": response}}));
                }
            }
        }
        contents.push(json!({
            "role": role,
            "parts": parts
        }));
    }

    let mut generation = json!({
        "temperature": temperature
    });
    if let Some(limit) = max_tokens {
        generation["maxOutputTokens"] = json!(limit);
    }

    let mut payload = json!({
        "contents": contents,
        "generationConfig": generation
    });

    if let Some(system) = system {
        payload["systemInstruction"] = json!({
            "parts": [{"text": system}]
        });
    }

    if let Some(tools) = tools {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                })
            })
            .collect();
        payload["tools"] = json!([
            {
                "functionDeclarations": declarations
            }
        ]);
    }

    payload
}

fn send_request(client: &Client, base_url: &str, model: &str, api_key: &str, payload: &Value) -> Result<LLMResponse, ProviderError> {
    let endpoint = format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );
    let resp = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if status.is_client_error() || status.is_server_error() {
        let lowered = body.to_lowercase();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::new("auth_error", &body, true));
        }
        if status.as_u16() == 429 || lowered.contains("quota") || lowered.contains("resource_exhausted") {
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
    let mut content = Vec::new();

    let first = match raw
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
    {
        Some(value) => value,
        None => return (content, None),
    };
    let stop_reason = first.get("finishReason").and_then(|v| v.as_str()).map(|s| s.to_string());
    let parts = match first.get("content").and_then(|c| c.get("parts")).and_then(|v| v.as_array()) {
        Some(parts) => parts,
        None => return (content, stop_reason),
    };

    for part in parts {
        if let Some(chunk) = part.get("text").and_then(|v| v.as_str()) {
            content.push(ContentBlock::Text { text: chunk.to_string() });
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = fc.get("args").cloned().unwrap_or(json!({}));
            content.push(ContentBlock::ToolUse {
                id: format!("call_{}", Uuid::new_v4().simple()),
                name: name.to_string(),
                input: args,
            });
        }
    }

    (content, stop_reason)
}
