use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::conversation::Conversation;
use super::dispatch::{keyword_route, DispatchMode};
use super::normalize::normalize;
use super::render::{render_outcome, tool_result_for_model};
use crate::config::AssistantConfig;
use crate::llm::{CompletionRequest, ContentBlock, LLMResponse, LLMRouter, ProviderError};
use crate::mcp::{ToolTransport, TransportError};
use crate::result::ToolResult;
use crate::tools::ToolSpec;

const NO_TOOLS: &str = "No tools available on the server.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0}")]
    Transport(#[from] TransportError),
}

pub type ProgressFn = Box<dyn Fn(&str) + Send + Sync>;

/// Turns one free-text query into one printable answer.
pub struct WeatherAssistant {
    router: LLMRouter,
    config: AssistantConfig,
    progress: Option<ProgressFn>,
    tools: Option<Vec<ToolSpec>>,
}

impl WeatherAssistant {
    pub fn new(router: LLMRouter, config: AssistantConfig) -> Self {
        Self {
            router,
            config,
            progress: None,
            tools: None,
        }
    }

    /// Receives the "Calling tool: ..." style lines as they happen.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Uses the tools listed at connect time instead of asking the server per query.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Never fails; unrecoverable faults become an "Error processing query" line.
    pub fn process_query(&self, transport: &mut dyn ToolTransport, query: &str) -> String {
        info!(query, mode = %self.config.mode, "processing query");
        let outcome = match self.config.mode {
            DispatchMode::Model => self.process_with_model(transport, query),
            DispatchMode::Keyword => self.process_direct(transport, query),
        };
        match outcome {
            Ok(answer) => answer,
            Err(err) => {
                error!(error = %err, "query failed");
                format!("Error processing query: {}", err)
            }
        }
    }

    fn process_with_model(&self, transport: &mut dyn ToolTransport, query: &str) -> Result<String, AssistantError> {
        let listed;
        let tools: &[ToolSpec] = match &self.tools {
            Some(tools) => tools,
            None => {
                listed = transport.list_tools()?;
                &listed
            }
        };
        if tools.is_empty() {
            return Ok(NO_TOOLS.to_string());
        }

        let conversation = Conversation::start(query);
        let reply = match self.complete(&conversation, tools) {
            Ok(reply) => reply,
            Err(err) => return self.fall_back(transport, query, err),
        };

        let reply_text: Vec<ContentBlock> = reply
            .content
            .iter()
            .filter(|block| matches!(block, ContentBlock::Text { .. }))
            .cloned()
            .collect();

        let mut parts = Vec::new();
        for block in &reply.content {
            match block {
                ContentBlock::Text { text } => parts.push(text.clone()),
                ContentBlock::ToolUse { name, input, .. } => {
                    parts.push(format!("[Calling tool {}]", name));
                    self.notify(&format!("Calling tool: {} with input: {}", name, input));

                    let result = self.call_tool(transport, name, input.clone())?;
                    let (content, is_error) = tool_result_for_model(name, &result);
                    let follow_up = conversation.with_tool_round(&reply_text, block, content, is_error);

                    let answer = match self.complete(&follow_up, tools) {
                        Ok(answer) => answer,
                        Err(err) => return self.fall_back(transport, query, err),
                    };
                    if answer.has_tool_use() {
                        debug!(tool = %name, "ignoring tool use in follow-up reply");
                    }
                    let text = answer.text();
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
                ContentBlock::ToolResult { .. } => debug!("ignoring tool result block in model reply"),
            }
        }
        Ok(parts.join("\n"))
    }

    fn fall_back(&self, transport: &mut dyn ToolTransport, query: &str, err: ProviderError) -> Result<String, AssistantError> {
        error!(error = %err, "model call failed");
        info!("falling back to keyword dispatch");
        self.process_direct(transport, query)
    }

    fn process_direct(&self, transport: &mut dyn ToolTransport, query: &str) -> Result<String, AssistantError> {
        let route = keyword_route(query);
        let tool = route.category.tool_name();
        if route.defaulted {
            self.notify("Query unclear, defaulting to current weather");
        } else {
            self.notify(&format!("Executing tool: {}", tool));
        }

        let args = json!({
            "headless": self.config.headless,
            "take_screenshot": self.config.take_screenshot,
        });
        let result = self.call_tool(transport, tool, args)?;
        Ok(render_outcome(route, &result))
    }

    /// A dropped connection aborts the query; any other call fault becomes a failed result.
    fn call_tool(&self, transport: &mut dyn ToolTransport, name: &str, args: Value) -> Result<ToolResult, AssistantError> {
        match transport.call_tool(name, args) {
            Ok(raw) => Ok(normalize(&raw)),
            Err(TransportError::Closed) => Err(TransportError::Closed.into()),
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                Ok(ToolResult::failure(err.to_string()))
            }
        }
    }

    fn complete(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<LLMResponse, ProviderError> {
        let llm = &self.config.llm;
        self.router.complete(CompletionRequest {
            messages: conversation.messages().to_vec(),
            system: Some(self.config.system_prompt.clone()),
            tools: Some(tools.to_vec()),
            temperature: Some(llm.temperature),
            max_tokens: Some(llm.max_tokens),
            model: Some(llm.resolved_model()),
            provider: Some(llm.provider.clone()),
        })
    }

    fn notify(&self, line: &str) {
        info!("{}", line);
        if let Some(progress) = &self.progress {
            progress(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ProviderAdapter, Role};
    use crate::weather::WeatherCategory;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeTransport {
        tools: Vec<ToolSpec>,
        replies: VecDeque<Result<Value, TransportError>>,
        calls: Vec<(String, Value)>,
        lists: usize,
    }

    impl FakeTransport {
        fn with_weather_tools() -> Self {
            Self {
                tools: WeatherCategory::ALL
                    .into_iter()
                    .map(crate::tools::weather_tool_spec)
                    .collect(),
                ..Self::default()
            }
        }

        fn reply(mut self, payload: Value) -> Self {
            let text = payload.to_string();
            self.replies
                .push_back(Ok(json!({"content": [{"type": "text", "text": text}], "isError": false})));
            self
        }

        fn fail(mut self, err: TransportError) -> Self {
            self.replies.push_back(Err(err));
            self
        }
    }

    impl ToolTransport for FakeTransport {
        fn list_tools(&mut self) -> Result<Vec<ToolSpec>, TransportError> {
            self.lists += 1;
            Ok(self.tools.clone())
        }

        fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, TransportError> {
            self.calls.push((name.to_string(), arguments));
            self.replies.pop_front().unwrap_or(Err(TransportError::Closed))
        }
    }

    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<LLMResponse, ProviderError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ProviderAdapter for ScriptedModel {
        fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::new("exhausted", "no scripted reply", false)))
        }
    }

    fn response(content: Vec<ContentBlock>) -> Result<LLMResponse, ProviderError> {
        Ok(LLMResponse {
            content,
            stop_reason: None,
            raw: None,
        })
    }

    fn text(text: &str) -> ContentBlock {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }

    fn tool_use(id: &str, name: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: json!({"take_screenshot": false}),
        }
    }

    fn build_assistant(
        mode: DispatchMode,
        replies: Vec<Result<LLMResponse, ProviderError>>,
    ) -> (WeatherAssistant, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        });
        let mut router = LLMRouter::new("anthropic");
        router.register_provider("anthropic", model.clone());
        let config = AssistantConfig {
            mode,
            ..AssistantConfig::default()
        };
        (WeatherAssistant::new(router, config), model)
    }

    fn current_payload() -> Value {
        json!({"success": true, "weather_data": "Sunny, 28°C", "screenshot_path": null})
    }

    #[test]
    fn keyword_mode_renders_current_weather() {
        let (assistant, _) = build_assistant(DispatchMode::Keyword, vec![]);
        let mut transport = FakeTransport::with_weather_tools().reply(current_payload());

        let answer = assistant.process_query(&mut transport, "What's the weather today?");

        assert_eq!(answer, "Current Weather in Hong Kong:\n\nSunny, 28°C");
        assert_eq!(
            transport.calls,
            vec![(
                "get_hk_current_weather".to_string(),
                json!({"headless": false, "take_screenshot": true})
            )]
        );
    }

    #[test]
    fn model_reply_with_tool_use_gets_one_follow_up() {
        let (assistant, model) = build_assistant(
            DispatchMode::Model,
            vec![
                response(vec![text("Checking now."), tool_use("toolu_1", "get_hk_current_weather")]),
                response(vec![text("It is sunny and 28°C.")]),
            ],
        );
        let mut transport = FakeTransport::with_weather_tools().reply(current_payload());

        let answer = assistant.process_query(&mut transport, "How warm is it?");

        assert_eq!(
            answer,
            "Checking now.\n[Calling tool get_hk_current_weather]\nIt is sunny and 28°C."
        );
        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.as_ref().unwrap().len(), 3);
        assert_eq!(requests[0].temperature, Some(0.7));

        let follow_up = &requests[1].messages;
        assert_eq!(follow_up.len(), 3);
        assert_eq!(follow_up[1].role, Role::Assistant);
        assert_eq!(
            follow_up[2].content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: json!({"result": "Sunny, 28°C", "screenshot": "No screenshot available"}),
                is_error: false,
            }]
        );
        assert_eq!(transport.calls[0].1, json!({"take_screenshot": false}));
    }

    #[test]
    fn text_only_reply_calls_no_tools() {
        let (assistant, model) = build_assistant(DispatchMode::Model, vec![response(vec![text("It is sunny.")])]);
        let mut transport = FakeTransport::with_weather_tools();

        let answer = assistant.process_query(&mut transport, "Hello there");

        assert_eq!(answer, "It is sunny.");
        assert!(transport.calls.is_empty());
        assert_eq!(model.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn cached_tools_are_not_listed_again() {
        let (assistant, model) = build_assistant(
            DispatchMode::Model,
            vec![response(vec![text("Hi.")]), response(vec![text("Hi again.")])],
        );
        let assistant = assistant.with_tools(FakeTransport::with_weather_tools().tools);
        let mut transport = FakeTransport::default();

        assert_eq!(assistant.process_query(&mut transport, "hi"), "Hi.");
        assert_eq!(assistant.process_query(&mut transport, "hi"), "Hi again.");

        assert_eq!(transport.lists, 0);
        assert_eq!(model.requests.lock().unwrap()[1].tools.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn each_tool_use_is_followed_up_independently() {
        let (assistant, model) = build_assistant(
            DispatchMode::Model,
            vec![
                response(vec![
                    tool_use("a", "get_hk_current_weather"),
                    tool_use("b", "get_hk_weather_warnings"),
                ]),
                response(vec![text("Sunny.")]),
                response(vec![text("No warnings."), tool_use("c", "get_hk_forecast")]),
            ],
        );
        let mut transport = FakeTransport::with_weather_tools()
            .reply(current_payload())
            .reply(json!({"success": true, "warnings_data": "None in force"}));

        let answer = assistant.process_query(&mut transport, "Anything to know?");

        assert_eq!(
            answer,
            "[Calling tool get_hk_current_weather]\nSunny.\n[Calling tool get_hk_weather_warnings]\nNo warnings."
        );
        assert_eq!(transport.calls.len(), 2);
        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        // the second follow-up only carries the second tool use
        assert_eq!(requests[2].messages[1].content, vec![tool_use("b", "get_hk_weather_warnings")]);
    }

    #[test]
    fn model_fault_falls_back_to_keywords() {
        let (assistant, _) = build_assistant(
            DispatchMode::Model,
            vec![Err(ProviderError::new("rate_limit", "slow down", true))],
        );
        let mut transport = FakeTransport::with_weather_tools().reply(json!({
            "success": true,
            "forecast_data": "Showers",
            "screenshot_path": "/tmp/hk_forecast_0a1b2c3d.png"
        }));

        let answer = assistant.process_query(&mut transport, "forecast for the week");

        assert_eq!(
            answer,
            "9-Day Weather Forecast for Hong Kong:\n\nShowers\n\nA screenshot has been saved to: /tmp/hk_forecast_0a1b2c3d.png"
        );
    }

    #[test]
    fn failed_tool_call_is_reported_to_the_model_as_error() {
        let (assistant, model) = build_assistant(
            DispatchMode::Model,
            vec![
                response(vec![tool_use("t", "get_hk_forecast")]),
                response(vec![text("The forecast is unavailable.")]),
            ],
        );
        let mut transport = FakeTransport::with_weather_tools().fail(TransportError::Rpc {
            code: -32603,
            message: "boom".to_string(),
        });

        let answer = assistant.process_query(&mut transport, "rain?");

        assert_eq!(answer, "[Calling tool get_hk_forecast]\nThe forecast is unavailable.");
        let requests = model.requests.lock().unwrap();
        match &requests[1].messages[2].content[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert!(*is_error);
                assert!(content["error"].as_str().unwrap().contains("boom"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn no_tools_and_closed_connection() {
        let (assistant, _) = build_assistant(DispatchMode::Model, vec![]);
        let mut empty = FakeTransport::default();
        assert_eq!(assistant.process_query(&mut empty, "hi"), "No tools available on the server.");

        let (keyword, _) = build_assistant(DispatchMode::Keyword, vec![]);
        let mut closed = FakeTransport::with_weather_tools();
        assert_eq!(
            keyword.process_query(&mut closed, "alerts?"),
            "Error processing query: connection to server closed"
        );
    }

    #[test]
    fn unclear_query_defaults_to_current_without_screenshot_note() {
        let (assistant, _) = build_assistant(DispatchMode::Keyword, vec![]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let assistant = assistant.with_progress(Box::new(move |line: &str| sink.lock().unwrap().push(line.to_string())));
        let mut transport = FakeTransport::with_weather_tools().reply(json!({
            "success": true,
            "weather_data": "Cloudy",
            "screenshot_path": "/tmp/x.png"
        }));

        let answer = assistant.process_query(&mut transport, "Should I bring an umbrella?");

        assert_eq!(answer, "Current Weather in Hong Kong:\n\nCloudy");
        assert_eq!(*seen.lock().unwrap(), vec!["Query unclear, defaulting to current weather"]);
    }
}
