use serde_json::Value;

use crate::llm::{ContentBlock, Message};

/// Messages for one query. Every step returns a new value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn start(query: &str) -> Self {
        Self {
            messages: vec![Message::user_text(query)],
        }
    }

    pub fn with_message(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self { messages }
    }

    /// The assistant turn carries the reply's text plus the single tool use
    /// being answered, followed by the user turn holding its result.
    pub fn with_tool_round(
        &self,
        reply_text: &[ContentBlock],
        tool_use: &ContentBlock,
        content: Value,
        is_error: bool,
    ) -> Self {
        let tool_use_id = match tool_use {
            ContentBlock::ToolUse { id, .. } => id.as_str(),
            _ => "",
        };
        let mut assistant = reply_text.to_vec();
        assistant.push(tool_use.clone());
        self.with_message(Message::assistant(assistant))
            .with_message(Message::tool_result(tool_use_id, content, is_error))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
