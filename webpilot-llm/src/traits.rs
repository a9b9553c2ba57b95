use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webpilot_common::Result;

/// One entry in the conversation log sent to the model.
///
/// The pairing invariant: every [`ChatMessage::Tool`] answers the id of a
/// tool call carried by an earlier [`ChatMessage::Assistant`], and every
/// tool call is answered before the next assistant turn. The context
/// manager enforces this when it windows the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// The result of one tool call, addressed by its id.
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// A structured request by the model to invoke one named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, verbatim from the wire.
    pub arguments: String,
}

impl ToolCall {
    /// Parse the arguments into a JSON value; malformed input becomes an
    /// empty object so callers can still read individual fields.
    pub fn parsed_arguments(&self) -> serde_json::Value {
        serde_json::from_str(&self.arguments)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

/// Declaration of one callable tool in the OpenAI-compatible function form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

/// Token accounting as reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Provider-agnostic completion result.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

impl ChatResponse {
    /// Assistant text, if any non-empty content came back.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion over the running conversation with the given tool
    /// surface. The model may answer with text, tool calls, or both.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatResponse>;

    /// Check if the backing service is reachable and answering.
    async fn health_check(&self) -> Result<bool>;

    /// The model identifier in use.
    fn model_name(&self) -> &str;
}
