//! OpenAI-compatible chat-completions wire format.
//!
//! Both providers speak this shape; only the endpoint and defaults differ.

use crate::traits::{ChatMessage, ChatResponse, TokenUsage, ToolCall, ToolSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireToolFunction,
}

#[derive(Debug, Serialize)]
pub struct WireToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Assemble one request body from the domain types.
pub fn build_request(
    model: &str,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
    temperature: Option<f32>,
) -> ChatCompletionRequest {
    let tools = if tools.is_empty() {
        None
    } else {
        Some(tools.iter().map(tool_to_wire).collect())
    };
    ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.iter().map(message_to_wire).collect(),
        tools,
        temperature,
    }
}

fn tool_to_wire(spec: &ToolSpec) -> WireTool {
    WireTool {
        kind: "function",
        function: WireToolFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
        },
    }
}

fn message_to_wire(msg: &ChatMessage) -> WireMessage {
    match msg {
        ChatMessage::System { content } => WireMessage {
            role: "system".into(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ChatMessage::User { content } => WireMessage {
            role: "user".into(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => WireMessage {
            role: "assistant".into(),
            content: content.clone(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|tc| WireToolCall {
                            id: tc.id.clone(),
                            kind: "function".into(),
                            function: WireFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        ChatMessage::Tool {
            tool_call_id,
            content,
        } => WireMessage {
            role: "tool".into(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
        },
    }
}

/// Flatten the first choice of a completion into the domain response.
pub fn into_response(resp: ChatCompletionResponse) -> ChatResponse {
    let model = resp.model;
    let usage = resp.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let Some(choice) = resp.choices.into_iter().next() else {
        return ChatResponse {
            model,
            usage,
            ..Default::default()
        };
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    ChatResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason: choice.finish_reason,
        usage,
        model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialises_tool_call_round_trip() {
        let messages = vec![
            ChatMessage::system("do things"),
            ChatMessage::assistant(
                None,
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "navigate".into(),
                    arguments: r#"{"url":"example.com"}"#.into(),
                }],
            ),
            ChatMessage::tool("call_1", "Navigated to https://example.com"),
        ];
        let req = build_request("glm-4.6", &messages, &[], Some(0.3));
        let v = serde_json::to_value(&req).unwrap();

        assert_eq!(v["model"], "glm-4.6");
        assert_eq!(v["temperature"], json!(0.3));
        assert!(v.get("tools").is_none());
        assert_eq!(v["messages"][1]["role"], "assistant");
        assert_eq!(v["messages"][1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(v["messages"][1]["tool_calls"][0]["type"], "function");
        assert_eq!(
            v["messages"][1]["tool_calls"][0]["function"]["name"],
            "navigate"
        );
        assert_eq!(v["messages"][2]["role"], "tool");
        assert_eq!(v["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn tools_take_the_function_envelope() {
        let spec = ToolSpec {
            name: "wait".into(),
            description: "Pause".into(),
            parameters: json!({"type":"object","properties":{"ms":{"type":"integer"}}}),
        };
        let req = build_request("gpt-4o-mini", &[ChatMessage::user("hi")], &[spec], None);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["tools"][0]["type"], "function");
        assert_eq!(v["tools"][0]["function"]["name"], "wait");
        assert!(v.get("temperature").is_none());
    }

    #[test]
    fn response_parses_tool_calls_and_usage() {
        let raw = r#"{
            "model": "glm-4.6",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "click", "arguments": "{\"selector\":\"button \\\"Apply\\\"\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let resp = into_response(parsed);

        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "click");
        assert_eq!(resp.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(resp.usage.unwrap().total_tokens, 138);
        assert!(resp.text().is_none());
    }

    #[test]
    fn empty_choices_yield_an_empty_response() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let resp = into_response(parsed);
        assert!(resp.content.is_none());
        assert!(resp.tool_calls.is_empty());
    }
}
