use crate::http::{HttpClient, HttpError};
use crate::traits::{ChatMessage, ChatResponse, LlmClient, ToolSpec};
use crate::wire;
use async_trait::async_trait;
use webpilot_common::{Result, WebpilotError};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// OpenAI chat-completions client. Accepts a custom base URL so gateways and
/// compatible endpoints can be pointed at without code changes.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: Option<&str>) -> Result<Self> {
        let base = base_url.unwrap_or(OPENAI_API_BASE);
        let client = HttpClient::new(base)
            .map_err(|e| WebpilotError::Llm(format!("HttpClient init failed: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatResponse> {
        let req = wire::build_request(&self.model, messages, tools, None);

        let resp: wire::ChatCompletionResponse = self
            .client
            .post_json("chat/completions", &self.api_key, &req)
            .await
            .map_err(http_to_llm)?;

        Ok(wire::into_response(resp))
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = [ChatMessage::user("Respond with just 'OK'")];
        match self.chat(&probe, &[]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_llm(e: HttpError) -> WebpilotError {
    WebpilotError::Llm(format!("{e}"))
}
