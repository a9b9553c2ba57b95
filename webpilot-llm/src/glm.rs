use crate::http::{HttpClient, HttpError};
use crate::traits::{ChatMessage, ChatResponse, LlmClient, ToolSpec};
use crate::wire;
use async_trait::async_trait;
use webpilot_common::{Result, WebpilotError};

const GLM_API_BASE: &str = "https://api.z.ai/api/paas/v4/";
const GLM_TEMPERATURE: f32 = 0.3;

/// GLM client over the OpenAI-compatible chat-completions endpoint.
pub struct GlmClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl GlmClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(GLM_API_BASE)
            .map_err(|e| WebpilotError::Llm(format!("HttpClient init failed: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for GlmClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatResponse> {
        let req = wire::build_request(&self.model, messages, tools, Some(GLM_TEMPERATURE));

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
                tracing::warn!("GLM health check failed: {}", e);
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
