//! Provider-agnostic LLM integration for webpilot.
//!
//! This crate exposes the common [`traits::LlmClient`] interface, the
//! chat/tool-call message vocabulary, and concrete provider implementations
//! for GLM and OpenAI over the shared OpenAI-compatible wire form. A
//! convenience factory builds a client from a [`ProviderConfig`].
//!
//! # Examples
//! ```no_run
//! use webpilot_llm::{client_from_config, ProviderConfig};
//!
//! # fn main() -> webpilot_common::Result<()> {
//! let cfg = ProviderConfig::Glm {
//!     api_key: "key".into(),
//!     model: None,
//! };
//! let client = client_from_config(&cfg)?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
pub mod glm;
pub mod http;
pub mod openai;
pub mod traits;
pub mod wire;

use glm::GlmClient;
use openai::OpenAiClient;
use std::sync::Arc;
use traits::LlmClient;
use webpilot_common::WebpilotError;

pub use traits::{ChatMessage, ChatResponse, TokenUsage, ToolCall, ToolSpec};

/// Default model recommendations per provider.
pub const DEFAULT_GLM_MODEL: &str = "glm-4.6";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Provider selection with credentials.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Glm {
        api_key: String,
        model: Option<String>,
    },
    OpenAi {
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    },
    /// Reserved; not yet wired to a client.
    Claude,
}

/// Build a ready client for the configured provider.
pub fn client_from_config(
    config: &ProviderConfig,
) -> webpilot_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        ProviderConfig::Glm { api_key, model } => {
            let model = model.clone().unwrap_or_else(|| DEFAULT_GLM_MODEL.into());
            let client = GlmClient::new(api_key.clone(), model)?;
            Ok(Arc::new(client))
        }
        ProviderConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => {
            let model = model.clone().unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into());
            let client = OpenAiClient::new(api_key.clone(), model, base_url.as_deref())?;
            Ok(Arc::new(client))
        }
        // FIXME(claude): add an Anthropic client once its tool-call wire
        // shape is mapped onto ChatResponse; the config plumbing is ready.
        ProviderConfig::Claude => Err(WebpilotError::Config(
            "provider 'claude' is reserved and not yet available".into(),
        )),
    }
}
