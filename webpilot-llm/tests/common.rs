//! Shared support for the provider smoke tests.

use std::sync::Once;
use std::time::Duration;

use tokio::time::sleep;
use webpilot_common::observability::{init_logging, LogConfig, LogFormat};
use webpilot_common::Result;
use webpilot_llm::traits::{ChatMessage, ChatResponse, LlmClient, ToolSpec};

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let format = match std::env::var("WEBPILOT_LOG_FORMAT").as_deref() {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let _ = init_logging(LogConfig {
            app_name: "webpilot-tests",
            emit_stderr: true,
            format,
            default_filter: "debug",
            ..LogConfig::default()
        });
    });
}

/// Run one completion, retrying once after a short pause when the provider
/// answered with something throttling- or outage-shaped. Smoke tests hit
/// live endpoints; a single transient 5xx should not fail the suite.
pub async fn chat_once_with_retry(
    client: &dyn LlmClient,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
) -> Result<ChatResponse> {
    match client.chat(messages, tools).await {
        Ok(response) => Ok(response),
        Err(first) if is_transient(&first.to_string()) => {
            tracing::debug!(error = %first, "transient provider failure; retrying once");
            sleep(Duration::from_millis(250)).await;
            client.chat(messages, tools).await
        }
        Err(e) => Err(e),
    }
}

fn is_transient(message: &str) -> bool {
    ["429", "500", "502", "503", "504", "rate", "timeout", "overloaded"]
        .iter()
        .any(|hint| message.contains(hint))
}
