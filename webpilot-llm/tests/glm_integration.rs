mod common;

use webpilot_llm::glm::GlmClient;
use webpilot_llm::traits::{ChatMessage, LlmClient};
use webpilot_llm::DEFAULT_GLM_MODEL;

#[tokio::test]
#[ignore = "needs GLM_API_KEY and network access"]
async fn glm_answers_a_trivial_chat() {
    common::init_test_tracing();

    let key = std::env::var("GLM_API_KEY").expect("set GLM_API_KEY to run this smoke test");
    let client = GlmClient::new(key, DEFAULT_GLM_MODEL.to_string()).unwrap();
    assert_eq!(client.model_name(), DEFAULT_GLM_MODEL);

    let messages = [ChatMessage::user("Reply with the single word OK")];
    let response = common::chat_once_with_retry(&client, &messages, &[])
        .await
        .expect("completion against the live endpoint");

    tracing::debug!(content = ?response.content, "glm smoke response");
    assert!(
        response.text().is_some(),
        "expected non-empty assistant text"
    );
    assert!(response.tool_calls.is_empty());
}
