//! Conversation context: a budgeted sliding window over the message log.
//!
//! The prompt sent to the model is system prompt → condensed action history →
//! a window of recent raw messages. The window must never separate a tool
//! result from the assistant message that issued its tool call, or the
//! backend rejects the conversation for an orphaned tool result; the window
//! start therefore walks backwards past tool results to the assistant that
//! owns them.

use webpilot_llm::{ChatMessage, ToolCall};

/// Owns the raw message log plus the condensed action history.
pub struct ContextManager {
    system_prompt: String,
    messages: Vec<ChatMessage>,
    action_history: Vec<String>,
    max_history_messages: usize,
    token_budget: usize,
}

impl ContextManager {
    pub fn new(system_prompt: String, max_history_messages: usize, token_budget: usize) -> Self {
        Self {
            system_prompt,
            messages: Vec::new(),
            action_history: Vec::new(),
            max_history_messages,
            token_budget,
        }
    }

    /// Build the prompt for the next completion.
    pub fn get_messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 2);
        out.push(ChatMessage::system(self.system_prompt.clone()));

        if !self.action_history.is_empty() {
            out.push(ChatMessage::user(format!(
                "Actions taken so far (condensed):\n{}",
                self.action_history.join("\n")
            )));
        }

        let start = self.window_start();
        out.extend(self.messages[start..].iter().cloned());
        out
    }

    /// Where the raw window begins. Never lands on a tool result.
    fn window_start(&self) -> usize {
        let mut start = self.messages.len().saturating_sub(self.max_history_messages);
        while start > 0 && matches!(self.messages[start], ChatMessage::Tool { .. }) {
            start -= 1;
        }
        // A tool result at index 0 has no owner in the log at all; skip
        // forward past the orphan run rather than ship it.
        if start == 0 {
            while start < self.messages.len()
                && matches!(self.messages[start], ChatMessage::Tool { .. })
            {
                start += 1;
            }
        }
        start
    }

    /// Append one page observation, compressing the log if it outgrew the
    /// token budget.
    pub fn add_observation(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
        self.compress_if_needed();
    }

    pub fn add_assistant_message(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        self.messages
            .push(ChatMessage::assistant(content, tool_calls));
    }

    /// Append a plain user message (nudges, notices).
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Record one tool result and its condensed action-history entry.
    pub fn add_tool_result(&mut self, call: &ToolCall, result: &str) {
        self.messages
            .push(ChatMessage::tool(call.id.clone(), result));

        let prefix_len = if result.len() > 1000 { 300 } else { 100 };
        let prefix: String = result.chars().take(prefix_len).collect();
        self.action_history.push(format!(
            "{}({}) → {}",
            call.name,
            summarize_args(&call.arguments),
            prefix
        ));
    }

    /// Drop the most recent observation. Called when the completion that
    /// was supposed to answer it failed, so the next iteration does not
    /// start with a dangling user turn.
    pub fn remove_last_observation(&mut self) {
        if let Some(pos) = self
            .messages
            .iter()
            .rposition(|m| matches!(m, ChatMessage::User { .. }))
        {
            self.messages.remove(pos);
        }
    }

    /// Raw log length (tests and diagnostics).
    pub fn raw_len(&self) -> usize {
        self.messages.len()
    }

    pub fn action_history(&self) -> &[String] {
        &self.action_history
    }

    fn compress_if_needed(&mut self) {
        while self.estimated_tokens() > self.token_budget && self.messages.len() > 4 {
            self.messages.remove(0);
        }
        // The gist of what was dropped lives on in the action history; just
        // make sure the log does not now open with orphaned tool results.
        while matches!(self.messages.first(), Some(ChatMessage::Tool { .. })) {
            self.messages.remove(0);
        }
    }

    /// `ceil(len / 4)` per content string; tool calls cost their arguments
    /// plus a small fixed overhead.
    fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(estimate_message_tokens).sum()
    }
}

fn estimate_message_tokens(msg: &ChatMessage) -> usize {
    match msg {
        ChatMessage::System { content } | ChatMessage::User { content } => estimate_str(content),
        ChatMessage::Tool { content, .. } => estimate_str(content),
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => {
            let text = content.as_deref().map(estimate_str).unwrap_or(0);
            let calls: usize = tool_calls
                .iter()
                .map(|tc| estimate_str(&tc.arguments) + 10)
                .sum();
            text + calls
        }
    }
}

fn estimate_str(s: &str) -> usize {
    s.len().div_ceil(4)
}

/// `{"url":"x","depth":2}` → `url=\"x\",depth=2` for action-history lines.
fn summarize_args(arguments: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(","),
        _ => {
            let mut s = arguments.to_string();
            if s.len() > 60 {
                s.truncate(60);
            }
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args.into(),
        }
    }

    fn manager() -> ContextManager {
        ContextManager::new("system".into(), 10, 8000)
    }

    #[test]
    fn prompt_opens_with_system_then_history() {
        let mut ctx = manager();
        ctx.add_observation("obs 1");
        ctx.add_assistant_message(None, vec![call("c1", "wait", r#"{"ms":100}"#)]);
        ctx.add_tool_result(&call("c1", "wait", r#"{"ms":100}"#), "Waited 100ms");

        let msgs = ctx.get_messages();
        assert!(matches!(msgs[0], ChatMessage::System { .. }));
        match &msgs[1] {
            ChatMessage::User { content } => {
                assert!(content.contains("wait(ms=100) → Waited 100ms"))
            }
            other => panic!("expected history message, got {other:?}"),
        }
    }

    #[test]
    fn window_never_splits_a_tool_call_pair() {
        let mut ctx = manager();
        // Alternate observation / assistant+call / result so the naive
        // window start can land inside a pair.
        for i in 0..8 {
            ctx.add_observation(format!("obs {i}"));
            let c = call(&format!("c{i}"), "click", r#"{"selector":"button"}"#);
            ctx.add_assistant_message(None, vec![c.clone()]);
            ctx.add_tool_result(&c, "Clicked");
        }

        let msgs = ctx.get_messages();
        // Every tool result in the window must be preceded by the assistant
        // carrying its call id.
        for (i, m) in msgs.iter().enumerate() {
            if let ChatMessage::Tool { tool_call_id, .. } = m {
                let owner = msgs[..i].iter().rev().find_map(|m| match m {
                    ChatMessage::Assistant { tool_calls, .. } => {
                        Some(tool_calls.iter().any(|tc| &tc.id == tool_call_id))
                    }
                    _ => None,
                });
                assert_eq!(owner, Some(true), "orphaned tool result at index {i}");
            }
        }
        // And the first raw message after system+history is not a result.
        assert!(!matches!(msgs[2], ChatMessage::Tool { .. }));
    }

    #[test]
    fn compression_drops_oldest_but_keeps_gist() {
        let mut ctx = ContextManager::new("system".into(), 10, 100);
        let c = call("c1", "read_page", "{}");
        ctx.add_observation("x".repeat(200));
        ctx.add_assistant_message(None, vec![c.clone()]);
        ctx.add_tool_result(&c, &"y".repeat(200));
        ctx.add_observation("z".repeat(200));
        ctx.add_observation("w".repeat(200));
        ctx.add_observation("v".repeat(200));

        // Budget of 100 tokens ≈ 400 chars: the early messages must go.
        assert!(ctx.raw_len() < 6);
        assert_eq!(ctx.action_history().len(), 1);
        assert!(!matches!(
            ctx.get_messages().last().unwrap(),
            ChatMessage::Tool { .. }
        ));
    }

    #[test]
    fn tool_result_prefix_length_depends_on_result_size() {
        let mut ctx = manager();
        let c1 = call("c1", "read_page", "{}");
        ctx.add_tool_result(&c1, &"a".repeat(2000));
        let c2 = call("c2", "wait", r#"{"ms":1}"#);
        ctx.add_tool_result(&c2, &"b".repeat(500));

        let history = ctx.action_history();
        assert!(history[0].ends_with(&"a".repeat(300)));
        assert!(history[1].ends_with(&"b".repeat(100)));
    }

    #[test]
    fn remove_last_observation_rewinds_the_dangling_user_turn() {
        let mut ctx = manager();
        ctx.add_observation("obs 1");
        let c = call("c1", "wait", r#"{"ms":1}"#);
        ctx.add_assistant_message(None, vec![c.clone()]);
        ctx.add_tool_result(&c, "ok");
        ctx.add_observation("obs 2");
        let before = ctx.raw_len();

        ctx.remove_last_observation();
        assert_eq!(ctx.raw_len(), before - 1);
        // The earlier pair is intact; only the trailing observation went.
        assert!(matches!(
            ctx.get_messages().last().unwrap(),
            ChatMessage::Tool { .. }
        ));
    }

    #[test]
    fn token_estimate_counts_tool_call_overhead() {
        assert_eq!(estimate_str("abcd"), 1);
        assert_eq!(estimate_str("abcde"), 2);
        let msg = ChatMessage::assistant(
            Some("12345678".into()),
            vec![call("c", "click", "12345678")],
        );
        // 2 for content + 2 for args + 10 overhead.
        assert_eq!(estimate_message_tokens(&msg), 14);
    }

    #[test]
    fn summarize_args_flattens_objects() {
        assert_eq!(
            summarize_args(r#"{"selector":"button \"Apply\"","n":2}"#),
            r#"n=2,selector="button \"Apply\"""#
        );
        assert_eq!(summarize_args("not json"), "not json");
    }
}
