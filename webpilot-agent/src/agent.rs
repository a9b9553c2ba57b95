//! The observe → think → act loop.
//!
//! One iteration: recover the page, extract an observation, request one
//! completion, then act on what came back: tool calls (gated, loop-checked,
//! executed serially), a text-only reply (nudged back towards tools, or
//! accepted as the final summary), or nothing (a failure). Only this layer
//! may abort the run, and only for a closed browser or a run of consecutive
//! errors; everything below narrates its failures into strings.

use crate::context::ContextManager;
use crate::guard::UserPrompt;
use crate::prompt;
use crate::stuck::RecentActions;
use crate::surface::TaskSurface;
use crate::tools;
use std::sync::Arc;
use webpilot_llm::traits::LlmClient;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;
const MAX_TEXT_ONLY_RETRIES: u32 = 2;

const STUCK_NOTICE: &str = "You appear to be repeating the same action on the same \
page without progress. The action was NOT executed. Try something different: \
scroll, pick another element, or navigate to a different page.";

const TOOL_NUDGE: &str = "Please respond with a tool call. Text alone does not act \
on the page; if the task is finished, call done with a summary.";

const ABORT_BROWSER_CLOSED: &str = "Task aborted: Browser windows closed.";
const ABORT_TOO_MANY_ERRORS: &str = "Task aborted: Too many consecutive errors.";

/// Loop tuning knobs.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_history_messages: usize,
    pub context_token_budget: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_history_messages: 10,
            context_token_budget: 8000,
        }
    }
}

/// Drives one task to completion against a [`TaskSurface`].
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    surface: Box<dyn TaskSurface>,
    prompter: Arc<dyn UserPrompt>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        surface: Box<dyn TaskSurface>,
        prompter: Arc<dyn UserPrompt>,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            surface,
            prompter,
            config,
        }
    }

    /// Run `task` and return the final summary (or abort message).
    pub async fn run(&mut self, task: &str) -> String {
        let mut ctx = ContextManager::new(
            prompt::system_prompt(task),
            self.config.max_history_messages,
            self.config.context_token_budget,
        );
        let mut recent = RecentActions::new();
        let mut consecutive_failures: u32 = 0;
        let mut text_only_retries: u32 = 0;
        let mut is_done = false;
        let mut summary: Option<String> = None;
        let max = self.config.max_iterations;

        for iteration in 1..=max {
            if is_done {
                break;
            }

            // 1. Page recovery: sites close tabs, users close windows.
            if self.surface.recover_page().await.is_err() {
                tracing::warn!(target: "agent.iteration", iteration, "no open pages left");
                return ABORT_BROWSER_CLOSED.to_string();
            }

            // 2. Observe.
            let snapshot = self.surface.observe().await;
            let observation =
                format!("[Step {iteration}/{max}]\n\nCurrent page state:\n{snapshot}");
            tracing::info!(
                target: "agent.iteration",
                iteration,
                snapshot_chars = snapshot.len(),
                "observing"
            );
            ctx.add_observation(observation);

            // 3. Think.
            let response = match self.llm.chat(&ctx.get_messages(), &tools::all_tools()).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(target: "agent.iteration", iteration, error = %e, "completion failed");
                    consecutive_failures += 1;
                    // Rewind the observation so the next iteration does not
                    // open on a dangling user turn.
                    ctx.remove_last_observation();
                    if consecutive_failures > MAX_CONSECUTIVE_FAILURES {
                        return ABORT_TOO_MANY_ERRORS.to_string();
                    }
                    continue;
                }
            };
            if let Some(usage) = response.usage {
                tracing::info!(
                    target: "llm.usage",
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    total_tokens = usage.total_tokens,
                    "tokens"
                );
            }

            // 4. Act.
            if !response.tool_calls.is_empty() {
                consecutive_failures = 0;
                ctx.add_assistant_message(response.content.clone(), response.tool_calls.clone());

                for call in &response.tool_calls {
                    let action_desc = format!("{}({})", call.name, call.arguments);
                    let url = self.surface.current_url().await;

                    if recent.is_stuck(&action_desc, &url) {
                        tracing::info!(
                            target: "agent.loop_detect",
                            action = %action_desc,
                            url = %url,
                            "stuck; injecting notice instead of executing"
                        );
                        ctx.add_tool_result(call, STUCK_NOTICE);
                        continue;
                    }
                    recent.push(action_desc.clone(), url);

                    let result = match call.name.as_str() {
                        "done" => {
                            is_done = true;
                            summary = Some(done_summary(call, response.content.as_deref()));
                            "Task marked as done.".to_string()
                        }
                        "ask_user" => {
                            let question = call
                                .parsed_arguments()
                                .get("question")
                                .and_then(|v| v.as_str())
                                .unwrap_or("The agent needs your input.")
                                .to_string();
                            let answer = self.prompter.ask(&question).await;
                            format!("User answered: {answer}")
                        }
                        _ => {
                            let outcome = self.surface.execute(call).await;
                            self.surface.after_action().await;
                            outcome
                        }
                    };

                    tracing::info!(
                        target: "agent.action",
                        action = %action_desc,
                        result_prefix = %result.chars().take(120).collect::<String>(),
                        "executed"
                    );
                    ctx.add_tool_result(call, &result);

                    if is_done {
                        break;
                    }
                }
            } else if let Some(text) = response.text() {
                let text = text.to_string();
                tracing::info!(target: "agent.iteration", iteration, text = %text, "text-only reply");
                consecutive_failures = 0;
                ctx.add_assistant_message(Some(text.clone()), vec![]);

                if text.contains('?') && text_only_retries < MAX_TEXT_ONLY_RETRIES {
                    ctx.add_user_message(TOOL_NUDGE);
                    text_only_retries += 1;
                    continue;
                }

                let finished = response.finish_reason.as_deref() == Some("stop")
                    && contains_completion_word(&text);
                if finished {
                    return text;
                }

                if text_only_retries < MAX_TEXT_ONLY_RETRIES {
                    ctx.add_user_message(TOOL_NUDGE);
                    text_only_retries += 1;
                }
            } else {
                tracing::warn!(target: "agent.iteration", iteration, "empty completion");
                consecutive_failures += 1;
                if consecutive_failures > MAX_CONSECUTIVE_FAILURES {
                    return ABORT_TOO_MANY_ERRORS.to_string();
                }
            }
        }

        if let Some(summary) = summary {
            return summary;
        }
        self.force_summary(&mut ctx).await
    }

    /// The iteration ceiling was hit without `done`: one last completion
    /// with only the done tool on the table.
    async fn force_summary(&mut self, ctx: &mut ContextManager) -> String {
        let max = self.config.max_iterations;
        ctx.add_user_message(
            "You have reached the maximum number of steps. Call the done tool now \
             with a summary of what was achieved, what remains unfinished, and \
             recommended next steps.",
        );

        match self.llm.chat(&ctx.get_messages(), &[tools::done_tool()]).await {
            Ok(response) => {
                if let Some(call) = response.tool_calls.iter().find(|c| c.name == "done") {
                    if let Some(s) = call
                        .parsed_arguments()
                        .get("summary")
                        .and_then(|v| v.as_str())
                    {
                        return s.to_string();
                    }
                }
                if let Some(text) = response.text() {
                    return text.to_string();
                }
                format!("Task ended: reached {max} iterations without a final summary.")
            }
            Err(e) => {
                tracing::warn!(target: "agent.iteration", error = %e, "forced summary failed");
                format!("Task ended: reached {max} iterations without a final summary.")
            }
        }
    }
}

fn done_summary(call: &webpilot_llm::ToolCall, assistant_text: Option<&str>) -> String {
    call.parsed_arguments()
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| assistant_text.map(str::to_string))
        .unwrap_or_else(|| "Task completed.".to_string())
}

fn contains_completion_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["task", "complete", "finished", "done"]
        .iter()
        .any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_llm::ToolCall;

    #[test]
    fn completion_words_are_detected_case_insensitively() {
        assert!(contains_completion_word("The Task is COMPLETE."));
        assert!(contains_completion_word("All done!"));
        assert!(!contains_completion_word("Still working on it."));
    }

    #[test]
    fn done_summary_prefers_the_tool_argument() {
        let call = ToolCall {
            id: "c".into(),
            name: "done".into(),
            arguments: r#"{"summary":"Deleted 3 spam emails."}"#.into(),
        };
        assert_eq!(done_summary(&call, Some("text")), "Deleted 3 spam emails.");

        let empty = ToolCall {
            id: "c".into(),
            name: "done".into(),
            arguments: "{}".into(),
        };
        assert_eq!(done_summary(&empty, Some("fallback text")), "fallback text");
        assert_eq!(done_summary(&empty, None), "Task completed.");
    }
}
