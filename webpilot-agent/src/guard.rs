//! Gatekeeping for destructive browser actions.
//!
//! Read-only meta-tools pass straight through. Everything else is tested
//! against per-tool regex rules and a bilingual keyword list; on a match the
//! user is asked to confirm before the action runs. A denial is not fatal:
//! the model receives [`BLOCKED_RESULT`] as an ordinary tool result and can
//! try another approach.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use webpilot_llm::ToolCall;

/// Tool result handed to the model when the user denies an action.
pub const BLOCKED_RESULT: &str = "This action was blocked by the user. \
    Try a different approach, or use ask_user to find out how to proceed.";

/// Tools that only observe or end the run; never gated.
pub const META_TOOLS: &[&str] = &[
    "read_page", "scroll", "wait", "ask_user", "done", "hover", "go_back", "navigate",
];

/// Where a question to the human operator goes.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Ask for confirmation; an answer whose first character is `y`/`Y`
    /// approves.
    async fn confirm(&self, prompt: &str) -> String;

    /// Relay a free-form question from the model and return the answer.
    async fn ask(&self, question: &str) -> String;
}

/// The page the action would run against, for context-sensitive rules.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub title: String,
    pub url: String,
}

/// Decide whether `call` may execute. Destructive-looking actions require
/// the operator's consent via `prompter`.
pub async fn check_action(call: &ToolCall, page: &PageContext, prompter: &dyn UserPrompt) -> bool {
    if META_TOOLS.contains(&call.name.as_str()) {
        return true;
    }

    let Some(reason) = destructive_reason(call, page) else {
        return true;
    };

    tracing::info!(
        target: "agent.guard",
        tool = %call.name,
        reason = %reason,
        url = %page.url,
        "destructive action needs confirmation"
    );

    let prompt = format!(
        "The agent wants to run a potentially destructive action ({reason}):\n\
         \x20 tool: {}\n\
         \x20 arguments: {}\n\
         \x20 page: \"{}\" ({})\n\
         Allow it? [y/N] ",
        call.name, call.arguments, page.title, page.url
    );
    let answer = prompter.confirm(&prompt).await;
    answer.trim().to_lowercase().starts_with('y')
}

fn destructive_reason(call: &ToolCall, page: &PageContext) -> Option<String> {
    for (tool, pattern) in regex_rules() {
        if *tool == call.name && pattern.is_match(&call.arguments) {
            return Some(format!("{tool} matches /{}/", pattern.as_str()));
        }
    }

    let args = call.arguments.to_lowercase();
    if let Some(hit) = KEYWORDS.iter().find(|k| args.contains(*k)) {
        return Some(format!("arguments contain '{hit}'"));
    }

    // Clicks on a checkout/cart/deletion/confirmation surface are suspect
    // even when the button text itself is bland ("Continue", "→").
    if call.name == "click" && on_sensitive_surface(page) {
        let context = format!("{} {}", page.title, page.url).to_lowercase();
        if let Some(hit) = KEYWORDS.iter().find(|k| context.contains(*k)) {
            return Some(format!("page context contains '{hit}'"));
        }
    }

    None
}

fn regex_rules() -> &'static Vec<(&'static str, Regex)> {
    static RULES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (
                "click",
                Regex::new(
                    r"(?i)(delete|удал|pay|оплат|submit|отправ|buy|куп|purchase|confirm|подтвер|checkout)",
                )
                .unwrap(),
            ),
            ("press_key", Regex::new(r"(?i)enter").unwrap()),
        ]
    })
}

/// Destructive verbs, Russian and English stems.
const KEYWORDS: &[&str] = &[
    "delete",
    "удал",
    "pay",
    "оплат",
    "submit",
    "отправ",
    "buy",
    "куп",
    "purchase",
    "order",
    "заказ",
    "cancel",
    "отмен",
    "unsubscribe",
    "отпис",
    "transfer",
    "перев",
    "sign",
    "подпис",
    "agree",
    "соглас",
    "reset",
    "сброс",
];

fn on_sensitive_surface(page: &PageContext) -> bool {
    const SURFACE_HINTS: &[&str] = &[
        "checkout",
        "cart",
        "корзин",
        "оформлен",
        "оплат",
        "payment",
        "billing",
        "delete",
        "удален",
        "confirm",
        "подтвер",
    ];
    let haystack = format!("{} {}", page.title, page.url).to_lowercase();
    SURFACE_HINTS.iter().any(|h| haystack.contains(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedPrompt {
        answer: &'static str,
        asked: AtomicUsize,
    }

    impl ScriptedPrompt {
        fn new(answer: &'static str) -> Self {
            Self {
                answer,
                asked: AtomicUsize::new(0),
            }
        }
        fn times_asked(&self) -> usize {
            self.asked.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserPrompt for ScriptedPrompt {
        async fn confirm(&self, _prompt: &str) -> String {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer.to_string()
        }
        async fn ask(&self, _question: &str) -> String {
            String::new()
        }
    }

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall {
            id: "c1".into(),
            name: name.into(),
            arguments: args.into(),
        }
    }

    #[tokio::test]
    async fn meta_tools_never_prompt() {
        let prompter = ScriptedPrompt::new("n");
        let page = PageContext::default();
        for name in META_TOOLS {
            let c = call(name, r#"{"selector":"button \"Удалить\""}"#);
            assert!(check_action(&c, &page, &prompter).await, "{name}");
        }
        assert_eq!(prompter.times_asked(), 0);
    }

    #[tokio::test]
    async fn destructive_click_denied_in_russian_checkout() {
        let prompter = ScriptedPrompt::new("n");
        let page = PageContext {
            title: "Checkout — Store".into(),
            url: "https://store.example/checkout".into(),
        };
        let c = call("click", r#"{"selector":"button \"Оплатить\""}"#);
        assert!(!check_action(&c, &page, &prompter).await);
        assert_eq!(prompter.times_asked(), 1);
    }

    #[tokio::test]
    async fn yes_answer_approves() {
        let prompter = ScriptedPrompt::new("Yes, go ahead");
        let page = PageContext::default();
        let c = call("click", r#"{"selector":"button \"Delete\""}"#);
        assert!(check_action(&c, &page, &prompter).await);
    }

    #[tokio::test]
    async fn press_enter_requires_confirmation() {
        let prompter = ScriptedPrompt::new("n");
        let c = call("press_key", r#"{"key":"Enter"}"#);
        assert!(!check_action(&c, &PageContext::default(), &prompter).await);
    }

    #[tokio::test]
    async fn bland_click_on_checkout_surface_is_gated() {
        let prompter = ScriptedPrompt::new("n");
        let page = PageContext {
            title: "Оформление заказа".into(),
            url: "https://shop.example/cart/confirm".into(),
        };
        let c = call("click", r#"{"selector":"button \"Continue\""}"#);
        assert!(!check_action(&c, &page, &prompter).await);
    }

    #[tokio::test]
    async fn harmless_click_passes_silently() {
        let prompter = ScriptedPrompt::new("n");
        let page = PageContext {
            title: "Search results".into(),
            url: "https://example.com/search?q=jobs".into(),
        };
        let c = call("click", r#"{"selector":"link \"Next page\""}"#);
        assert!(check_action(&c, &page, &prompter).await);
        assert_eq!(prompter.times_asked(), 0);
    }

    #[tokio::test]
    async fn type_with_destructive_keyword_is_gated() {
        let prompter = ScriptedPrompt::new("n");
        let c = call(
            "type",
            r#"{"selector":"textbox","text":"please cancel my subscription"}"#,
        );
        assert!(!check_action(&c, &PageContext::default(), &prompter).await);
    }
}
