//! The seam between the agent loop and the browser.
//!
//! [`TaskSurface`] is everything the loop needs from the outside world
//! besides the model itself: observations, action execution, and page
//! bookkeeping. The production implementation bundles the browser manager
//! with the action library, extractor and security guard; tests substitute
//! a scripted implementation.

use crate::guard::{self, PageContext, UserPrompt, BLOCKED_RESULT};
use crate::{actions, extractor};
use async_trait::async_trait;
use std::sync::Arc;
use webpilot_browser::{BrowserManager, DriverError, Page};
use webpilot_llm::ToolCall;

/// The browser disappeared: every window is closed.
#[derive(Debug)]
pub struct BrowserGone;

#[async_trait]
pub trait TaskSurface: Send {
    /// Refresh the working page: the most-recently-active, not-closed tab.
    async fn recover_page(&mut self) -> Result<(), BrowserGone>;

    /// Produce the bounded observation text. Never fails; degraded pages
    /// yield degraded text.
    async fn observe(&mut self) -> String;

    /// The working page's URL, or an empty string when unknown.
    async fn current_url(&mut self) -> String;

    /// Gate and execute one tool call, returning the narrated outcome.
    async fn execute(&mut self, call: &ToolCall) -> String;

    /// Post-action housekeeping: close stray tabs, re-point at the page.
    async fn after_action(&mut self);
}

/// Production surface over a live browser session. The manager is shared:
/// the browser context outlives any one task run.
pub struct BrowserSurface {
    browser: Arc<BrowserManager>,
    page: Option<Page>,
    prompter: Arc<dyn UserPrompt>,
    snapshot_token_budget: usize,
}

impl BrowserSurface {
    pub fn new(
        browser: Arc<BrowserManager>,
        prompter: Arc<dyn UserPrompt>,
        snapshot_token_budget: usize,
    ) -> Self {
        Self {
            browser,
            page: None,
            prompter,
            snapshot_token_budget,
        }
    }

    async fn page_context(&self) -> PageContext {
        match &self.page {
            Some(page) => PageContext {
                title: page.title().await.unwrap_or_default(),
                url: page.url().await.unwrap_or_default(),
            },
            None => PageContext::default(),
        }
    }
}

#[async_trait]
impl TaskSurface for BrowserSurface {
    async fn recover_page(&mut self) -> Result<(), BrowserGone> {
        match self.browser.active_page().await {
            Ok(page) => {
                self.page = Some(page);
                Ok(())
            }
            Err(DriverError::Closed) => Err(BrowserGone),
            Err(e) => {
                // A transport hiccup is not the same as "user closed the
                // browser"; keep the old page reference and let the
                // iteration degrade.
                tracing::warn!(target: "agent.surface", error = %e, "page recovery failed");
                if self.page.is_some() {
                    Ok(())
                } else {
                    Err(BrowserGone)
                }
            }
        }
    }

    async fn observe(&mut self) -> String {
        match &self.page {
            Some(page) => extractor::extract(page, self.snapshot_token_budget).await,
            None => extractor::UNAVAILABLE.to_string(),
        }
    }

    async fn current_url(&mut self) -> String {
        match &self.page {
            Some(page) => page.url().await.unwrap_or_default(),
            None => String::new(),
        }
    }

    async fn execute(&mut self, call: &ToolCall) -> String {
        let Some(page) = self.page.clone() else {
            return "No page is available; the browser window may have been closed.".to_string();
        };

        if call.name == "read_page" {
            return extractor::extract(&page, self.snapshot_token_budget).await;
        }

        let context = self.page_context().await;
        if !guard::check_action(call, &context, self.prompter.as_ref()).await {
            return BLOCKED_RESULT.to_string();
        }

        let args = call.parsed_arguments();
        let str_arg = |key: &str| args.get(key).and_then(|v| v.as_str()).map(str::to_string);

        match call.name.as_str() {
            "navigate" => match str_arg("url") {
                Some(url) => actions::navigate(&page, &url).await,
                None => "navigate requires a 'url' argument.".to_string(),
            },
            "click" => match str_arg("selector") {
                Some(sel) => actions::click(&page, &sel).await,
                None => "click requires a 'selector' argument.".to_string(),
            },
            "type" => match (str_arg("selector"), str_arg("text")) {
                (Some(sel), Some(text)) => actions::type_text(&page, &sel, &text).await,
                _ => "type requires 'selector' and 'text' arguments.".to_string(),
            },
            "scroll" => match str_arg("direction") {
                Some(dir) => actions::scroll(&page, &dir).await,
                None => "scroll requires a 'direction' of \"up\" or \"down\".".to_string(),
            },
            "go_back" => actions::go_back(&page).await,
            "select_option" => match (str_arg("selector"), str_arg("value")) {
                (Some(sel), Some(value)) => actions::select_option(&page, &sel, &value).await,
                _ => "select_option requires 'selector' and 'value' arguments.".to_string(),
            },
            "press_key" => match str_arg("key") {
                Some(key) => actions::press_key(&page, &key).await,
                None => "press_key requires a 'key' argument.".to_string(),
            },
            "hover" => match str_arg("selector") {
                Some(sel) => actions::hover(&page, &sel).await,
                None => "hover requires a 'selector' argument.".to_string(),
            },
            "wait" => {
                let ms = args.get("ms").and_then(|v| v.as_u64()).unwrap_or(1000);
                actions::wait(ms).await
            }
            "screenshot" => actions::screenshot(&page).await,
            other => format!("Unknown tool: {other}"),
        }
    }

    async fn after_action(&mut self) {
        if let Err(e) = self.browser.close_extra_tabs().await {
            tracing::debug!(target: "agent.surface", error = %e, "tab cleanup failed");
        }
        if let Ok(page) = self.browser.active_page().await {
            self.page = Some(page);
        }
    }
}
