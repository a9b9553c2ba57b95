//! Single-step browser operations with fallbacks.
//!
//! Every operation returns a human-readable outcome string. Failures are
//! narrated, never thrown: the string is fed back to the model as the tool
//! result, and a specific description of what went wrong is what lets it
//! choose a different approach. Do not "fix" this by propagating errors.

use crate::selector;
use std::time::Duration;
use tokio::time::sleep;
use webpilot_browser::{DriverError, Locator, Page};

const NAVIGATE_TIMEOUT: Duration = Duration::from_secs(30);
const CLICK_TIMEOUT: Duration = Duration::from_secs(7);
const FILL_TIMEOUT: Duration = Duration::from_secs(5);
const ESCALATION_TIMEOUT: Duration = Duration::from_secs(2);
const KEYSTROKE_DELAY: Duration = Duration::from_millis(30);
const SCROLL_DELTA: i64 = 600;
const MAX_WAIT_MS: u64 = 10_000;

/// Advice appended when a strict match had to fall back to the first of
/// many elements.
const FIRST_MATCH_TIP: &str = "TIP: listing pages often repeat the same button \
for every item. Navigate into the item's detail page first, then act there.";

/// Prepend `https://` when the model forgot the scheme.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Cap a requested pause at ten seconds.
pub fn clamp_wait(ms: u64) -> u64 {
    ms.min(MAX_WAIT_MS)
}

pub async fn navigate(page: &Page, url: &str) -> String {
    let target = normalize_url(url);
    match page.goto(&target, NAVIGATE_TIMEOUT).await {
        Ok(()) => {
            // Let dynamic content settle before anyone reads the page.
            sleep(Duration::from_secs(1)).await;
            let title = page.title().await.unwrap_or_else(|_| "unknown".into());
            format!("Navigated to {target}. Page title: \"{title}\"")
        }
        Err(e) => format!(
            "Failed to navigate to {target}: {e}. Check the URL or try again."
        ),
    }
}

pub async fn click(page: &Page, raw_selector: &str) -> String {
    let locator = match selector::resolve(page, raw_selector) {
        Ok(l) => l,
        Err(e) => return e.to_string(),
    };

    match locator.click(CLICK_TIMEOUT).await {
        Ok(()) => {
            sleep(Duration::from_millis(800)).await;
            format!("Clicked on {raw_selector}")
        }
        Err(DriverError::Ambiguous { count, .. }) => {
            match locator.clone().first().click(CLICK_TIMEOUT).await {
                Ok(()) => {
                    sleep(Duration::from_millis(800)).await;
                    format!(
                        "Clicked on the FIRST match of {count} elements for {raw_selector}. \
                         {FIRST_MATCH_TIP}"
                    )
                }
                Err(e) => format!("Found {count} matches for {raw_selector} but clicking the first failed: {e}"),
            }
        }
        Err(e) => {
            tracing::debug!(
                target: "agent.actions",
                selector = raw_selector,
                error = %e,
                "plain click failed; escalating"
            );
            escalate_click(page, &locator, raw_selector).await
        }
    }
}

/// Overlay-bypass escalation for clicks that timed out or were intercepted.
///
/// Steps, stopping at the first that demonstrably worked: settle, scroll
/// into view, synthetic event dispatch, in-page `click()`. A URL
/// change is the success signal for the last two; buttons legitimately may
/// not change the URL, so they get the benefit of the doubt.
async fn escalate_click(page: &Page, locator: &Locator, raw_selector: &str) -> String {
    sleep(Duration::from_millis(500)).await;

    let first = locator.clone().first();
    let _ = first.scroll_into_view(ESCALATION_TIMEOUT).await;

    let url_before = page.url().await.unwrap_or_default();

    match first.dispatch_click(ESCALATION_TIMEOUT).await {
        Ok(()) => {
            sleep(Duration::from_millis(800)).await;
            let url_after = page.url().await.unwrap_or_default();
            if url_after != url_before {
                return format!(
                    "Clicked {raw_selector} via a synthetic event (an overlay was \
                     intercepting the pointer). Now on {url_after}."
                );
            }
        }
        Err(e) => {
            return format!(
                "Could not click {raw_selector}: {e}. Check the selector against the \
                 page snapshot, or read_page for a fresh view."
            );
        }
    }

    if first.js_click(ESCALATION_TIMEOUT).await.is_ok() {
        sleep(Duration::from_millis(800)).await;
        let url_after = page.url().await.unwrap_or_default();
        if url_after != url_before {
            return format!(
                "Clicked {raw_selector} via the element's own click() method. \
                 Now on {url_after}."
            );
        }
    }

    if raw_selector.to_lowercase().contains("button") {
        return format!(
            "Clicked {raw_selector} via a synthetic event. The URL did not change, \
             which is normal for in-page buttons; read_page to see the effect."
        );
    }

    format!(
        "Clicked {raw_selector} with every fallback, but the page did not change \
         (URL still {url_before}). The element may be inert or covered; try a \
         different selector or close any dialog first."
    )
}

pub async fn type_text(page: &Page, raw_selector: &str, text: &str) -> String {
    let locator = match selector::resolve(page, raw_selector) {
        Ok(l) => l,
        Err(e) => return e.to_string(),
    };

    match locator.fill(text, FILL_TIMEOUT).await {
        Ok(()) => format!("Typed \"{text}\" into {raw_selector}"),
        Err(DriverError::Ambiguous { count, .. }) => {
            match locator.clone().first().fill(text, FILL_TIMEOUT).await {
                Ok(()) => format!(
                    "Typed \"{text}\" into the FIRST of {count} matches for {raw_selector}. \
                     {FIRST_MATCH_TIP}"
                ),
                Err(e) => format!("Found {count} matches for {raw_selector} but typing failed: {e}"),
            }
        }
        Err(e) => {
            tracing::debug!(
                target: "agent.actions",
                selector = raw_selector,
                error = %e,
                "fill failed; falling back to keystrokes"
            );
            match locator
                .clone()
                .first()
                .type_slow(text, KEYSTROKE_DELAY, FILL_TIMEOUT)
                .await
            {
                Ok(()) => format!(
                    "Typed \"{text}\" into {raw_selector} using per-keystroke input \
                     (the field rejected a plain fill)."
                ),
                Err(e2) => format!(
                    "Could not type into {raw_selector}: fill failed ({e}), keystroke \
                     fallback failed ({e2}). Check the selector."
                ),
            }
        }
    }
}

pub async fn scroll(page: &Page, direction: &str) -> String {
    let dy = match direction {
        "down" => SCROLL_DELTA,
        "up" => -SCROLL_DELTA,
        other => {
            return format!("Unknown scroll direction '{other}'; use \"up\" or \"down\".");
        }
    };

    match page.scroll_by(dy).await {
        Ok(_) => {
            sleep(Duration::from_millis(500)).await;
            let y = page.scroll_by(0).await.unwrap_or(0.0);
            format!("Scrolled {direction}. Now at {}px from the top.", y.round())
        }
        Err(e) => format!("Scroll failed: {e}"),
    }
}

pub async fn go_back(page: &Page) -> String {
    let before = page.url().await.unwrap_or_default();
    if let Err(e) = page.go_back().await {
        return format!("go_back failed: {e}");
    }
    sleep(Duration::from_millis(500)).await;

    let after = page.url().await.unwrap_or_default();
    let title = page.title().await.unwrap_or_else(|_| "unknown".into());
    if after == before {
        format!(
            "go_back did NOT work - the URL did not change ({after}). The site \
             \"{title}\" likely uses client-side routing; use navigate with a \
             specific URL instead."
        )
    } else {
        format!("Went back to \"{title}\" ({after})")
    }
}

pub async fn select_option(page: &Page, raw_selector: &str, value: &str) -> String {
    let locator = match selector::resolve(page, raw_selector) {
        Ok(l) => l,
        Err(e) => return e.to_string(),
    };

    match locator.select_option(value, FILL_TIMEOUT).await {
        Ok(()) => format!("Selected \"{value}\" in {raw_selector}"),
        Err(DriverError::Ambiguous { count, .. }) => {
            match locator
                .clone()
                .first()
                .select_option(value, FILL_TIMEOUT)
                .await
            {
                Ok(()) => format!(
                    "Selected \"{value}\" in the FIRST of {count} matches for {raw_selector}."
                ),
                Err(e) => format!("Could not select \"{value}\" in {raw_selector}: {e}"),
            }
        }
        Err(e) => format!("Could not select \"{value}\" in {raw_selector}: {e}"),
    }
}

pub async fn press_key(page: &Page, key: &str) -> String {
    match page.press_key(key).await {
        Ok(true) => {
            sleep(Duration::from_millis(500)).await;
            format!("Pressed {key}")
        }
        Ok(false) => format!(
            "Key '{key}' is not supported. Use a single character or one of: Enter, \
             Tab, Escape, Backspace, Delete, Space, Arrow keys, Home, End, PageUp, PageDown."
        ),
        Err(e) => format!("Could not press {key}: {e}"),
    }
}

pub async fn hover(page: &Page, raw_selector: &str) -> String {
    let locator = match selector::resolve(page, raw_selector) {
        Ok(l) => l,
        Err(e) => return e.to_string(),
    };

    match locator.hover(FILL_TIMEOUT).await {
        Ok(()) => format!("Hovering over {raw_selector}"),
        Err(DriverError::Ambiguous { count, .. }) => {
            match locator.clone().first().hover(FILL_TIMEOUT).await {
                Ok(()) => format!(
                    "Hovering over the FIRST match of {count} elements for {raw_selector}. \
                     {FIRST_MATCH_TIP}"
                ),
                Err(e) => format!("Found {count} matches for {raw_selector} but hover failed: {e}"),
            }
        }
        Err(e) => format!("Could not hover over {raw_selector}: {e}"),
    }
}

pub async fn wait(ms: u64) -> String {
    let clamped = clamp_wait(ms);
    sleep(Duration::from_millis(clamped)).await;
    if clamped < ms {
        format!("Waited {clamped}ms (requested {ms}ms; waits are capped at {MAX_WAIT_MS}ms)")
    } else {
        format!("Waited {clamped}ms")
    }
}

pub async fn screenshot(page: &Page) -> String {
    match page.screenshot().await {
        Ok(png) => format!(
            "Captured a screenshot ({} KB). Screenshots are saved for the user; \
             use read_page to inspect content yourself.",
            png.len() / 1024
        ),
        Err(e) => format!("Screenshot failed: {e}"),
    }
}
