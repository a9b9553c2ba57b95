//! Token-budgeted page observations.
//!
//! Every I/O step runs under a soft timeout that substitutes a fallback
//! value instead of failing: the agent would rather reason over "Loading…"
//! than crash an iteration. The accessibility tree is the primary payload,
//! one to two orders of magnitude smaller than raw HTML, and phrased in the
//! same role/name vocabulary the selector resolver expects the model to
//! emit.

use std::time::Duration;
use tokio::time::timeout;
use webpilot_browser::Page;

/// Marker appended when the tree had to be cut.
pub const TRUNCATION_SENTINEL: &str = "[… content truncated due to length …]";

/// Tree body used when both extraction paths came back empty.
pub const UNAVAILABLE: &str = "[Page content unavailable]";

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const TITLE_TIMEOUT: Duration = Duration::from_secs(5);
const SCROLL_TIMEOUT: Duration = Duration::from_secs(5);
const TREE_TIMEOUT: Duration = Duration::from_secs(10);
const TREE_OUTER_GUARD: Duration = Duration::from_secs(15);

/// Produce the bounded observation text for `page`.
pub async fn extract(page: &Page, token_budget: usize) -> String {
    // Give dynamic content a chance, but never block the iteration on it.
    let _ = timeout(READY_TIMEOUT, page.wait_for_ready(READY_TIMEOUT)).await;

    let title = match timeout(TITLE_TIMEOUT, page.title()).await {
        Ok(Ok(t)) if !t.is_empty() => t,
        _ => "Loading…".to_string(),
    };
    let url = match timeout(TITLE_TIMEOUT, page.url()).await {
        Ok(Ok(u)) => u,
        _ => "unknown".to_string(),
    };
    let scroll = match timeout(SCROLL_TIMEOUT, page.scroll_info()).await {
        Ok(Ok(s)) => s,
        _ => "Scroll: unknown".to_string(),
    };

    let tree = match timeout(TREE_OUTER_GUARD, snapshot_tree(page)).await {
        Ok(tree) => tree,
        Err(_) => String::new(),
    };
    let tree = if tree.trim().is_empty() {
        UNAVAILABLE.to_string()
    } else {
        tree
    };

    compose_snapshot(&title, &url, &scroll, &tree, token_budget)
}

/// Primary: the driver's role/name serialisation. Fallback: a depth-limited
/// in-page walk that lists every visible element with its attributes.
async fn snapshot_tree(page: &Page) -> String {
    if let Ok(Ok(primary)) = timeout(TREE_TIMEOUT, page.aria_snapshot()).await {
        if !primary.trim().is_empty() {
            return primary;
        }
    }
    tracing::debug!(target: "agent.extractor", "aria snapshot empty; using fallback walk");

    match timeout(TREE_TIMEOUT, page.evaluate(FALLBACK_WALK_JS)).await {
        Ok(Ok(value)) => value.as_str().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

/// Assemble the final observation, keeping it within `token_budget × 4`
/// characters by cutting the tree at the last complete line.
pub fn compose_snapshot(
    title: &str,
    url: &str,
    scroll: &str,
    tree: &str,
    token_budget: usize,
) -> String {
    let limit = token_budget * 4;
    let header = format!("Page: {title}\nURL: {url}\n{scroll}\n\nAccessibility Tree:\n");
    let body = truncate_at_line(tree, limit.saturating_sub(header.len()));
    format!("{header}{body}")
}

/// Cut `text` to at most `max` bytes, ending on the last newline before the
/// cut and appending the sentinel.
fn truncate_at_line(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }

    let reserved = TRUNCATION_SENTINEL.len() + 1;
    let mut keep = max.saturating_sub(reserved);
    while keep > 0 && !text.is_char_boundary(keep) {
        keep -= 1;
    }

    match text[..keep].rfind('\n') {
        Some(idx) => format!("{}\n{}", &text[..idx], TRUNCATION_SENTINEL),
        None => TRUNCATION_SENTINEL.to_string(),
    }
}

/// Depth-limited DOM walk used when the role/name serialisation yields
/// nothing (canvas-heavy pages, exotic shadow DOM). One line per visible
/// element: role or tag, label, and the attributes the model acts on.
const FALLBACK_WALK_JS: &str = r#"
    const MAX_DEPTH = 6;
    const MAX_LABEL = 80;
    const SKIP = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'HEAD', 'META', 'LINK']);
    const lines = [];

    function hidden(el) {
        const style = window.getComputedStyle(el);
        return style.display === 'none' || style.visibility === 'hidden';
    }

    function labelOf(el) {
        let label = el.getAttribute('aria-label')
            || el.getAttribute('alt')
            || '';
        if (!label) {
            const text = (el.innerText || el.value || '').trim().replace(/\s+/g, ' ');
            label = text;
        }
        return label.length > MAX_LABEL ? label.slice(0, MAX_LABEL) + '…' : label;
    }

    function isClickable(el) {
        const tag = el.tagName.toLowerCase();
        return tag === 'a' || tag === 'button' || tag === 'select'
            || (tag === 'input' && el.getAttribute('type') !== 'hidden')
            || el.hasAttribute('onclick')
            || el.getAttribute('role') === 'button'
            || el.hasAttribute('tabindex');
    }

    function walk(el, depth) {
        if (depth > MAX_DEPTH || SKIP.has(el.tagName) || hidden(el)) return;

        const role = el.getAttribute('role') || el.tagName.toLowerCase();
        let line = '  '.repeat(depth) + '- ' + role + ' "' + labelOf(el) + '"';
        for (const attr of ['href', 'type', 'placeholder']) {
            const value = el.getAttribute(attr);
            if (value) line += ' [' + attr + '=' + value + ']';
        }
        if (isClickable(el)) line += ' [clickable]';
        lines.push(line);

        for (const child of el.children) walk(child, depth + 1);
    }

    if (document.body) walk(document.body, 0);
    return lines.join('\n');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_carries_header_and_tree() {
        let s = compose_snapshot(
            "Inbox",
            "https://mail.example/inbox",
            "Scroll position: 0px of 2400px",
            "- banner\n  - link \"Mail\"",
            6000,
        );
        assert!(s.starts_with("Page: Inbox\nURL: https://mail.example/inbox\n"));
        assert!(s.contains("\n\nAccessibility Tree:\n- banner\n"));
    }

    #[test]
    fn snapshot_respects_the_character_budget() {
        let tree: String = (0..2000)
            .map(|i| format!("- listitem \"row {i}\"\n"))
            .collect();
        let budget = 100;
        let s = compose_snapshot("T", "https://x", "Scroll: unknown", &tree, budget);

        assert!(s.len() <= budget * 4);
        assert!(s.ends_with(TRUNCATION_SENTINEL));
        // The character before the sentinel is a line boundary.
        let before = s.len() - TRUNCATION_SENTINEL.len();
        assert_eq!(&s[before - 1..before], "\n");
        // No half line survived the cut.
        let last_full = s[..before - 1].lines().last().unwrap();
        assert!(last_full.starts_with("- listitem \"row "));
        assert!(last_full.ends_with('"'));
    }

    #[test]
    fn small_trees_are_untouched() {
        let s = compose_snapshot("T", "https://x", "Scroll: unknown", "- main \"hi\"", 6000);
        assert!(!s.contains(TRUNCATION_SENTINEL));
        assert!(s.ends_with("- main \"hi\""));
    }

    #[test]
    fn truncation_lands_on_char_boundaries() {
        // Multi-byte content near the cut must not split a code point.
        let tree: String = (0..200).map(|i| format!("- кнопка \"Ряд {i}\"\n")).collect();
        let s = truncate_at_line(&tree, 300);
        assert!(s.ends_with(TRUNCATION_SENTINEL));
        assert!(s.len() <= 300);
    }
}
