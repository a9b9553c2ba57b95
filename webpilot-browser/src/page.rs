//! One open tab: navigation, scripts, keyboard, snapshots, locators.

use crate::launch::WEBDRIVER_EVASIONS;
use crate::locator::Locator;
use crate::query::ElementQuery;
use crate::{DriverError, DriverResult};
use fantoccini::key::Key;
use fantoccini::wd::WindowHandle;
use fantoccini::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// A handle to one browser tab.
///
/// The manager keeps the WebDriver session focused on the page it handed
/// out; methods here assume that focus. Pages can be closed or replaced by
/// site-initiated navigation at any time, so callers refetch from the
/// manager after every action.
#[derive(Clone)]
pub struct Page {
    client: Client,
    handle: WindowHandle,
}

impl Page {
    pub(crate) fn new(client: Client, handle: WindowHandle) -> Self {
        Self { client, handle }
    }

    pub fn handle(&self) -> &WindowHandle {
        &self.handle
    }

    /// Whether this tab's window handle still exists.
    pub async fn is_closed(&self) -> bool {
        match self.client.windows().await {
            Ok(handles) => !handles.contains(&self.handle),
            Err(_) => true,
        }
    }

    /// Navigate with a hard ceiling, then re-apply automation evasions.
    pub async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(done) => done?,
            Err(_) => return Err(DriverError::Timeout(timeout, format!("navigation to {url}"))),
        }
        // Best effort; a hardened page rejecting the script is not fatal.
        let _ = self.client.execute(WEBDRIVER_EVASIONS, vec![]).await;
        Ok(())
    }

    pub async fn title(&self) -> DriverResult<String> {
        Ok(self.client.title().await?)
    }

    pub async fn url(&self) -> DriverResult<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    pub async fn go_back(&self) -> DriverResult<()> {
        self.client.back().await?;
        Ok(())
    }

    /// Poll `document.readyState` until the DOM is usable.
    pub async fn wait_for_ready(&self, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout, "document ready".into()));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// Run a script in the page and return its JSON result.
    pub async fn evaluate(&self, script: &str) -> DriverResult<Value> {
        Ok(self.client.execute(script, vec![]).await?)
    }

    /// Capture a PNG of the current viewport.
    pub async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        Ok(self.client.screenshot().await?)
    }

    /// Send one named key to the focused element. Returns `false` for names
    /// this driver cannot express.
    pub async fn press_key(&self, key: &str) -> DriverResult<bool> {
        let Some(sequence) = webdriver_key(key) else {
            return Ok(false);
        };
        let active = self.client.active_element().await?;
        active.send_keys(&sequence).await?;
        Ok(true)
    }

    /// Type into the focused element character by character.
    pub async fn type_text(&self, text: &str, delay: Duration) -> DriverResult<()> {
        let active = self.client.active_element().await?;
        for ch in text.chars() {
            active.send_keys(&ch.to_string()).await?;
            sleep(delay).await;
        }
        Ok(())
    }

    /// Scroll the window by `dy` pixels and report the resulting
    /// `window.scrollY`.
    pub async fn scroll_by(&self, dy: i64) -> DriverResult<f64> {
        let result = self
            .client
            .execute(
                &format!("window.scrollBy(0, {dy}); return window.scrollY;"),
                vec![],
            )
            .await?;
        Ok(result.as_f64().unwrap_or(0.0))
    }

    /// One-line scroll description for the observation header.
    pub async fn scroll_info(&self) -> DriverResult<String> {
        let result = self
            .client
            .execute(
                "return 'Scroll position: ' + Math.round(window.scrollY) + 'px of ' + \
                 Math.max(document.body ? document.body.scrollHeight : 0, \
                 document.documentElement.scrollHeight) + 'px';",
                vec![],
            )
            .await?;
        Ok(result.as_str().unwrap_or("Scroll: unknown").to_string())
    }

    /// Serialise the page as an indented role/name tree.
    pub async fn aria_snapshot(&self) -> DriverResult<String> {
        let result = self.client.execute(ARIA_SNAPSHOT_JS, vec![]).await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    // ---- locator construction ----

    pub fn locator(&self, query: ElementQuery) -> Locator {
        Locator::new(self.client.clone(), query)
    }

    /// Locator for `child` scoped inside the first match of `parent`.
    pub fn nested_locator(&self, parent: ElementQuery, child: ElementQuery) -> Locator {
        Locator::scoped(self.client.clone(), parent, child)
    }

    pub fn get_by_role(&self, role: &str, name: Option<&str>) -> Locator {
        self.locator(ElementQuery::Role {
            role: role.to_string(),
            name: name.map(str::to_string),
        })
    }

    pub fn get_by_text(&self, needle: &str, exact: bool) -> Locator {
        self.locator(ElementQuery::Text {
            needle: needle.to_string(),
            exact,
        })
    }

    pub fn get_by_label(&self, needle: &str) -> Locator {
        self.locator(ElementQuery::Label {
            needle: needle.to_string(),
        })
    }

    pub fn get_by_placeholder(&self, needle: &str) -> Locator {
        self.locator(ElementQuery::Placeholder {
            needle: needle.to_string(),
        })
    }

    pub fn css(&self, selector: &str) -> Locator {
        self.locator(ElementQuery::Css {
            selector: selector.to_string(),
        })
    }
}

/// Map the common key names onto WebDriver key codepoints; a single
/// character is sent literally.
// FIXME(chords): modifier combinations (Control+A) need the actions API
// with explicit key-down/key-up pairs; plain send_keys cannot express them.
fn webdriver_key(key: &str) -> Option<String> {
    let sequence = match key.trim().to_ascii_lowercase().as_str() {
        "enter" => Key::Enter.to_string(),
        "return" => Key::Return.to_string(),
        "tab" => Key::Tab.to_string(),
        "escape" | "esc" => Key::Escape.to_string(),
        "backspace" => Key::Backspace.to_string(),
        "delete" => Key::Delete.to_string(),
        "space" => Key::Space.to_string(),
        "arrowup" | "up" => Key::Up.to_string(),
        "arrowdown" | "down" => Key::Down.to_string(),
        "arrowleft" | "left" => Key::Left.to_string(),
        "arrowright" | "right" => Key::Right.to_string(),
        "home" => Key::Home.to_string(),
        "end" => Key::End.to_string(),
        "pageup" => Key::PageUp.to_string(),
        "pagedown" => Key::PageDown.to_string(),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c.to_string(),
                _ => return None,
            }
        }
    };
    Some(sequence)
}

/// In-page computation of the accessibility tree: nested ARIA roles and
/// accessible names as indented `- role "name"` lines. Chromedriver has no
/// snapshot endpoint, so the serialisation runs in the page itself.
const ARIA_SNAPSHOT_JS: &str = r#"
    const MAX_NAME = 100;
    const SKIP = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'META', 'LINK', 'HEAD']);
    const IMPLICIT = {
        A: 'link', BUTTON: 'button', NAV: 'navigation', MAIN: 'main',
        HEADER: 'banner', FOOTER: 'contentinfo', ASIDE: 'complementary',
        FORM: 'form', ARTICLE: 'article', SECTION: 'region', DIALOG: 'dialog',
        H1: 'heading', H2: 'heading', H3: 'heading', H4: 'heading',
        H5: 'heading', H6: 'heading', IMG: 'img', UL: 'list', OL: 'list',
        LI: 'listitem', TABLE: 'table', TR: 'row', TD: 'cell',
        TH: 'columnheader', TEXTAREA: 'textbox', SELECT: 'combobox',
        OPTION: 'option', HR: 'separator', P: 'paragraph'
    };
    const INPUT_ROLES = {
        button: 'button', submit: 'button', reset: 'button',
        checkbox: 'checkbox', radio: 'radio', range: 'slider',
        search: 'searchbox'
    };

    function roleOf(el) {
        const explicit = el.getAttribute('role');
        if (explicit) return explicit.split(/\s+/)[0];
        if (el.tagName === 'A' && !el.hasAttribute('href')) return '';
        if (el.tagName === 'INPUT') {
            const type = (el.getAttribute('type') || 'text').toLowerCase();
            if (type === 'hidden') return '';
            return INPUT_ROLES[type] || 'textbox';
        }
        return IMPLICIT[el.tagName] || '';
    }

    function nameOf(el) {
        let name = el.getAttribute('aria-label')
            || el.getAttribute('alt')
            || el.getAttribute('placeholder')
            || '';
        if (!name) {
            const text = (el.innerText || el.value || '').trim().replace(/\s+/g, ' ');
            if (text) name = text;
        }
        if (name.length > MAX_NAME) name = name.slice(0, MAX_NAME) + '…';
        return name;
    }

    function hidden(el) {
        if (el.getAttribute('aria-hidden') === 'true') return true;
        const style = window.getComputedStyle(el);
        return style.display === 'none' || style.visibility === 'hidden';
    }

    const lines = [];
    function walk(el, depth) {
        if (SKIP.has(el.tagName) || hidden(el)) return;
        const role = roleOf(el);
        let childDepth = depth;
        if (role) {
            const name = nameOf(el);
            const indent = '  '.repeat(depth);
            lines.push(name ? indent + '- ' + role + ' "' + name + '"' : indent + '- ' + role);
            // Leaf-ish roles carry their name; recursing would repeat it.
            if (!el.children.length || ['button', 'link', 'heading', 'option', 'textbox'].includes(role)) {
                return;
            }
            childDepth = depth + 1;
        }
        for (const child of el.children) walk(child, childDepth);
    }

    if (document.body) walk(document.body, 0);
    return lines.join('\n');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_names_map_to_codepoints() {
        assert_eq!(webdriver_key("Enter"), Some(Key::Enter.to_string()));
        assert_eq!(webdriver_key("ArrowDown"), Some(Key::Down.to_string()));
        assert_eq!(webdriver_key(" escape "), Some(Key::Escape.to_string()));
    }

    #[test]
    fn single_characters_pass_through() {
        assert_eq!(webdriver_key("a"), Some("a".to_string()));
    }

    #[test]
    fn unknown_chords_are_rejected() {
        assert_eq!(webdriver_key("Control+Shift+K"), None);
    }
}
