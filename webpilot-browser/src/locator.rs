//! Lazily-evaluated element handles with strict-mode resolution.

use crate::query::{CompiledQuery, ElementQuery};
use crate::{DriverError, DriverResult};
use fantoccini::elements::Element;
use fantoccini::{Client, Locator as WdLocator};
use std::time::{Duration, Instant};
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A lazy reference to zero, one, or many DOM elements.
///
/// Nothing touches the DOM until an operation runs. Resolution is strict by
/// default: more than one match is a [`DriverError::Ambiguous`]; call
/// [`Locator::first`] to opt out.
#[derive(Clone)]
pub struct Locator {
    client: Client,
    scope: Option<ElementQuery>,
    query: ElementQuery,
    first_only: bool,
}

impl Locator {
    pub(crate) fn new(client: Client, query: ElementQuery) -> Self {
        Self {
            client,
            scope: None,
            query,
            first_only: false,
        }
    }

    pub(crate) fn scoped(client: Client, scope: ElementQuery, query: ElementQuery) -> Self {
        Self {
            client,
            scope: Some(scope),
            query,
            first_only: false,
        }
    }

    /// Give up strictness: operate on the first match.
    pub fn first(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// Human-readable description used in error messages and logs.
    pub fn describe(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{scope} >> {}", self.query),
            None => self.query.to_string(),
        }
    }

    async fn find_candidates(&self) -> DriverResult<Vec<Element>> {
        match &self.scope {
            None => find_all(&self.client, &self.query.compile(false)).await,
            Some(scope) => {
                let parents = find_all(&self.client, &scope.compile(false)).await?;
                let Some(parent) = parents.into_iter().next() else {
                    return Ok(Vec::new());
                };
                find_all_within(&parent, &self.query.compile(true)).await
            }
        }
    }

    /// Resolve to exactly one element within `timeout`.
    ///
    /// Polls until a match appears; an ambiguous match fails immediately
    /// (waiting will not make extra elements disappear).
    pub async fn resolve(&self, timeout: Duration) -> DriverResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            let candidates = self.find_candidates().await?;
            match candidates.len() {
                1 => return Ok(candidates.into_iter().next().unwrap()),
                0 => {}
                n if self.first_only => {
                    tracing::debug!(
                        target: "browser.locator",
                        query = %self.describe(),
                        matches = n,
                        "resolving to first of many"
                    );
                    return Ok(candidates.into_iter().next().unwrap());
                }
                n => {
                    return Err(DriverError::Ambiguous {
                        query: self.describe(),
                        count: n,
                    })
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout, self.describe()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// How many elements currently match.
    pub async fn count(&self) -> DriverResult<usize> {
        Ok(self.find_candidates().await?.len())
    }

    pub async fn click(&self, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        el.click().await?;
        Ok(())
    }

    /// Clear the element and type `text` into it.
    pub async fn fill(&self, text: &str, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        el.clear().await?;
        el.send_keys(text).await?;
        Ok(())
    }

    /// Click the element, then type character by character with a fixed
    /// inter-keystroke delay. Fallback path for inputs that reject `fill`.
    pub async fn type_slow(&self, text: &str, delay: Duration, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        el.click().await?;
        for ch in text.chars() {
            el.send_keys(&ch.to_string()).await?;
            sleep(delay).await;
        }
        Ok(())
    }

    /// Move the real pointer onto the element.
    pub async fn hover(&self, timeout: Duration) -> DriverResult<()> {
        use fantoccini::actions::{InputSource, MouseActions, PointerAction};

        let el = self.resolve(timeout).await?;
        let actions = MouseActions::new("mouse".to_string()).then(PointerAction::MoveToElement {
            element: el,
            duration: Some(Duration::from_millis(150)),
            x: 0,
            y: 0,
        });
        self.client.perform_actions(actions).await?;
        let _ = self.client.release_actions().await;
        Ok(())
    }

    /// Choose a `<select>` option by value or visible label (exact label
    /// first, then a value substring). Runs in-page so the change event
    /// fires the way site scripts expect.
    pub async fn select_option(&self, value: &str, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        let selected = self
            .client
            .execute(SELECT_OPTION_JS, vec![element_arg(&el)?, value.into()])
            .await?;
        if selected.as_bool() == Some(true) {
            return Ok(());
        }
        Err(DriverError::Other(format!(
            "no option with value or label '{value}' in {}",
            self.describe()
        )))
    }

    pub async fn scroll_into_view(&self, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        self.client
            .execute(
                "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
                vec![element_arg(&el)?],
            )
            .await?;
        Ok(())
    }

    /// Dispatch a synthetic click event directly on the element, bypassing
    /// actionability checks and pointer-intercepting overlays.
    pub async fn dispatch_click(&self, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        self.client
            .execute(
                "arguments[0].dispatchEvent(new MouseEvent('click', \
                 {bubbles: true, cancelable: true, view: window}));",
                vec![element_arg(&el)?],
            )
            .await?;
        Ok(())
    }

    /// Invoke the element's own `click()` method in-page.
    pub async fn js_click(&self, timeout: Duration) -> DriverResult<()> {
        let el = self.resolve(timeout).await?;
        self.client
            .execute("arguments[0].click();", vec![element_arg(&el)?])
            .await?;
        Ok(())
    }

    /// Visible text of the resolved element.
    pub async fn text(&self, timeout: Duration) -> DriverResult<String> {
        let el = self.resolve(timeout).await?;
        Ok(el.text().await?)
    }
}

/// Elements serialise to their W3C reference so they can be passed back
/// into `execute` as `arguments[n]`.
fn element_arg(el: &Element) -> DriverResult<serde_json::Value> {
    serde_json::to_value(el).map_err(|e| DriverError::Other(format!("element ref: {e}")))
}

async fn find_all(client: &Client, compiled: &CompiledQuery) -> DriverResult<Vec<Element>> {
    let found = match compiled {
        CompiledQuery::Css(css) => client.find_all(WdLocator::Css(css.as_str())).await?,
        CompiledQuery::XPath(xp) => client.find_all(WdLocator::XPath(xp.as_str())).await?,
    };
    Ok(found)
}

async fn find_all_within(parent: &Element, compiled: &CompiledQuery) -> DriverResult<Vec<Element>> {
    let found = match compiled {
        CompiledQuery::Css(css) => parent.find_all(WdLocator::Css(css.as_str())).await?,
        CompiledQuery::XPath(xp) => parent.find_all(WdLocator::XPath(xp.as_str())).await?,
    };
    Ok(found)
}

const SELECT_OPTION_JS: &str = r#"
    const select = arguments[0];
    const wanted = arguments[1];
    const commit = (option) => {
        select.value = option.value;
        select.dispatchEvent(new Event('input', {bubbles: true}));
        select.dispatchEvent(new Event('change', {bubbles: true}));
        return true;
    };
    const options = Array.from(select.options || []);
    for (const option of options) {
        if (option.value === wanted) return commit(option);
    }
    for (const option of options) {
        if (option.label.trim() === wanted || option.textContent.trim() === wanted) {
            return commit(option);
        }
    }
    for (const option of options) {
        if (option.value.includes(wanted)) return commit(option);
    }
    return false;
"#;
