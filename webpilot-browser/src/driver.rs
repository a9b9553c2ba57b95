//! Session launch and page/tab bookkeeping.

use crate::launch::{build_launch_arguments, session_profile, VIEWPORT};
use crate::page::Page;
use crate::{DriverError, DriverResult};
use anyhow::Context;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::path::PathBuf;

/// Knobs for one browser session.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Chromedriver endpoint.
    pub webdriver_url: String,
    /// Profile directory persisted across runs (cookies, local storage).
    pub user_data_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            user_data_dir: PathBuf::from(".webpilot-profile"),
        }
    }
}

/// Owns the WebDriver session and tracks its tabs.
///
/// Only one agent runs per process, so there is no locking; the manager is
/// the process-wide owner of the browser context. Pages are transient
/// references and must be refetched after every action.
pub struct BrowserManager {
    client: Client,
}

impl BrowserManager {
    /// Launch a headed session with the persistent profile and
    /// anti-automation launch flags applied.
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let profile = session_profile();
        let user_data_dir = absolute(&config.user_data_dir);
        let args = build_launch_arguments(&profile, &user_data_dir);

        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": args, "excludeSwitches": ["enable-automation"] }),
        );

        tracing::info!(
            target: "browser.session",
            webdriver_url = %config.webdriver_url,
            profile_dir = %user_data_dir.display(),
            viewport = ?VIEWPORT,
            "launching browser"
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .with_context(|| {
                format!(
                    "failed to connect to chromedriver at {} (is it running?)",
                    config.webdriver_url
                )
            })?;

        client
            .set_window_size(VIEWPORT.0, VIEWPORT.1)
            .await
            .context("failed to size the browser window")?;

        Ok(Self { client })
    }

    /// All currently open tabs, oldest first.
    pub async fn pages(&self) -> DriverResult<Vec<Page>> {
        let handles = self.client.windows().await?;
        Ok(handles
            .into_iter()
            .map(|h| Page::new(self.client.clone(), h))
            .collect())
    }

    /// The most-recently-opened tab that is still alive, focused and ready
    /// for use. [`DriverError::Closed`] when the user closed everything.
    pub async fn active_page(&self) -> DriverResult<Page> {
        let handles = self.client.windows().await?;
        let Some(handle) = handles.last().cloned() else {
            return Err(DriverError::Closed);
        };
        self.client.switch_to_window(handle.clone()).await?;
        Ok(Page::new(self.client.clone(), handle))
    }

    /// Close every tab except the newest. Returns how many were closed.
    pub async fn close_extra_tabs(&self) -> DriverResult<usize> {
        let handles = self.client.windows().await?;
        if handles.len() <= 1 {
            return Ok(0);
        }

        let keep = handles.last().cloned();
        let mut closed = 0usize;
        for handle in &handles[..handles.len() - 1] {
            self.client.switch_to_window(handle.clone()).await?;
            self.client.close_window().await?;
            closed += 1;
        }
        if let Some(keep) = keep {
            self.client.switch_to_window(keep).await?;
        }

        if closed > 0 {
            tracing::debug!(target: "browser.session", closed, "closed extra tabs");
        }
        Ok(closed)
    }

    /// Open a fresh tab and focus it.
    pub async fn new_page(&self) -> DriverResult<Page> {
        let created = self.client.new_window(true).await?;
        self.client.switch_to_window(created.handle.clone()).await?;
        Ok(Page::new(self.client.clone(), created.handle))
    }

    /// Tear the whole session down.
    pub async fn close(self) -> DriverResult<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn absolute(path: &PathBuf) -> PathBuf {
    if path.is_absolute() {
        path.clone()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.clone())
    }
}
