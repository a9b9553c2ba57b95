//! Browser driver layer for webpilot.
//!
//! Wraps a headed chromedriver session behind page/tab tracking and lazily
//! evaluated element locators.
//!
//! - [`driver::BrowserManager`]: session launch, page/tab bookkeeping
//! - [`page::Page`]: navigation, script evaluation, keyboard, snapshots
//! - [`locator::Locator`]: lazy element handle with strict-mode resolution
//! - [`query::ElementQuery`]: role/text/label/placeholder/CSS queries
//! - [`launch`]: launch arguments and automation-signal evasions
use std::time::Duration;

use thiserror::Error;

pub mod driver;
pub mod launch;
pub mod locator;
pub mod page;
pub mod query;

pub use driver::{BrowserConfig, BrowserManager};
pub use locator::Locator;
pub use page::Page;
pub use query::ElementQuery;

/// Failure modes of locator resolution and page operations.
///
/// The distinction between [`DriverError::Ambiguous`] and
/// [`DriverError::Timeout`] is load-bearing: the action layer retries an
/// ambiguous match with the first element and runs the overlay-bypass
/// escalation on a timeout.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No element matched within the allotted time.
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    /// Strict-mode violation: a locator expected to match one element
    /// matched several.
    #[error("{count} elements matched {query}; expected exactly one")]
    Ambiguous { query: String, count: usize },

    /// The page (window handle) or the whole browser is gone.
    #[error("page or browser window is closed")]
    Closed,

    /// The underlying WebDriver command failed.
    #[error("webdriver error: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("{0}")]
    Other(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;
