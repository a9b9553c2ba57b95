//! Common types and utilities shared across webpilot crates.
//!
//! This crate defines the shared error type, the workspace-wide [`Result`]
//! alias, and centralised observability helpers. It is intentionally
//! lightweight so that every crate can depend on it without pulling in heavy
//! transitive costs.
//!
//! # Overview
//!
//! - [`WebpilotError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
use thiserror::Error;

pub mod observability;

/// Error types used across the webpilot system.
///
/// Most of the system deliberately does not use these: everything below the
/// agent loop narrates failures into plain strings for the model. These
/// variants cover the paths that still propagate, i.e. startup,
/// configuration, and the LLM transport.
///
/// ```
/// use webpilot_common::WebpilotError;
///
/// let throttled = WebpilotError::Llm("429 from provider".into());
/// assert_eq!(throttled.to_string(), "llm provider: 429 from provider");
///
/// let bad_key = WebpilotError::Config("GLM_API_KEY missing".into());
/// assert!(bad_key.to_string().contains("GLM_API_KEY"));
/// ```
#[derive(Debug, Error)]
pub enum WebpilotError {
    /// The agent loop failed to complete a requested operation.
    #[error("agent loop failed: {0}")]
    Agent(String),

    /// The browser driver reported an error.
    #[error("browser driver: {0}")]
    Driver(#[from] anyhow::Error),

    /// The LLM transport or provider reported an error.
    #[error("llm provider: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("operation timed out")]
    Timeout,
}

/// Convenient alias for results that use [`WebpilotError`].
///
/// Driver-side `anyhow` errors lift into [`WebpilotError::Driver`] through
/// `From`, so `?` works across the crate boundary:
///
/// ```
/// use webpilot_common::{Result, WebpilotError};
///
/// fn open_profile(dir: &str) -> Result<&str> {
///     if dir.is_empty() {
///         return Err(anyhow::anyhow!("profile directory not set").into());
///     }
///     Ok(dir)
/// }
///
/// assert!(matches!(open_profile(""), Err(WebpilotError::Driver(_))));
/// assert_eq!(open_profile(".webpilot-profile").unwrap(), ".webpilot-profile");
/// ```
pub type Result<T> = std::result::Result<T, WebpilotError>;
