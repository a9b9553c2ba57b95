//! The webpilot orchestration engine.
//!
//! An LLM decides, the browser acts, and this crate wires the loop between
//! them: page observations compressed into a token budget, loose selectors
//! resolved into locators, a conversation window that never orphans a tool
//! result, and guards against destructive actions and degenerate loops.
//!
//! - [`selector`]: model-authored selector strings → locators
//! - [`actions`]: single-step browser operations, failures narrated
//! - [`extractor`]: accessibility-tree observations under a budget
//! - [`guard`]: destructive-action confirmation
//! - [`context`]: budgeted sliding-window conversation log
//! - [`stuck`]: URL-aware loop detection
//! - [`agent`]: the observe → think → act loop itself

pub mod actions;
pub mod agent;
pub mod context;
pub mod extractor;
pub mod guard;
pub mod prompt;
pub mod selector;
pub mod stuck;
pub mod surface;
pub mod tools;

pub use agent::{Agent, AgentConfig};
pub use guard::UserPrompt;
pub use surface::{BrowserSurface, TaskSurface};
