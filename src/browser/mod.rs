//! Browser automation boundary.
//!
//! The agent core never touches a real browser: it sees an opaque page
//! object behind the `Page` trait, and element lookups behind `Locator`.
//! Locators are lazy selector descriptions (Playwright-style): `scoped`
//! and `nth` compose without touching the DOM, and resolution happens at
//! action time. The CDP-backed implementation lives in `cdp`, the stealth
//! device persona in `fingerprint`, and the session lifecycle (plus its
//! tool-class adapter) in `manager`.

pub mod cdp;
pub mod fingerprint;
pub mod manager;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::toolgen::{InstanceArena, ToolError};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector `{selector}` failed: {reason}")]
    Selector { selector: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("timed out waiting for `{0}`")]
    WaitTimeout(String),

    #[error("browser session is not running")]
    NotRunning,
}

/// How long `navigate` should wait before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Return once the main document has loaded.
    #[default]
    Load,
    /// Also wait for in-flight network activity to settle.
    NetworkIdle,
}

/// The page-like capability surface tools program against.
#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<(), BrowserError>;

    /// Builds a lazy locator for a CSS selector. A trailing
    /// `:has-text("...")` pseudo-class filters matches by visible text.
    fn locate(&self, selector: &str) -> Box<dyn Locator>;

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;
}

/// A lazy handle to the elements matching a selector chain.
#[async_trait]
pub trait Locator: Send + Sync {
    /// Number of currently matching elements.
    async fn count(&self) -> Result<usize, BrowserError>;

    /// Waits until at least one element matches.
    async fn wait(&self) -> Result<(), BrowserError>;

    /// Clicks the first matching element.
    async fn click(&self) -> Result<(), BrowserError>;

    /// Focuses the first matching element and types into it.
    async fn fill(&self, text: &str) -> Result<(), BrowserError>;

    /// Reads an attribute off the first matching element.
    async fn get_attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    /// Narrows to the n-th match (0-based).
    fn nth(&self, index: usize) -> Box<dyn Locator>;

    /// Descends into matches with a further selector.
    fn scoped(&self, selector: &str) -> Box<dyn Locator>;
}

/// Shared reference to a live page, as stored behind instance handles.
pub type PageRef = Arc<dyn Page>;

/// Resolves a page instance handle from the arena.
///
/// Pages are stored as `PageRef` clones, so resolution leaves the arena
/// entry in place; a handle pointing at anything else (or nothing) is an
/// `InvalidInstanceHandle`.
pub async fn page_from_handle(arena: &InstanceArena, handle: &str) -> Result<PageRef, ToolError> {
    let boxed = arena.checkout(handle).await?;
    let page = boxed.downcast_ref::<PageRef>().cloned();
    arena.checkin(handle, boxed).await;
    page.ok_or_else(|| ToolError::InvalidInstanceHandle {
        handle: handle.to_string(),
        expected: "BrowserPage".to_string(),
        reason: "handle does not refer to a browser page".to_string(),
    })
}
