//! Browser automation capability.
//!
//! The suite only depends on a handful of verbs (navigate, click, fill, read
//! text, visibility, wait, screenshot). [`PageDriver`] captures those verbs;
//! [`SessionBackend`] adds the staged startup/teardown a session needs. The
//! production implementation is [`PlaywrightBridge`]; tests substitute fakes.

mod bridge;

pub use bridge::{
    ensure_node_available, ensure_playwright_available, BridgeOptions, PlaywrightBridge,
};

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// The browser interaction verbs a scenario step may use.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;
    async fn read_text(&self, selector: &str) -> Result<String>;
    async fn is_visible(&self, selector: &str) -> Result<bool>;
    async fn wait_for(&self, selector: &str) -> Result<()>;
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()>;
}

/// Staged lifecycle on top of the interaction verbs.
///
/// Acquisition runs engine → context → page in order; release runs the
/// matching closes in reverse. Each close is independently fallible so a
/// failure tearing down one stage never blocks the others.
#[async_trait]
pub trait SessionBackend: PageDriver {
    async fn start_engine(&self) -> Result<()>;
    async fn open_context(&self) -> Result<()>;
    async fn open_page(&self) -> Result<()>;
    async fn close_page(&self) -> Result<()>;
    async fn close_context(&self) -> Result<()>;
    async fn close_engine(&self) -> Result<()>;
}
