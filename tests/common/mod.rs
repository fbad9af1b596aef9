//! Shared fakes for integration tests: a scripted browser backend and a
//! session factory that can be told to fail acquisition.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use hrcheck_lib::{PageDriver, Result, Session, SessionBackend, SessionFactory, SuiteError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseCounts {
    pub page: usize,
    pub context: usize,
    pub engine: usize,
}

/// Scripted backend: selector visibility and text come from maps, selectors
/// in `missing` make `wait_for` time out, and screenshots either write a stub
/// file or fail with an I/O error.
#[derive(Default)]
pub struct FakeBackend {
    visible: HashMap<String, bool>,
    texts: HashMap<String, String>,
    missing: HashSet<String>,
    fail_screenshot: bool,
    close_counts: Mutex<CloseCounts>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visible(mut self, selector: &str) -> Self {
        self.visible.insert(selector.to_string(), true);
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    pub fn with_failing_screenshot(mut self) -> Self {
        self.fail_screenshot = true;
        self
    }

    pub fn close_counts(&self) -> CloseCounts {
        *self.close_counts.lock()
    }
}

#[async_trait]
impl PageDriver for FakeBackend {
    async fn navigate(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn fill(&self, _selector: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.visible.get(selector).copied().unwrap_or(false))
    }

    async fn wait_for(&self, selector: &str) -> Result<()> {
        if self.missing.contains(selector) {
            return Err(SuiteError::timeout(
                "waitFor",
                format!("Timeout 30000ms exceeded waiting for selector {selector:?}"),
            ));
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<()> {
        if self.fail_screenshot {
            return Err(SuiteError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "page already closed",
            )));
        }
        std::fs::write(path, b"\x89PNG stub")?;
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn start_engine(&self) -> Result<()> {
        Ok(())
    }

    async fn open_context(&self) -> Result<()> {
        Ok(())
    }

    async fn open_page(&self) -> Result<()> {
        Ok(())
    }

    async fn close_page(&self) -> Result<()> {
        self.close_counts.lock().page += 1;
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        self.close_counts.lock().context += 1;
        Ok(())
    }

    async fn close_engine(&self) -> Result<()> {
        self.close_counts.lock().engine += 1;
        Ok(())
    }
}

/// Factory handing out sessions over one shared scripted backend.
pub struct FakeFactory {
    backend: Arc<FakeBackend>,
    fail_acquire: bool,
}

impl FakeFactory {
    pub fn new(backend: Arc<FakeBackend>) -> Self {
        Self {
            backend,
            fail_acquire: false,
        }
    }

    pub fn failing(backend: Arc<FakeBackend>) -> Self {
        Self {
            backend,
            fail_acquire: true,
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn acquire(&self) -> Result<Session> {
        if self.fail_acquire {
            return Err(SuiteError::session("browser engine failed to start"));
        }
        Session::acquire_with(Arc::clone(&self.backend) as Arc<dyn SessionBackend>).await
    }
}
