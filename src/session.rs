//! Per-scenario browser session lifecycle.
//!
//! Exactly one [`Session`] exists per scenario; sessions are never pooled or
//! shared. Acquisition stages the backend (engine → context → page) and rolls
//! back what was already created when a later stage fails. Release closes the
//! stages in reverse order, each guarded, and never propagates teardown
//! failures so they cannot mask the scenario's own outcome.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::driver::{BridgeOptions, PlaywrightBridge, SessionBackend};
use crate::Result;

/// One isolated browser automation context bound to a single scenario.
pub struct Session {
    backend: Arc<dyn SessionBackend>,
    disposed: AtomicBool,
}

impl Session {
    /// Stage the backend into a live session.
    ///
    /// A failure partway releases whatever was already created, then
    /// re-raises the original error.
    pub async fn acquire_with(backend: Arc<dyn SessionBackend>) -> Result<Session> {
        backend.start_engine().await?;

        if let Err(err) = backend.open_context().await {
            if let Err(close_err) = backend.close_engine().await {
                warn!("failed to close engine after context failure: {close_err}");
            }
            return Err(err);
        }

        if let Err(err) = backend.open_page().await {
            if let Err(close_err) = backend.close_context().await {
                warn!("failed to close context after page failure: {close_err}");
            }
            if let Err(close_err) = backend.close_engine().await {
                warn!("failed to close engine after page failure: {close_err}");
            }
            return Err(err);
        }

        debug!("browser session acquired");
        Ok(Session {
            backend,
            disposed: AtomicBool::new(false),
        })
    }

    /// Close page, context, and engine, in that order. Each close is guarded
    /// so one failure does not prevent attempting the others; failures are
    /// logged and swallowed. Repeat calls are no-ops.
    pub async fn release(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.backend.close_page().await {
            warn!("failed to close page: {err}");
        }
        if let Err(err) = self.backend.close_context().await {
            warn!("failed to close context: {err}");
        }
        if let Err(err) = self.backend.close_engine().await {
            warn!("failed to close engine: {err}");
        }
        debug!("browser session released");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn live(&self) -> Result<&dyn SessionBackend> {
        if self.is_disposed() {
            return Err(crate::SuiteError::session("session already released"));
        }
        Ok(self.backend.as_ref())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.live()?.navigate(url).await
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.live()?.click(selector).await
    }

    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.live()?.fill(selector, value).await
    }

    pub async fn read_text(&self, selector: &str) -> Result<String> {
        self.live()?.read_text(selector).await
    }

    pub async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.live()?.is_visible(selector).await
    }

    pub async fn wait_for(&self, selector: &str) -> Result<()> {
        self.live()?.wait_for(selector).await
    }

    pub async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        self.live()?.screenshot(path, full_page).await
    }
}

/// Creates one fresh session per scenario.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(&self) -> Result<Session>;
}

/// Production factory: each acquisition spawns its own Playwright bridge.
pub struct PlaywrightSessionFactory {
    options: BridgeOptions,
}

impl PlaywrightSessionFactory {
    pub fn new(options: BridgeOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessionFactory {
    async fn acquire(&self) -> Result<Session> {
        let backend = Arc::new(PlaywrightBridge::new(self.options.clone()));
        Session::acquire_with(backend).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::PageDriver;
    use crate::SuiteError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct StageLog {
        engine_opened: usize,
        context_opened: usize,
        page_opened: usize,
        page_closed: usize,
        context_closed: usize,
        engine_closed: usize,
    }

    #[derive(Default)]
    struct StagedBackend {
        log: Mutex<StageLog>,
        fail_open_context: bool,
        fail_open_page: bool,
        fail_close_page: bool,
    }

    #[async_trait]
    impl PageDriver for StagedBackend {
        async fn navigate(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        async fn read_text(&self, _selector: &str) -> Result<String> {
            Ok(String::new())
        }
        async fn is_visible(&self, _selector: &str) -> Result<bool> {
            Ok(true)
        }
        async fn wait_for(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
        async fn screenshot(&self, _path: &Path, _full_page: bool) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl SessionBackend for StagedBackend {
        async fn start_engine(&self) -> Result<()> {
            self.log.lock().engine_opened += 1;
            Ok(())
        }
        async fn open_context(&self) -> Result<()> {
            if self.fail_open_context {
                return Err(SuiteError::session("context refused"));
            }
            self.log.lock().context_opened += 1;
            Ok(())
        }
        async fn open_page(&self) -> Result<()> {
            if self.fail_open_page {
                return Err(SuiteError::session("page refused"));
            }
            self.log.lock().page_opened += 1;
            Ok(())
        }
        async fn close_page(&self) -> Result<()> {
            self.log.lock().page_closed += 1;
            if self.fail_close_page {
                return Err(SuiteError::session("page close failed"));
            }
            Ok(())
        }
        async fn close_context(&self) -> Result<()> {
            self.log.lock().context_closed += 1;
            Ok(())
        }
        async fn close_engine(&self) -> Result<()> {
            self.log.lock().engine_closed += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn acquire_stages_in_order_and_release_reverses() {
        let backend = Arc::new(StagedBackend::default());
        let session = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>)
            .await
            .expect("acquire");

        {
            let log = backend.log.lock();
            assert_eq!(log.engine_opened, 1);
            assert_eq!(log.context_opened, 1);
            assert_eq!(log.page_opened, 1);
        }

        session.release().await;
        let log = backend.log.lock();
        assert_eq!(log.page_closed, 1);
        assert_eq!(log.context_closed, 1);
        assert_eq!(log.engine_closed, 1);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let backend = Arc::new(StagedBackend::default());
        let session = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>)
            .await
            .expect("acquire");

        session.release().await;
        session.release().await;
        session.release().await;

        let log = backend.log.lock();
        assert_eq!(log.page_closed, 1);
        assert_eq!(log.engine_closed, 1);
        assert!(session.is_disposed());
    }

    #[tokio::test]
    async fn context_failure_rolls_back_engine() {
        let backend = Arc::new(StagedBackend {
            fail_open_context: true,
            ..StagedBackend::default()
        });
        let result = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>).await;

        assert!(result.is_err());
        let log = backend.log.lock();
        assert_eq!(log.engine_closed, 1);
        assert_eq!(log.page_opened, 0);
    }

    #[tokio::test]
    async fn page_failure_rolls_back_context_and_engine() {
        let backend = Arc::new(StagedBackend {
            fail_open_page: true,
            ..StagedBackend::default()
        });
        let result = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>).await;

        assert!(result.is_err());
        let log = backend.log.lock();
        assert_eq!(log.context_closed, 1);
        assert_eq!(log.engine_closed, 1);
    }

    #[tokio::test]
    async fn page_close_failure_does_not_block_other_closes() {
        let backend = Arc::new(StagedBackend {
            fail_close_page: true,
            ..StagedBackend::default()
        });
        let session = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>)
            .await
            .expect("acquire");

        session.release().await;
        let log = backend.log.lock();
        assert_eq!(log.context_closed, 1);
        assert_eq!(log.engine_closed, 1);
    }

    #[tokio::test]
    async fn released_session_rejects_interaction() {
        let backend = Arc::new(StagedBackend::default());
        let session = Session::acquire_with(Arc::clone(&backend) as Arc<dyn SessionBackend>)
            .await
            .expect("acquire");
        session.release().await;

        let result = session.navigate("https://example.com").await;
        assert!(matches!(result, Err(SuiteError::Session(_))));
    }
}
