//! Test lifecycle hooks: the glue between sessions, scenarios, and the
//! report. One scenario flows NotStarted → session acquisition → stepping →
//! teardown; the session is released on every exit path and bookkeeping
//! failures (screenshots, report writes) are logged, never escalated.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{info, warn};

use crate::report::{CorrelationKey, Reporter, StepStatus};
use crate::screenshot;
use crate::session::{Session, SessionFactory};
use crate::suite::Scenario;
use crate::SuiteError;

/// Outcome of one scenario after teardown.
#[derive(Debug, Clone)]
pub struct ScenarioVerdict {
    pub feature: String,
    pub scenario: String,
    pub passed: bool,
    pub error: Option<String>,
}

pub struct Hooks {
    reporter: Arc<Reporter>,
    factory: Arc<dyn SessionFactory>,
    screenshots_dir: PathBuf,
}

impl Hooks {
    pub fn new(
        reporter: Arc<Reporter>,
        factory: Arc<dyn SessionFactory>,
        screenshots_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reporter,
            factory,
            screenshots_dir: screenshots_dir.into(),
        }
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub fn run_start(&self) {
        info!("test run starting");
    }

    /// Flush the report exactly once at end of run. Reporting failures are
    /// logged and swallowed.
    pub fn run_end(&self) {
        if let Err(err) = self.reporter.flush() {
            warn!("failed to flush report: {err}");
        }
    }

    /// Execute one scenario end to end: report nodes, session acquisition,
    /// steps, screenshots, correlation purge, session release.
    pub async fn run_scenario(&self, feature: &str, scenario: &Scenario) -> ScenarioVerdict {
        let key = CorrelationKey::next();
        self.reporter.create_feature(feature);
        self.reporter.create_scenario(key, feature, &scenario.name);
        info!("scenario {:?} starting on {}", scenario.name, key);

        // The scenario cannot proceed without a session; acquisition failure
        // is fatal to it (the factory already rolled back partial state).
        let session = match self.factory.acquire().await {
            Ok(session) => Arc::new(session),
            Err(err) => {
                self.reporter.attach_failure(
                    key,
                    &format!("session acquisition failed: {err}"),
                    None,
                );
                self.reporter.end_scenario(key);
                return ScenarioVerdict {
                    feature: feature.to_string(),
                    scenario: scenario.name.clone(),
                    passed: false,
                    error: Some(err.to_string()),
                };
            }
        };

        let mut failure: Option<String> = None;
        for step in &scenario.steps {
            let started = Instant::now();
            // Unwinds are contained here so the teardown below runs even when
            // a step action panics.
            let outcome = match AssertUnwindSafe(step.run(Arc::clone(&session)))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(payload) => Err(SuiteError::automation(
                    "step execution",
                    format!("panicked: {}", panic_message(payload)),
                )),
            };
            match outcome {
                Ok(()) => {
                    self.reporter
                        .record_step(key, step.kind, &step.text, StepStatus::Pass, None);
                    self.reporter
                        .attach_info(key, &format!("completed in {:.1?}", started.elapsed()));
                }
                Err(err) => {
                    if !err.is_scenario_failure() {
                        warn!("harness error failed step {:?}: {err}", step.text);
                    }
                    let shot = self
                        .capture_best_effort(&session, &format!("error_{}", scenario.name))
                        .await;
                    let detail = err.to_string();
                    self.reporter.record_step(
                        key,
                        step.kind,
                        &step.text,
                        StepStatus::Fail,
                        Some(&detail),
                    );
                    self.reporter
                        .attach_info(key, &format!("failed after {:.1?}", started.elapsed()));
                    if let Some(path) = shot {
                        self.reporter.attach_screenshot(key, &path);
                    }
                    self.reporter.attach_failure(key, &detail, None);
                    failure = Some(detail);
                    // Remaining steps are skipped; the scenario proceeds to teardown.
                    break;
                }
            }
        }

        if failure.is_none() {
            if let Some(path) = self
                .capture_best_effort(&session, &format!("final_{}", scenario.name))
                .await
            {
                self.reporter.attach_screenshot(key, &path);
            }
        }

        self.reporter.end_scenario(key);
        session.release().await;

        let passed = failure.is_none();
        info!(
            "scenario {:?} finished: {}",
            scenario.name,
            if passed { "passed" } else { "failed" }
        );
        ScenarioVerdict {
            feature: feature.to_string(),
            scenario: scenario.name.clone(),
            passed,
            error: failure,
        }
    }

    async fn capture_best_effort(&self, session: &Session, name: &str) -> Option<PathBuf> {
        match screenshot::capture(session, &self.screenshots_dir, name).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("screenshot capture failed: {err}");
                None
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
