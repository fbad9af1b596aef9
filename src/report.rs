//! Report tree and step/scenario correlation.
//!
//! The tree is Feature → Scenario → Step. Scenarios run concurrently, so all
//! "current scenario"/"current step" state is keyed by a per-scenario
//! [`CorrelationKey`] in a concurrent map; there is no shared mutable
//! "current" pointer. Recording never fails a test: a missing association is
//! logged and dropped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Local, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Result;

/// Identifier of a concurrently-active scenario's execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey(u64);

impl CorrelationKey {
    /// Allocate a key unique for the lifetime of the process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        CorrelationKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Given,
    When,
    Then,
    And,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepKind::Given => "Given",
            StepKind::When => "When",
            StepKind::Then => "Then",
            StepKind::And => "And",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub kind: StepKind,
    pub text: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRecord {
    pub name: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepRecord>,
    /// Screenshots that could not be attached to a step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
}

impl ScenarioRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Passed,
            steps: Vec::new(),
            screenshots: Vec::new(),
            failure: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub name: String,
    pub scenarios: Vec<ScenarioRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub features: Vec<FeatureRecord>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            features: Vec::new(),
        }
    }
}

/// Persists the assembled report at end of run.
pub trait ReportSink: Send + Sync {
    fn persist(&self, report: &RunReport) -> Result<()>;
}

/// Writes the report tree as a timestamped JSON artifact.
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSink for JsonReportSink {
    fn persist(&self, report: &RunReport) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("report_{}.json", Local::now().format("%Y%m%d_%H%M%S")));
        let payload = serde_json::to_string_pretty(report)?;
        fs::write(&path, payload)?;
        info!("report written to {}", path.display());
        Ok(())
    }
}

/// Where a correlation key currently points in the tree.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    feature: usize,
    scenario: usize,
    step: Option<usize>,
}

/// Routes step results, screenshots, and failure details from concurrently
/// running scenarios to the correct report nodes.
pub struct Reporter {
    tree: Mutex<RunReport>,
    active: DashMap<CorrelationKey, Cursor>,
    sink: Box<dyn ReportSink>,
    flushed: AtomicBool,
}

impl Reporter {
    pub fn new(sink: Box<dyn ReportSink>) -> Self {
        Self {
            tree: Mutex::new(RunReport::new()),
            active: DashMap::new(),
            sink,
            flushed: AtomicBool::new(false),
        }
    }

    /// Returns (creating if absent) the feature node for `name`. Feature
    /// identity is the name itself; later calls reuse the node.
    pub fn create_feature(&self, name: &str) {
        let mut tree = self.tree.lock();
        if tree.features.iter().any(|f| f.name == name) {
            return;
        }
        tree.features.push(FeatureRecord {
            name: name.to_string(),
            scenarios: Vec::new(),
        });
        debug!("created feature {:?}", name);
    }

    /// Create a scenario node under `feature` (auto-created if missing) and
    /// associate it with `key`, replacing any prior association.
    pub fn create_scenario(&self, key: CorrelationKey, feature: &str, name: &str) {
        let cursor = {
            let mut tree = self.tree.lock();
            let feature_idx = match tree.features.iter().position(|f| f.name == feature) {
                Some(idx) => idx,
                None => {
                    tree.features.push(FeatureRecord {
                        name: feature.to_string(),
                        scenarios: Vec::new(),
                    });
                    tree.features.len() - 1
                }
            };
            tree.features[feature_idx]
                .scenarios
                .push(ScenarioRecord::new(name));
            Cursor {
                feature: feature_idx,
                scenario: tree.features[feature_idx].scenarios.len() - 1,
                step: None,
            }
        };
        self.active.insert(key, cursor);
        debug!("created scenario {:?} on {}", name, key);
    }

    /// Record one step outcome against the caller's scenario and make it the
    /// "current step" for subsequent attachments. Logs and drops when no
    /// scenario is associated with `key`.
    pub fn record_step(
        &self,
        key: CorrelationKey,
        kind: StepKind,
        text: &str,
        status: StepStatus,
        detail: Option<&str>,
    ) {
        let Some(mut cursor) = self.active.get_mut(&key) else {
            warn!("no active scenario for step {:?} on {}", text, key);
            return;
        };
        let mut tree = self.tree.lock();
        let scenario = &mut tree.features[cursor.feature].scenarios[cursor.scenario];
        scenario.steps.push(StepRecord {
            kind,
            text: text.to_string(),
            status,
            detail: detail.map(str::to_string),
            screenshot: None,
            notes: Vec::new(),
            recorded_at: Utc::now(),
        });
        if status == StepStatus::Fail {
            scenario.status = ScenarioStatus::Failed;
        }
        cursor.step = Some(scenario.steps.len() - 1);
        debug!("{} {} - {:?} on {}", kind, text, status, key);
    }

    /// Attach an image to the current step, falling back to the scenario
    /// node, else logging and dropping it.
    pub fn attach_screenshot(&self, key: CorrelationKey, path: &Path) {
        let Some(cursor) = self.active.get(&key) else {
            warn!(
                "no active scenario or step for screenshot {}; dropping it",
                path.display()
            );
            return;
        };
        let mut tree = self.tree.lock();
        let scenario = &mut tree.features[cursor.feature].scenarios[cursor.scenario];
        match cursor.step {
            Some(idx) => scenario.steps[idx].screenshot = Some(path.to_path_buf()),
            None => scenario.screenshots.push(path.to_path_buf()),
        }
    }

    /// Append an informational note to the current step, falling back to the
    /// scenario's attachment list semantics (dropped with a warning if no
    /// node is active).
    pub fn attach_info(&self, key: CorrelationKey, message: &str) {
        let Some(cursor) = self.active.get(&key) else {
            warn!("no active scenario for info note on {}", key);
            return;
        };
        if let Some(idx) = cursor.step {
            let mut tree = self.tree.lock();
            let scenario = &mut tree.features[cursor.feature].scenarios[cursor.scenario];
            scenario.steps[idx].notes.push(message.to_string());
        }
    }

    /// Mark the current step (else the scenario) failed with a message and
    /// optional trace.
    pub fn attach_failure(&self, key: CorrelationKey, message: &str, trace: Option<&str>) {
        let Some(cursor) = self.active.get(&key) else {
            warn!("no active scenario or step for failure detail on {}", key);
            return;
        };
        let mut tree = self.tree.lock();
        let scenario = &mut tree.features[cursor.feature].scenarios[cursor.scenario];
        if let Some(idx) = cursor.step {
            let step = &mut scenario.steps[idx];
            step.status = StepStatus::Fail;
            if step.detail.is_none() {
                step.detail = Some(message.to_string());
            }
        }
        scenario.status = ScenarioStatus::Failed;
        scenario.failure = Some(FailureRecord {
            message: message.to_string(),
            trace: trace.map(str::to_string),
        });
    }

    /// Purge the scenario and current-step association for `key` so a future
    /// scenario reusing the execution context cannot inherit stale state.
    pub fn end_scenario(&self, key: CorrelationKey) {
        self.active.remove(&key);
        debug!("correlation state purged for {}", key);
    }

    /// Persist the full report tree exactly once. Safe to call with an empty
    /// tree; repeat calls are no-ops.
    pub fn flush(&self) -> Result<()> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let snapshot = self.tree.lock().clone();
        self.sink.persist(&snapshot)
    }

    /// A copy of the tree as recorded so far.
    pub fn snapshot(&self) -> RunReport {
        self.tree.lock().clone()
    }
}
