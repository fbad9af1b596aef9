//! hrcheck library
//!
//! Browser-driven end-to-end login suite for the OrangeHRM demo application:
//! drives a real browser through login scenarios, records step outcomes into
//! a Feature → Scenario → Step report tree, and captures screenshots along
//! the way.
//!
//! # Module Overview
//!
//! - [`driver`] - Browser automation capability and the Playwright bridge
//! - [`session`] - Per-scenario session lifecycle (acquire/release)
//! - [`screenshot`] - Timestamped full-page screenshot capture
//! - [`report`] - Report tree and correlation-keyed step recording
//! - [`hooks`] - Lifecycle hooks wiring sessions, steps, and the report
//! - [`runner`] - Bounded worker pool over scenarios
//! - [`suite`] - Scenario model and the login feature definitions
//! - [`config`] - Suite configuration

pub mod config;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod report;
pub mod runner;
pub mod screenshot;
pub mod session;
pub mod suite;

pub use config::{BrowserKind, SuiteConfig, DEFAULT_OPERATION_TIMEOUT};
pub use driver::{
    ensure_node_available, ensure_playwright_available, BridgeOptions, PageDriver,
    PlaywrightBridge, SessionBackend,
};
pub use error::{Result, SuiteError};
pub use hooks::{Hooks, ScenarioVerdict};
pub use report::{
    CorrelationKey, FailureRecord, FeatureRecord, JsonReportSink, ReportSink, Reporter, RunReport,
    ScenarioRecord, ScenarioStatus, StepKind, StepRecord, StepStatus,
};
pub use runner::{RunSummary, Runner};
pub use session::{PlaywrightSessionFactory, Session, SessionFactory};
pub use suite::{login_feature, Feature, Scenario, Step};
