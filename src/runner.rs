//! Bounded worker pool over scenarios.
//!
//! Each scenario runs as its own task; a semaphore caps how many are
//! in-flight at once. Steps within a scenario are strictly sequential; no
//! ordering is guaranteed across scenarios.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::hooks::{Hooks, ScenarioVerdict};
use crate::suite::Feature;

/// Aggregate outcome of a run. Passes iff every scenario passed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub verdicts: Vec<ScenarioVerdict>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.verdicts.len() - self.passed_count()
    }
}

pub struct Runner {
    hooks: Arc<Hooks>,
    max_parallel: usize,
}

impl Runner {
    pub fn new(hooks: Arc<Hooks>, max_parallel: usize) -> Self {
        Self {
            hooks,
            max_parallel: max_parallel.max(1),
        }
    }

    pub async fn run(&self, features: Vec<Feature>) -> RunSummary {
        self.hooks.run_start();

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut workers = JoinSet::new();

        for feature in features {
            let feature_name: Arc<str> = Arc::from(feature.name.as_str());
            for scenario in feature.scenarios {
                let hooks = Arc::clone(&self.hooks);
                let semaphore = Arc::clone(&semaphore);
                let feature_name = Arc::clone(&feature_name);
                workers.spawn(async move {
                    match semaphore.acquire_owned().await {
                        Ok(_permit) => hooks.run_scenario(&feature_name, &scenario).await,
                        Err(_) => ScenarioVerdict {
                            feature: feature_name.to_string(),
                            scenario: scenario.name.clone(),
                            passed: false,
                            error: Some("worker pool unavailable".to_string()),
                        },
                    }
                });
            }
        }

        let mut verdicts = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(verdict) => verdicts.push(verdict),
                Err(err) => {
                    error!("scenario worker panicked: {err}");
                    verdicts.push(ScenarioVerdict {
                        feature: String::new(),
                        scenario: "<panicked worker>".to_string(),
                        passed: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        self.hooks.run_end();

        let summary = RunSummary { verdicts };
        info!(
            "run finished: {} passed, {} failed",
            summary.passed_count(),
            summary.failed_count()
        );
        summary
    }
}
