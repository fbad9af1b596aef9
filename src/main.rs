use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::EnvFilter;

use hrcheck_lib::{
    login_feature, BridgeOptions, Hooks, JsonReportSink, PlaywrightSessionFactory, Reporter,
    Runner, SuiteConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match SuiteConfig::load(None) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    run(config).await
}

async fn run(config: SuiteConfig) -> ExitCode {
    let reporter = Arc::new(Reporter::new(Box::new(JsonReportSink::new(
        config.report_dir(),
    ))));
    let factory = Arc::new(PlaywrightSessionFactory::new(BridgeOptions::from_config(
        &config,
    )));
    let hooks = Arc::new(Hooks::new(reporter, factory, config.screenshots_dir()));
    let runner = Runner::new(hooks, config.max_parallel_scenarios);

    let summary = runner.run(vec![login_feature(&config)]).await;

    if summary.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
