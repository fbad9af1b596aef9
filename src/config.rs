//! Suite configuration: read-only at startup, resolved from defaults, an
//! optional `hrcheck.toml` file, and `HRCHECK_*` environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{Result, SuiteError};

/// Default timeout applied to every browser operation and navigation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str =
    "https://opensource-demo.orangehrmlive.com/web/index.php/auth/login";
const CONFIG_FILE: &str = "hrcheck.toml";

/// Browser engine to launch for each session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserKind {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            other => Err(SuiteError::Config(format!(
                "Unknown browser {:?}; expected chromium, firefox, or webkit",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Login page of the application under test.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub browser: BrowserKind,
    pub headless: bool,
    /// Default timeout for every browser operation.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
    /// Timeout for page navigations.
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    /// Root directory for reports and screenshots.
    pub results_dir: PathBuf,
    /// Node.js command used to drive the Playwright bridge.
    pub node_command: String,
    /// Upper bound on concurrently running scenarios.
    pub max_parallel_scenarios: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: "Admin".to_string(),
            password: "admin123".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            default_timeout: DEFAULT_OPERATION_TIMEOUT,
            navigation_timeout: DEFAULT_OPERATION_TIMEOUT,
            results_dir: PathBuf::from("test-results"),
            node_command: "node".to_string(),
            max_parallel_scenarios: 1,
        }
    }
}

impl SuiteConfig {
    /// Load config from an explicit path, `hrcheck.toml` in the working
    /// directory, or defaults, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let fallback = Path::new(CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            SuiteError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var("HRCHECK_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = env::var("HRCHECK_USERNAME") {
            self.username = v;
        }
        if let Ok(v) = env::var("HRCHECK_PASSWORD") {
            self.password = v;
        }
        if let Ok(v) = env::var("HRCHECK_BROWSER") {
            self.browser = v.parse()?;
        }
        if let Ok(v) = env::var("HRCHECK_HEADLESS") {
            self.headless = match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(SuiteError::Config(format!(
                        "HRCHECK_HEADLESS must be a boolean flag, got {:?}",
                        v
                    )))
                }
            };
        }
        if let Ok(v) = env::var("HRCHECK_RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("HRCHECK_NODE") {
            self.node_command = v;
        }
        if let Ok(v) = env::var("HRCHECK_TIMEOUT_SECS") {
            let secs: u64 = v.parse().map_err(|_| {
                SuiteError::Config(format!("HRCHECK_TIMEOUT_SECS must be an integer, got {:?}", v))
            })?;
            self.default_timeout = Duration::from_secs(secs);
            self.navigation_timeout = Duration::from_secs(secs);
        }
        if let Ok(v) = env::var("HRCHECK_PARALLEL") {
            self.max_parallel_scenarios = v.parse().map_err(|_| {
                SuiteError::Config(format!("HRCHECK_PARALLEL must be an integer, got {:?}", v))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)?;
        if self.default_timeout.is_zero() || self.navigation_timeout.is_zero() {
            return Err(SuiteError::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_parallel_scenarios == 0 {
            return Err(SuiteError::Config(
                "max_parallel_scenarios must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.results_dir.join("screenshots")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.results_dir.join("report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_expected() {
        let cfg = SuiteConfig::default();
        assert_eq!(cfg.username, "Admin");
        assert_eq!(cfg.browser, BrowserKind::Chromium);
        assert!(cfg.headless);
        assert_eq!(cfg.default_timeout, Duration::from_secs(30));
        assert_eq!(cfg.node_command, "node");
        assert_eq!(cfg.max_parallel_scenarios, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn results_subdirectories_nest_under_results_dir() {
        let cfg = SuiteConfig {
            results_dir: PathBuf::from("out"),
            ..SuiteConfig::default()
        };
        assert_eq!(cfg.screenshots_dir(), PathBuf::from("out/screenshots"));
        assert_eq!(cfg.report_dir(), PathBuf::from("out/report"));
    }

    #[test]
    fn validate_rejects_bad_url() {
        let cfg = SuiteConfig {
            base_url: "not a url".to_string(),
            ..SuiteConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let cfg = SuiteConfig {
            max_parallel_scenarios: 0,
            ..SuiteConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SuiteError::Config(_))));
    }

    #[test]
    fn browser_kind_parses_case_insensitively() {
        assert_eq!(
            "Firefox".parse::<BrowserKind>().ok(),
            Some(BrowserKind::Firefox)
        );
        assert!("opera".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn headless_override_is_case_insensitive_and_strict() {
        let mut cfg = SuiteConfig::default();
        env::set_var("HRCHECK_HEADLESS", "FALSE");
        let first = cfg.apply_env();
        env::set_var("HRCHECK_HEADLESS", "maybe");
        let second = cfg.apply_env();
        env::remove_var("HRCHECK_HEADLESS");

        first.expect("uppercase boolean accepted");
        assert!(!cfg.headless);
        assert!(matches!(second, Err(SuiteError::Config(_))));
    }

    #[test]
    fn config_parses_from_toml() {
        let cfg: SuiteConfig = toml::from_str(
            r#"
            base_url = "https://hr.example.com/login"
            username = "qa"
            password = "secret"
            browser = "webkit"
            headless = false
            default_timeout = "10s"
            max_parallel_scenarios = 4
            "#,
        )
        .expect("parse config");
        assert_eq!(cfg.base_url, "https://hr.example.com/login");
        assert_eq!(cfg.browser, BrowserKind::Webkit);
        assert!(!cfg.headless);
        assert_eq!(cfg.default_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_parallel_scenarios, 4);
        // Unset fields fall back to defaults.
        assert_eq!(cfg.node_command, "node");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<SuiteConfig, _> = toml::from_str("browserr = \"chromium\"");
        assert!(parsed.is_err());
    }
}
