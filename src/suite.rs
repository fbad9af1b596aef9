//! Scenario definitions: a small Given/When/Then model over the session
//! verbs, plus the login feature for the OrangeHRM demo application.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::SuiteConfig;
use crate::report::StepKind;
use crate::session::Session;
use crate::{Result, SuiteError};

type StepAction =
    Arc<dyn Fn(Arc<Session>) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static>;

/// One Given/When/Then/And action within a scenario.
#[derive(Clone)]
pub struct Step {
    pub kind: StepKind,
    pub text: String,
    action: StepAction,
}

impl Step {
    pub fn new<F, Fut>(kind: StepKind, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            kind,
            text: text.into(),
            action: Arc::new(move |session| action(session).boxed()),
        }
    }

    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        (self.action)(session).await
    }
}

/// A named sequence of steps executed against one fresh session.
#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step<F, Fut>(mut self, kind: StepKind, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.steps.push(Step::new(kind, text, action));
        self
    }

    pub fn given<F, Fut>(self, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.step(StepKind::Given, text, action)
    }

    pub fn when<F, Fut>(self, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.step(StepKind::When, text, action)
    }

    pub fn then<F, Fut>(self, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.step(StepKind::Then, text, action)
    }

    pub fn and<F, Fut>(self, text: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.step(StepKind::And, text, action)
    }
}

/// A named group of scenarios, mapped to one feature node in the report.
#[derive(Clone)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

/// Selectors for the OrangeHRM demo login page.
pub mod selectors {
    pub const USERNAME_INPUT: &str = "input[name='username']";
    pub const PASSWORD_INPUT: &str = "input[name='password']";
    pub const LOGIN_BUTTON: &str = "button[type='submit']";
    pub const ERROR_MESSAGE: &str = ".oxd-alert-content-text";
    pub const DASHBOARD_HEADER: &str = ".oxd-topbar-header-breadcrumb";
}

/// The login feature: valid credentials, invalid credentials, empty fields.
pub fn login_feature(config: &SuiteConfig) -> Feature {
    Feature {
        name: "Login".to_string(),
        scenarios: vec![
            valid_login(config),
            invalid_login(config),
            empty_fields(config),
        ],
    }
}

fn open_login_page(base_url: String) -> impl Fn(Arc<Session>) -> BoxFuture<'static, Result<()>> {
    move |session| {
        let url = base_url.clone();
        async move {
            session.navigate(&url).await?;
            session.wait_for(selectors::USERNAME_INPUT).await
        }
        .boxed()
    }
}

fn valid_login(config: &SuiteConfig) -> Scenario {
    let username = config.username.clone();
    let password = config.password.clone();
    Scenario::new("Successful login with valid credentials")
        .given(
            "I am on the OrangeHRM login page",
            open_login_page(config.base_url.clone()),
        )
        .when("I enter valid username and password", move |session| {
            let username = username.clone();
            let password = password.clone();
            async move {
                session.fill(selectors::USERNAME_INPUT, &username).await?;
                session.fill(selectors::PASSWORD_INPUT, &password).await
            }
        })
        .and("I click the login button", |session| async move {
            session.click(selectors::LOGIN_BUTTON).await
        })
        .then("I should be logged in successfully", |session| async move {
            session.wait_for(selectors::DASHBOARD_HEADER).await?;
            if !session.is_visible(selectors::DASHBOARD_HEADER).await? {
                return Err(SuiteError::assertion(
                    "dashboard header not visible after login",
                ));
            }
            Ok(())
        })
}

fn invalid_login(config: &SuiteConfig) -> Scenario {
    Scenario::new("Login with invalid credentials")
        .given(
            "I am on the OrangeHRM login page",
            open_login_page(config.base_url.clone()),
        )
        .when("I enter an invalid username and password", |session| async move {
            session.fill(selectors::USERNAME_INPUT, "invalid").await?;
            session.fill(selectors::PASSWORD_INPUT, "wrongpassword").await
        })
        .and("I click the login button", |session| async move {
            session.click(selectors::LOGIN_BUTTON).await
        })
        .then("I should see an error message", |session| async move {
            session.wait_for(selectors::ERROR_MESSAGE).await?;
            if !session.is_visible(selectors::ERROR_MESSAGE).await? {
                return Err(SuiteError::assertion(
                    "error message not displayed for invalid credentials",
                ));
            }
            let message = session.read_text(selectors::ERROR_MESSAGE).await?;
            if message.trim().is_empty() {
                return Err(SuiteError::assertion("error message is empty"));
            }
            Ok(())
        })
}

fn empty_fields(config: &SuiteConfig) -> Scenario {
    Scenario::new("Login with empty credentials")
        .given(
            "I am on the OrangeHRM login page",
            open_login_page(config.base_url.clone()),
        )
        .when("I click the login button without entering credentials", |session| async move {
            session.click(selectors::LOGIN_BUTTON).await
        })
        .then(
            "I should see an error message for empty fields",
            |session| async move {
                session.wait_for(selectors::ERROR_MESSAGE).await?;
                if !session.is_visible(selectors::ERROR_MESSAGE).await? {
                    return Err(SuiteError::assertion(
                        "validation message not displayed for empty fields",
                    ));
                }
                Ok(())
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_feature_contains_three_scenarios() {
        let feature = login_feature(&SuiteConfig::default());
        assert_eq!(feature.name, "Login");
        assert_eq!(feature.scenarios.len(), 3);
    }

    #[test]
    fn scenarios_open_with_a_given_step() {
        let feature = login_feature(&SuiteConfig::default());
        for scenario in &feature.scenarios {
            assert_eq!(scenario.steps[0].kind, StepKind::Given);
            assert!(scenario.steps.len() >= 3, "{} too short", scenario.name);
        }
    }

    #[test]
    fn builder_orders_steps_by_insertion() {
        let scenario = Scenario::new("ordering")
            .given("a", |_s| async { Ok(()) })
            .when("b", |_s| async { Ok(()) })
            .then("c", |_s| async { Ok(()) });
        let kinds: Vec<StepKind> = scenario.steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Given, StepKind::When, StepKind::Then]);
        let texts: Vec<&str> = scenario.steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
