//! Scenario registry and suite runner.
//!
//! A [`Suite`] owns named [`Scenario`]s. Running one asks the
//! [`DriverFactory`] for a fresh session with the suite capabilities merged
//! with the scenario's extras, runs the body under the scenario budget, and
//! always quits the session afterwards.
//!
//! ```ignore
//! fn guinea_pig(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
//!     Box::pin(async move {
//!         session.driver().navigate("http://saucelabs.com/test/guinea-pig").await?;
//!         session.wait_for_title("I am a page title").await?;
//!         Ok(())
//!     })
//! }
//!
//! let mut suite = Suite::new(SuiteConfig::load("appcheck.yaml")?);
//! suite.register(Scenario::new("guinea_pig", guinea_pig))?;
//! let results = suite.run_all(&factory).await;
//! ```

use crate::assertion::title_contains;
use crate::capabilities::{Capabilities, CapabilityProfile, ElementRole};
use crate::config::SuiteConfig;
use crate::context;
use crate::driver::{Driver, DriverFactory, ElementHandle};
use crate::result::{CheckError, CheckResult};
use crate::wait::{PollConfig, Poller};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Body of a scenario: borrows the session for as long as it runs
pub type ScenarioFn = for<'a> fn(&'a Session) -> BoxFuture<'a, CheckResult<()>>;

/// A named scenario
#[derive(Clone)]
pub struct Scenario {
    name: String,
    body: ScenarioFn,
    extra_caps: Capabilities,
    timeout: Option<Duration>,
    required_profile: Option<CapabilityProfile>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("extra_caps", &self.extra_caps)
            .field("timeout", &self.timeout)
            .field("required_profile", &self.required_profile)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Create a new scenario
    #[must_use]
    pub fn new(name: impl Into<String>, body: ScenarioFn) -> Self {
        Self {
            name: name.into(),
            body,
            extra_caps: Capabilities::new(),
            timeout: None,
            required_profile: None,
        }
    }

    /// Capabilities applied on top of the suite's for this scenario only
    #[must_use]
    pub fn with_extra_caps(mut self, caps: Capabilities) -> Self {
        self.extra_caps = caps;
        self
    }

    /// Add one extra capability
    #[must_use]
    pub fn with_capability(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_caps.insert(key, value);
        self
    }

    /// Override the suite's scenario budget
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(ms));
        self
    }

    /// Fail without running the body unless the session is on the current profile
    #[must_use]
    pub const fn requires_current_profile(mut self) -> Self {
        self.required_profile = Some(CapabilityProfile::Current);
        self
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extra capabilities
    #[must_use]
    pub const fn extra_caps(&self) -> &Capabilities {
        &self.extra_caps
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A live driver session plus everything a scenario body needs
pub struct Session {
    driver: Box<dyn Driver>,
    capabilities: Capabilities,
    profile: CapabilityProfile,
    poll: PollConfig,
    local_name: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("capabilities", &self.capabilities)
            .field("profile", &self.profile)
            .field("poll", &self.poll)
            .field("local_name", &self.local_name)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a started driver; the profile is detected from `capabilities` here
    #[must_use]
    pub fn new(driver: Box<dyn Driver>, capabilities: Capabilities) -> Self {
        let profile = CapabilityProfile::detect(&capabilities);
        Self {
            driver,
            capabilities,
            profile,
            poll: PollConfig::default(),
            local_name: None,
        }
    }

    /// Set the default poll budget
    #[must_use]
    pub const fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the local hostname
    #[must_use]
    pub fn with_local_name(mut self, name: Option<String>) -> Self {
        self.local_name = name;
        self
    }

    /// The underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Capabilities the session was started with
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Detected capability profile
    #[must_use]
    pub const fn profile(&self) -> CapabilityProfile {
        self.profile
    }

    /// Default poll budget
    #[must_use]
    pub const fn poll(&self) -> PollConfig {
        self.poll
    }

    /// Poller using the session's budget
    #[must_use]
    pub fn poller(&self, description: impl Into<String>) -> Poller {
        Poller::new(self.poll).describe(description)
    }

    /// Wait until the page title contains `needle`; yields the title
    pub async fn wait_for_title(&self, needle: &str) -> CheckResult<String> {
        let title = self
            .poller(format!("title contains '{needle}'"))
            .run(|| title_contains(self.driver(), needle))
            .await?;
        Ok(title)
    }

    /// First element for `role` under the session's profile
    pub async fn element(&self, role: ElementRole) -> CheckResult<ElementHandle> {
        self.driver.find_element(&self.profile.locator(role)).await
    }

    /// All elements for `role` under the session's profile
    pub async fn elements(&self, role: ElementRole) -> CheckResult<Vec<ElementHandle>> {
        self.driver.find_elements(&self.profile.locator(role)).await
    }

    /// Wait for a webview and switch into it; yields its name
    pub async fn select_webview(&self) -> CheckResult<String> {
        context::select_webview(self.driver(), self.poll).await
    }

    /// Hostname the device can reach this machine by
    ///
    /// Fails unless it is set to a `.local` name other than localhost.
    pub fn local_name(&self) -> CheckResult<&str> {
        match self.local_name.as_deref() {
            None | Some("") => Err(CheckError::config("local_name is not configured")),
            Some(name) if is_loopback(name) => Err(CheckError::config(format!(
                "local_name '{name}' is a loopback address"
            ))),
            Some(name) if !name.contains(LOCAL_SUFFIX) => Err(CheckError::config(format!(
                "local_name '{name}' is not a {LOCAL_SUFFIX} hostname"
            ))),
            Some(name) => Ok(name),
        }
    }
}

/// Domain a usable local hostname must carry
const LOCAL_SUFFIX: &str = ".local";

fn is_loopback(name: &str) -> bool {
    matches!(name, "localhost" | "127.0.0.1" | "::1") || name.starts_with("localhost.")
}

// =============================================================================
// RESULTS
// =============================================================================

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Body returned `Ok`
    Passed,
    /// Body, session start or profile check returned an error
    Failed,
    /// Scenario budget elapsed
    TimedOut,
    /// Suite was cancelled before or while the scenario ran
    Cancelled,
}

impl Outcome {
    /// Display name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Scenario name
    pub name: String,
    /// How it ended
    pub outcome: Outcome,
    /// Error message unless passed
    pub error: Option<String>,
    /// Scenario duration, session start and quit included
    pub duration: Duration,
}

impl TestResult {
    fn new(name: impl Into<String>, outcome: Outcome, error: Option<String>) -> Self {
        Self {
            name: name.into(),
            outcome,
            error,
            duration: Duration::ZERO,
        }
    }

    /// Create a passing test result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, Outcome::Passed, None)
    }

    /// Create a failing test result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(name, Outcome::Failed, Some(error.into()))
    }

    /// Create a timed-out test result
    #[must_use]
    pub fn timed_out(name: impl Into<String>, budget: Duration) -> Self {
        Self::new(
            name,
            Outcome::TimedOut,
            Some(format!("scenario exceeded {}ms", budget.as_millis())),
        )
    }

    /// Create a cancelled test result
    #[must_use]
    pub fn cancelled(name: impl Into<String>) -> Self {
        Self::new(name, Outcome::Cancelled, Some("suite cancelled".to_string()))
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Results from running a suite
#[derive(Debug, Clone, Default)]
pub struct SuiteResults {
    /// Scenario results, in registration order
    pub results: Vec<TestResult>,
    /// Total wall-clock duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all scenarios passed (vacuously true when none ran)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    /// Get count of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Get count of scenarios that did not pass
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get results that did not pass
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }

    /// Look up a result by scenario name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

// =============================================================================
// SUITE
// =============================================================================

/// Registry of scenarios sharing one configuration
#[derive(Debug)]
pub struct Suite {
    config: SuiteConfig,
    scenarios: Vec<Scenario>,
    cancel: CancellationToken,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config,
            scenarios: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Add a scenario; names must be unique
    pub fn register(&mut self, scenario: Scenario) -> CheckResult<()> {
        if self.scenario(scenario.name()).is_some() {
            return Err(CheckError::config(format!(
                "scenario '{}' is already registered",
                scenario.name()
            )));
        }
        self.scenarios.push(scenario);
        Ok(())
    }

    /// Look up a scenario
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(Scenario::name).collect()
    }

    /// Suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Token that stops the suite; scenarios not yet finished end as cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one scenario by name
    pub async fn run_one(&self, factory: &dyn DriverFactory, name: &str) -> CheckResult<TestResult> {
        let scenario = self
            .scenario(name)
            .ok_or_else(|| CheckError::UnknownScenario {
                name: name.to_string(),
            })?;
        Ok(self.run_scenario(factory, scenario).await)
    }

    /// Run every scenario
    pub async fn run_all(&self, factory: &dyn DriverFactory) -> SuiteResults {
        self.run_selected(factory, |_| true).await
    }

    /// Run scenarios whose name contains `pattern`
    pub async fn run_filtered(&self, factory: &dyn DriverFactory, pattern: &str) -> SuiteResults {
        self.run_selected(factory, |name| name.contains(pattern)).await
    }

    async fn run_selected<P>(&self, factory: &dyn DriverFactory, select: P) -> SuiteResults
    where
        P: Fn(&str) -> bool,
    {
        let started = Instant::now();
        let selected: Vec<(usize, &Scenario)> = self
            .scenarios
            .iter()
            .filter(|s| select(s.name()))
            .enumerate()
            .collect();
        info!(
            scenarios = selected.len(),
            concurrency = self.config.concurrency,
            "running suite"
        );

        let mut results: Vec<(usize, TestResult)> = stream::iter(selected)
            .map(|(index, scenario)| async move {
                (index, self.run_scenario(factory, scenario).await)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let results = SuiteResults {
            results: results.into_iter().map(|(_, result)| result).collect(),
            duration: started.elapsed(),
        };
        info!(
            passed = results.passed_count(),
            failed = results.failed_count(),
            duration_ms = u64::try_from(results.duration.as_millis()).unwrap_or(u64::MAX),
            "suite finished"
        );
        results
    }

    async fn run_scenario(&self, factory: &dyn DriverFactory, scenario: &Scenario) -> TestResult {
        let span = info_span!("scenario", name = %scenario.name);
        async {
            let started = Instant::now();
            let result = self
                .start_and_execute(factory, scenario)
                .await
                .with_duration(started.elapsed());
            match result.outcome {
                Outcome::Passed => info!(duration_ms = ?result.duration.as_millis(), "passed"),
                outcome => warn!(
                    %outcome,
                    error = result.error.as_deref().unwrap_or_default(),
                    "did not pass"
                ),
            }
            if !result.passed() && self.config.fail_fast && result.outcome != Outcome::Cancelled {
                self.cancel.cancel();
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn start_and_execute(&self, factory: &dyn DriverFactory, scenario: &Scenario) -> TestResult {
        if self.cancel.is_cancelled() {
            return TestResult::cancelled(&scenario.name);
        }

        let capabilities = self.config.capabilities.merged(&scenario.extra_caps);
        let driver = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return TestResult::cancelled(&scenario.name),
            started = factory.start(&capabilities) => match started {
                Ok(driver) => driver,
                Err(err) => return TestResult::fail(&scenario.name, format!("session did not start: {err}")),
            },
        };
        let session = Session::new(driver, capabilities)
            .with_poll(self.config.poll)
            .with_local_name(self.config.local_name.clone());

        let result = self.execute(scenario, &session).await;

        if let Err(err) = session.driver().quit().await {
            warn!(error = %err, "failed to quit session");
        }
        result
    }

    async fn execute(&self, scenario: &Scenario, session: &Session) -> TestResult {
        if let Some(required) = scenario.required_profile {
            if session.profile() != required {
                let err = CheckError::UnsupportedProfile {
                    scenario: scenario.name.clone(),
                    required: required.name(),
                };
                return TestResult::fail(&scenario.name, err.to_string());
            }
        }

        let budget = scenario
            .timeout
            .unwrap_or_else(|| self.config.scenario_timeout());
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => TestResult::cancelled(&scenario.name),
            run = tokio::time::timeout(budget, (scenario.body)(session)) => match run {
                Ok(Ok(())) => TestResult::pass(&scenario.name),
                Ok(Err(err)) => TestResult::fail(&scenario.name, err.to_string()),
                Err(_) => TestResult::timed_out(&scenario.name, budget),
            },
        }
    }
}
