//! Condition Polling
//!
//! One primitive for every "evaluate, assert, maybe retry" loop a scenario
//! needs. A check is invoked until it returns `Ok`, the attempt budget is
//! spent, or the overall timeout elapses.
//!
//! ```ignore
//! let title = Poller::new(PollConfig::wait_for(10_000, 1_000))
//!     .describe("title contains 'I am a page title'")
//!     .run(|| title_contains(driver, "I am a page title"))
//!     .await?;
//! ```
//!
//! Attempts are strictly sequential. Dropping the returned future cancels
//! the in-flight check or interval sleep; [`Poller::run_cancellable`] does the
//! same when a [`CancellationToken`] fires and reports how far it got.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default overall budget for time-bounded polls (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default pause between attempts (1 second)
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Smallest pause a time-bounded poll takes between attempts
///
/// With a zero interval and a deadline, attempts are spaced one timer tick
/// apart so the clock always moves toward the deadline.
pub const MIN_TIMED_PAUSE: Duration = Duration::from_millis(1);

/// Boxed error carried as the last observed failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// POLL CONFIG
// =============================================================================

/// Attempt and time budget for a single poll operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of check invocations (must be at least 1)
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    pub interval_ms: u64,
    /// Upper bound on total elapsed time in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::wait_for(DEFAULT_TIMEOUT_MS, DEFAULT_INTERVAL_MS)
    }
}

impl PollConfig {
    /// Attempt-bounded polling with no overall timeout
    #[must_use]
    pub const fn retry_interval(times: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts: times,
            interval_ms,
            timeout_ms: None,
        }
    }

    /// Time-bounded polling; the timeout is what terminates it
    #[must_use]
    pub const fn wait_for(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            max_attempts: u32::MAX,
            interval_ms,
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Set the attempt budget
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between attempts
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the overall timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Remove the overall timeout
    #[must_use]
    pub const fn without_timeout(mut self) -> Self {
        self.timeout_ms = None;
        self
    }

    /// Pause between attempts as a Duration
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Actual wait between attempts
    ///
    /// Equals [`PollConfig::interval`], except that a zero interval with a
    /// timeout becomes [`MIN_TIMED_PAUSE`].
    #[must_use]
    pub fn pause(&self) -> Duration {
        if self.interval_ms == 0 && self.timeout_ms.is_some() {
            MIN_TIMED_PAUSE
        } else {
            self.interval()
        }
    }

    /// Overall timeout as a Duration
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Reject budgets that could never run an attempt
    pub fn validate(&self) -> Result<(), PollError> {
        if self.max_attempts == 0 {
            return Err(PollError::InvalidConfig {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(PollError::InvalidConfig {
                message: "timeout_ms must be greater than 0 when set".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Signal a check returns when the condition simply does not hold yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition not yet satisfied")]
pub struct NotReady;

/// Why a poll operation did not produce a value
#[derive(Debug, Error)]
pub enum PollError {
    /// The budget was invalid; no attempt ran
    #[error("Invalid poll configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
    },

    /// Attempts were used up or the timeout elapsed
    #[error(
        "{description}: gave up after {attempts} attempt(s) in {}ms{}",
        .elapsed.as_millis(),
        render_last(.last.as_ref())
    )]
    Exhausted {
        /// Condition being waited for
        description: String,
        /// Check invocations made
        attempts: u32,
        /// Wall time spent
        elapsed: Duration,
        /// Last failure a completed attempt reported
        #[source]
        last: Option<BoxError>,
    },

    /// The cancellation token fired
    #[error("{description}: cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Condition being waited for
        description: String,
        /// Check invocations started
        attempts: u32,
    },
}

fn render_last(last: Option<&BoxError>) -> String {
    last.map_or_else(String::new, |err| format!(" (last error: {err})"))
}

impl PollError {
    /// Number of check invocations made before giving up
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::InvalidConfig { .. } => 0,
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Last failure reported by a completed attempt
    #[must_use]
    pub fn last_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Exhausted { last, .. } => last.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Repeatedly evaluates a check within a [`PollConfig`] budget
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
    description: String,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(PollConfig::default())
    }
}

impl Poller {
    /// Create a poller for the given budget
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            description: "condition".to_string(),
        }
    }

    /// Describe the awaited condition for logs and errors
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The budget this poller enforces
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Invoke `check` until it returns `Ok` or the budget is spent
    pub async fn run<T, E, F, Fut>(&self, check: F) -> Result<T, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.drive(None, check).await
    }

    /// Like [`Poller::run`], but stops as soon as `token` is cancelled
    pub async fn run_cancellable<T, E, F, Fut>(
        &self,
        token: &CancellationToken,
        check: F,
    ) -> Result<T, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.drive(Some(token), check).await
    }

    /// Poll a boolean predicate; `false` counts as a failed attempt
    pub async fn until<F, Fut>(&self, mut predicate: F) -> Result<(), PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.run(|| {
            let pending = predicate();
            async move {
                if pending.await {
                    Ok(())
                } else {
                    Err(NotReady)
                }
            }
        })
        .await
    }

    /// Poll until the check yields `Some`
    pub async fn until_some<T, F, Fut>(&self, mut check: F) -> Result<T, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.run(|| {
            let pending = check();
            async move { pending.await.ok_or(NotReady) }
        })
        .await
    }

    async fn drive<T, E, F, Fut>(
        &self,
        cancel: Option<&CancellationToken>,
        mut check: F,
    ) -> Result<T, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.config.validate()?;

        let started = Instant::now();
        let deadline = self.config.timeout().map(|budget| started + budget);
        let pause = self.config.pause();
        let mut attempts: u32 = 0;
        let mut last: Option<BoxError> = None;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(self.cancelled(attempts));
            }

            attempts += 1;
            let outcome = tokio::select! {
                biased;
                () = cancelled(cancel) => return Err(self.cancelled(attempts)),
                outcome = within(deadline, check()) => outcome,
            };

            match outcome {
                Some(Ok(value)) => {
                    if attempts > 1 {
                        info!(
                            condition = %self.description,
                            attempts,
                            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                            "condition satisfied after retries"
                        );
                    }
                    return Ok(value);
                }
                Some(Err(err)) => {
                    let err = err.into();
                    debug!(condition = %self.description, attempt = attempts, error = %err, "attempt failed");
                    last = Some(err);
                }
                None => {
                    debug!(condition = %self.description, attempt = attempts, "attempt cut off by timeout");
                    return Err(self.exhausted(attempts, started, last));
                }
            }

            if attempts >= self.config.max_attempts {
                return Err(self.exhausted(attempts, started, last));
            }
            // The next attempt would start at or past the deadline.
            if deadline.is_some_and(|deadline| Instant::now() + pause >= deadline) {
                return Err(self.exhausted(attempts, started, last));
            }

            // Suspend even for a zero pause so timers and other tasks can run.
            tokio::select! {
                biased;
                () = cancelled(cancel) => return Err(self.cancelled(attempts)),
                () = wait(pause) => {}
            }
        }
    }

    fn exhausted(&self, attempts: u32, started: Instant, last: Option<BoxError>) -> PollError {
        let elapsed = started.elapsed();
        warn!(
            condition = %self.description,
            attempts,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "giving up on condition"
        );
        PollError::Exhausted {
            description: self.description.clone(),
            attempts,
            elapsed,
            last,
        }
    }

    fn cancelled(&self, attempts: u32) -> PollError {
        debug!(condition = %self.description, attempts, "poll cancelled");
        PollError::Cancelled {
            description: self.description.clone(),
            attempts,
        }
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait(pause: Duration) {
    if pause.is_zero() {
        task::yield_now().await;
    } else {
        time::sleep(pause).await;
    }
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Retry `check` up to `times` attempts, `interval_ms` apart
pub async fn retry_interval<T, E, F, Fut>(
    times: u32,
    interval_ms: u64,
    check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    Poller::new(PollConfig::retry_interval(times, interval_ms))
        .run(check)
        .await
}

/// Poll `check` every `interval_ms` until `timeout_ms` has elapsed
pub async fn wait_for<T, E, F, Fut>(
    timeout_ms: u64,
    interval_ms: u64,
    check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    Poller::new(PollConfig::wait_for(timeout_ms, interval_ms))
        .run(check)
        .await
}

// =============================================================================
// TESTS
// =============================================================================
