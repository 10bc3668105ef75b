//! Appcheck: condition polling and scenario harness for mobile/web automation
//!
//! Automation targets settle asynchronously: titles change after navigation,
//! webviews appear some time after launch, text fields fill in late. The core
//! of this crate is a bounded poller that retries a check until it passes or
//! a budget of attempts or wall time is spent. Around it sit a driver
//! abstraction, capability profiles, webview selection, assertions and a
//! suite runner.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐    ┌───────────────┐    ┌───────────────┐
//! │ Suite         │    │ Session       │    │ Driver        │
//! │ (scenarios,   │───►│ (profile,     │───►│ (remote       │
//! │  config)      │    │  poll budget) │    │  session)     │
//! └───────────────┘    └───────┬───────┘    └───────────────┘
//!                              │
//!                              ▼
//!                      ┌───────────────┐
//!                      │ Poller        │
//!                      │ (retry check) │
//!                      └───────────────┘
//! ```
//!
//! # Polling
//!
//! ```ignore
//! use appcheck::prelude::*;
//!
//! let title = Poller::new(PollConfig::wait_for(10_000, 1_000))
//!     .describe("title is set")
//!     .run(|| title_contains(driver, "I am a page title"))
//!     .await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod assertion;
#[allow(clippy::missing_errors_doc)]
mod driver;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
mod harness;
mod result;

/// Condition Polling
///
/// Retry an asynchronous check under an attempt and wall-time budget.
#[allow(clippy::missing_errors_doc)]
pub mod wait;

/// Desired capabilities and driver profiles
#[allow(clippy::doc_markdown)]
pub mod capabilities;

/// Webview context selection for hybrid apps
#[allow(clippy::missing_errors_doc)]
pub mod context;

/// YAML suite configuration
#[allow(clippy::missing_errors_doc)]
pub mod config;

/// Structured logging setup
pub mod logging;

pub use assertion::{
    attribute_matches, contexts_above, text_contains, text_matches, title_contains, Assertion,
    AssertionResult, TextMatch, TextPattern,
};
pub use capabilities::{Capabilities, CapabilityProfile, ElementRole, APPIUM_VERSION};
pub use config::{SuiteConfig, DEFAULT_SCENARIO_TIMEOUT_MS};
pub use context::{is_webview, select_webview, switch_to_first, switch_to_last};
pub use driver::{
    Driver, DriverFactory, ElementHandle, Locator, MockDriver, Strategy, NATIVE_CONTEXT,
};
pub use harness::{
    Outcome, Scenario, ScenarioFn, Session, Suite, SuiteResults, TestResult,
};
pub use logging::LogFormat;
pub use result::{CheckError, CheckResult};
pub use wait::{
    retry_interval, wait_for, NotReady, PollConfig, PollError, Poller, DEFAULT_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::assertion::*;
    pub use super::capabilities::*;
    pub use super::config::*;
    pub use super::context::*;
    pub use super::driver::*;
    pub use super::harness::*;
    pub use super::logging::LogFormat;
    pub use super::result::*;
    pub use super::wait::*;
    pub use futures::future::BoxFuture;
    pub use tokio_util::sync::CancellationToken;
}
