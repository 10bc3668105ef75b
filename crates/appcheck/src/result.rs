//! Result and error types for appcheck.

use crate::wait::PollError;
use thiserror::Error;

/// Result type for appcheck operations
pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum CheckError {
    /// The driver reported a failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// No element matched the locator
    #[error("No element found using {locator}")]
    ElementNotFound {
        /// Rendered locator (`strategy=value`)
        locator: String,
    },

    /// Only native contexts were exposed
    #[error("Couldn't find a webview in contexts: {contexts:?}")]
    NoWebview {
        /// Contexts reported by the driver
        contexts: Vec<String>,
    },

    /// Scenario needs a capability profile the session does not have
    #[error("Scenario '{scenario}' requires the {required} capability profile")]
    UnsupportedProfile {
        /// Scenario name
        scenario: String,
        /// Required profile name
        required: &'static str,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Condition polling gave up, was cancelled, or was misconfigured
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Scenario lookup failed
    #[error("Unknown scenario: {name}")]
    UnknownScenario {
        /// Requested name
        name: String,
    },

    /// Suite configuration is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CheckError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error came from an exhausted poll
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Poll(PollError::Exhausted { .. }))
    }
}
