//! Suite configuration
//!
//! ```yaml
//! poll:
//!   interval_ms: 500
//!   timeout_ms: 7000
//! scenario_timeout_ms: 120000
//! concurrency: 4
//! local_name: devbox.local
//! capabilities:
//!   platformName: iOS
//!   appiumVersion: "1.4.0"
//! ```

use crate::capabilities::Capabilities;
use crate::result::{CheckError, CheckResult};
use crate::wait::PollConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-scenario budget (5 minutes)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 300_000;

/// Configuration shared by every scenario in a suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Default budget for title/context waits
    pub poll: PollConfig,
    /// Wall-clock budget for one scenario
    pub scenario_timeout_ms: u64,
    /// Sessions run at once
    pub concurrency: usize,
    /// Stop remaining scenarios after the first failure
    pub fail_fast: bool,
    /// Hostname for scenarios that need a non-localhost address
    pub local_name: Option<String>,
    /// Base desired capabilities
    pub capabilities: Capabilities,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            concurrency: 1,
            fail_fast: false,
            local_name: None,
            capabilities: Capabilities::default(),
        }
    }
}

impl SuiteConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> CheckResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> CheckResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject values the runner cannot honor
    pub fn validate(&self) -> CheckResult<()> {
        self.poll
            .validate()
            .map_err(|err| CheckError::config(err.to_string()))?;
        if self.scenario_timeout_ms == 0 {
            return Err(CheckError::config("scenario_timeout_ms must be greater than 0"));
        }
        if self.concurrency == 0 {
            return Err(CheckError::config("concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Set the default poll budget
    #[must_use]
    pub const fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the per-scenario budget
    #[must_use]
    pub const fn with_scenario_timeout(mut self, ms: u64) -> Self {
        self.scenario_timeout_ms = ms;
        self
    }

    /// Set concurrency
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Enable fail-fast mode
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Set the local hostname
    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Set base capabilities
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Per-scenario budget as a Duration
    #[must_use]
    pub const fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = SuiteConfig::default();
        assert_eq!(config.concurrency, 1);
        assert!(!config.fail_fast);
        assert_eq!(config.scenario_timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = SuiteConfig::from_yaml_str(
            r#"
poll:
  interval_ms: 500
  timeout_ms: 7000
concurrency: 4
local_name: devbox.local
capabilities:
  platformName: iOS
  appiumVersion: "1.4.0"
"#,
        )
        .unwrap();
        assert_eq!(config.poll.interval_ms, 500);
        assert_eq!(config.poll.timeout_ms, Some(7000));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.local_name.as_deref(), Some("devbox.local"));
        assert_eq!(config.capabilities.appium_version(), Some(1.4));
        assert_eq!(config.scenario_timeout_ms, DEFAULT_SCENARIO_TIMEOUT_MS);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = SuiteConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SuiteConfig::default());
    }

    #[test]
    fn test_invalid_poll_rejected() {
        let err = SuiteConfig::from_yaml_str("poll:\n  max_attempts: 0\n").unwrap_err();
        assert!(matches!(err, CheckError::Config { .. }));
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = SuiteConfig::new().with_concurrency(0).validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_malformed_yaml_is_yaml_error() {
        let err = SuiteConfig::from_yaml_str("concurrency: [").unwrap_err();
        assert!(matches!(err, CheckError::Yaml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fail_fast: true\nscenario_timeout_ms: 60000").unwrap();
        let config = SuiteConfig::load(file.path()).unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.scenario_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = SuiteConfig::load("/nonexistent/appcheck.yaml").unwrap_err();
        assert!(matches!(err, CheckError::Io(_)));
    }
}
