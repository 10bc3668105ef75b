//! Capabilities and Driver Profiles
//!
//! Desired capabilities are a free-form JSON object. The one value the
//! toolkit interprets is `appiumVersion`, which decides the
//! [`CapabilityProfile`] a session runs under. The profile is detected once
//! per session and every element lookup afterwards goes through a static
//! role × profile table instead of re-checking the capability.

use crate::driver::{Locator, Strategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Capability key holding the automation server version
pub const APPIUM_VERSION: &str = "appiumVersion";

/// Desired capabilities for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    /// Create empty capabilities
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a capability (builder form)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a capability
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a capability
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string capability
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Number of capabilities set
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no capability is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON object
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy of `self` with every key of `extra` applied on top
    #[must_use]
    pub fn merged(&self, extra: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &extra.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Numeric `appiumVersion`, read with float-prefix semantics (`"1.4.0"` is 1.4)
    #[must_use]
    pub fn appium_version(&self) -> Option<f64> {
        match self.get(APPIUM_VERSION)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_float_prefix(s),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Longest leading decimal number in `s`, if any
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - digits_start;
    if bytes.get(end) == Some(&b'.') {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while bytes.get(fraction_end).is_some_and(u8::is_ascii_digit) {
            fraction_end += 1;
        }
        digits += fraction_end - fraction_start;
        if digits > 0 {
            end = fraction_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

// =============================================================================
// PROFILES
// =============================================================================

/// Driver generation a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityProfile {
    /// Pre-1.0 servers: widgets are found by tag name
    #[default]
    Legacy,
    /// 1.0+ servers: platform class names and accessibility ids
    Current,
}

impl CapabilityProfile {
    /// Pick the profile from `appiumVersion`; absent or unparsable is legacy
    #[must_use]
    pub fn detect(capabilities: &Capabilities) -> Self {
        match capabilities.appium_version() {
            Some(version) if version >= 1.0 => Self::Current,
            _ => Self::Legacy,
        }
    }

    /// Display name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Current => "current",
        }
    }

    /// Locator for a UI role under this profile
    #[must_use]
    pub fn locator(self, role: ElementRole) -> Locator {
        let (strategy, value) = LOCATOR_TABLE[role as usize][self as usize];
        Locator::new(strategy, value)
    }
}

impl fmt::Display for CapabilityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// UI roles whose locator depends on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    /// iOS text input
    IosTextField,
    /// iOS button
    IosButton,
    /// iOS label
    IosStaticText,
    /// Android "Add Contact" action
    AndroidAddContact,
    /// Android text input
    AndroidEditText,
    /// Android button
    AndroidButton,
    /// Android check box
    AndroidCheckBox,
    /// Android embedded webview
    AndroidWebView,
}

impl ElementRole {
    /// Every role, in table order
    pub const ALL: [Self; 8] = [
        Self::IosTextField,
        Self::IosButton,
        Self::IosStaticText,
        Self::AndroidAddContact,
        Self::AndroidEditText,
        Self::AndroidButton,
        Self::AndroidCheckBox,
        Self::AndroidWebView,
    ];
}

/// Rows follow `ElementRole` order; columns are `[Legacy, Current]`.
const LOCATOR_TABLE: [[(Strategy, &str); 2]; 8] = [
    [
        (Strategy::TagName, "textField"),
        (Strategy::ClassName, "UIATextField"),
    ],
    [
        (Strategy::TagName, "button"),
        (Strategy::ClassName, "UIAButton"),
    ],
    [
        (Strategy::TagName, "staticText"),
        (Strategy::ClassName, "UIAStaticText"),
    ],
    [
        (Strategy::Name, "Add Contact"),
        (Strategy::AccessibilityId, "Add Contact"),
    ],
    [
        (Strategy::TagName, "textfield"),
        (Strategy::ClassName, "android.widget.EditText"),
    ],
    [
        (Strategy::TagName, "button"),
        (Strategy::ClassName, "android.widget.Button"),
    ],
    [
        (Strategy::XPath, "//checkBox"),
        (Strategy::XPath, "//android.widget.CheckBox"),
    ],
    [
        (Strategy::ClassName, "android.webkit.WebView"),
        (Strategy::ClassName, "android.webkit.WebView"),
    ],
];
