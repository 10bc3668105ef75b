//! Assertions for scenario checks.
//!
//! Assertions build an [`AssertionResult`]; `into_result` turns a failure into
//! a [`CheckError::AssertionFailed`] so a check can `?` it and let the poller
//! retry.

use crate::driver::{Driver, ElementHandle, Locator};
use crate::result::{CheckError, CheckResult};
use regex::Regex;
use std::fmt::Debug;

/// Result of an assertion
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// Convert into a check result
    pub fn into_result(self) -> CheckResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(CheckError::assertion(self.message))
        }
    }
}

/// Assertion helpers for scenarios
#[derive(Debug)]
pub struct Assertion;

impl Assertion {
    /// Assert two values are equal
    #[must_use]
    pub fn equals<T: PartialEq + Debug + ?Sized>(expected: &T, actual: &T) -> AssertionResult {
        if expected == actual {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected {expected:?}, got {actual:?}"))
        }
    }

    /// Assert a string contains a substring
    #[must_use]
    pub fn contains(haystack: &str, needle: &str) -> AssertionResult {
        if haystack.contains(needle) {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected '{haystack}' to contain '{needle}'"))
        }
    }

    /// Assert a value is one of the candidates
    #[must_use]
    pub fn one_of<T: PartialEq + Debug>(candidates: &[T], actual: &T) -> AssertionResult {
        if candidates.contains(actual) {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected one of {candidates:?}, got {actual:?}"))
        }
    }

    /// Assert a count is strictly above a minimum
    #[must_use]
    pub fn above(what: &str, value: usize, min: usize) -> AssertionResult {
        if value > min {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected {what} to be above {min}, got {value}"))
        }
    }

    /// Assert a condition is true
    #[must_use]
    pub fn is_true(condition: bool, message: &str) -> AssertionResult {
        if condition {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(message)
        }
    }

    /// Assert a text against an expectation, honoring its leniency
    #[must_use]
    pub fn text(actual: &str, expectation: &TextMatch) -> AssertionResult {
        if expectation.matches(actual) {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "expected text {}, got '{actual}'",
                expectation.describe()
            ))
        }
    }
}

// =============================================================================
// TEXT EXPECTATIONS
// =============================================================================

/// What the text must look like
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Whole text equals
    Exact(String),
    /// Text contains
    Contains(String),
    /// Text matches a regular expression
    Regex(Regex),
}

/// Expected text plus opt-in leniency for quirky automation targets
///
/// `allow_empty` accepts `""` as well (some drivers report empty text for
/// elements that are present). `ignore_case` compares lowercased text; with
/// a regex pattern only the actual text is lowercased.
#[derive(Debug, Clone)]
pub struct TextMatch {
    pattern: TextPattern,
    allow_empty: bool,
    ignore_case: bool,
}

impl TextMatch {
    fn new(pattern: TextPattern) -> Self {
        Self {
            pattern,
            allow_empty: false,
            ignore_case: false,
        }
    }

    /// Whole text must equal `expected`
    #[must_use]
    pub fn exact(expected: impl Into<String>) -> Self {
        Self::new(TextPattern::Exact(expected.into()))
    }

    /// Text must contain `expected`
    #[must_use]
    pub fn contains(expected: impl Into<String>) -> Self {
        Self::new(TextPattern::Contains(expected.into()))
    }

    /// Text must match the regular expression
    pub fn pattern(pattern: &str) -> CheckResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|err| CheckError::config(format!("invalid text pattern '{pattern}': {err}")))?;
        Ok(Self::new(TextPattern::Regex(regex)))
    }

    /// Also accept the empty string
    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Compare case-insensitively
    #[must_use]
    pub const fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// The pattern being matched
    #[must_use]
    pub const fn kind(&self) -> &TextPattern {
        &self.pattern
    }

    /// Whether `actual` satisfies this expectation
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        if self.allow_empty && actual.is_empty() {
            return true;
        }
        let fold = |s: &str| {
            if self.ignore_case {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let actual = fold(actual);
        match &self.pattern {
            TextPattern::Exact(expected) => actual == fold(expected),
            TextPattern::Contains(expected) => actual.contains(&fold(expected)),
            TextPattern::Regex(regex) => regex.is_match(&actual),
        }
    }

    /// Human-readable description for failure messages
    #[must_use]
    pub fn describe(&self) -> String {
        let base = match &self.pattern {
            TextPattern::Exact(expected) => format!("equal to '{expected}'"),
            TextPattern::Contains(expected) => format!("containing '{expected}'"),
            TextPattern::Regex(regex) => format!("matching /{}/", regex.as_str()),
        };
        let mut qualifiers = Vec::new();
        if self.ignore_case {
            qualifiers.push("ignoring case");
        }
        if self.allow_empty {
            qualifiers.push("or empty");
        }
        if qualifiers.is_empty() {
            base
        } else {
            format!("{base} ({})", qualifiers.join(", "))
        }
    }
}

// =============================================================================
// DRIVER CHECKS
// =============================================================================

/// Page title contains `needle`; yields the title
pub async fn title_contains(driver: &dyn Driver, needle: &str) -> CheckResult<String> {
    let title = driver.title().await?;
    Assertion::contains(&title, needle).into_result()?;
    Ok(title)
}

/// More than `min` contexts are exposed; yields them
pub async fn contexts_above(driver: &dyn Driver, min: usize) -> CheckResult<Vec<String>> {
    let contexts = driver.contexts().await?;
    Assertion::above("context count", contexts.len(), min).into_result()?;
    Ok(contexts)
}

/// Text of the element at `locator` satisfies `expectation`; yields the text
pub async fn text_matches(
    driver: &dyn Driver,
    locator: &Locator,
    expectation: &TextMatch,
) -> CheckResult<String> {
    let element = driver.find_element(locator).await?;
    let text = driver.text(&element).await?;
    Assertion::text(&text, expectation).into_result()?;
    Ok(text)
}

/// Text of the element at `locator` contains `needle`; yields the text
pub async fn text_contains(
    driver: &dyn Driver,
    locator: &Locator,
    needle: &str,
) -> CheckResult<String> {
    text_matches(driver, locator, &TextMatch::contains(needle)).await
}

/// Attribute `name` of `element` satisfies `expectation`; yields the value
pub async fn attribute_matches(
    driver: &dyn Driver,
    element: &ElementHandle,
    name: &str,
    expectation: &TextMatch,
) -> CheckResult<String> {
    let value = driver.attribute(element, name).await?.unwrap_or_default();
    Assertion::text(&value, expectation).into_result()?;
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    mod assertion_tests {
        use super::*;

        #[test]
        fn test_equals() {
            assert!(Assertion::equals(&9, &9).passed);
            let failed = Assertion::equals("9", "10");
            assert!(!failed.passed);
            assert!(failed.message.contains("expected \"9\""));
        }

        #[test]
        fn test_one_of() {
            let candidates = ["Add Contact", "Save"];
            assert!(Assertion::one_of(&candidates, &"Save").passed);
            assert!(!Assertion::one_of(&candidates, &"Cancel").passed);
        }

        #[test]
        fn test_above() {
            assert!(Assertion::above("contexts", 2, 1).passed);
            let failed = Assertion::above("contexts", 1, 1);
            assert_eq!(failed.message, "expected contexts to be above 1, got 1");
        }

        #[test]
        fn test_into_result() {
            assert!(AssertionResult::pass().into_result().is_ok());
            let err = AssertionResult::fail("boom").into_result().unwrap_err();
            assert_eq!(err.to_string(), "Assertion failed: boom");
        }

        #[test]
        fn test_is_true() {
            assert!(Assertion::is_true(true, "x").passed);
            assert_eq!(Assertion::is_true(false, "x").message, "x");
        }
    }

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_exact_is_strict_by_default() {
            let expectation = TextMatch::exact("This is my way of saying hello");
            assert!(expectation.matches("This is my way of saying hello"));
            assert!(!expectation.matches(""));
        }

        #[test]
        fn test_allow_empty() {
            let expectation = TextMatch::exact("This is my way of saying hello").allow_empty();
            assert!(expectation.matches(""));
            assert!(!expectation.matches("Goodbye"));
        }

        #[test]
        fn test_ignore_case_contains() {
            let expectation = TextMatch::contains("Test String").ignore_case();
            assert!(expectation.matches("test string"));
            assert!(expectation.matches("TEST STRING!"));
            assert!(!TextMatch::contains("Test String").matches("test string"));
        }

        #[test]
        fn test_regex_pattern() {
            let expectation = TextMatch::pattern(r"^\d+$").unwrap();
            assert!(expectation.matches("9"));
            assert!(!expectation.matches("nine"));
        }

        #[test]
        fn test_invalid_regex_is_config_error() {
            let err = TextMatch::pattern("(").unwrap_err();
            assert!(matches!(err, CheckError::Config { .. }));
        }

        #[test]
        fn test_describe_lists_leniency() {
            let description = TextMatch::exact("hi").ignore_case().allow_empty().describe();
            assert_eq!(description, "equal to 'hi' (ignoring case, or empty)");
        }
    }

    mod driver_check_tests {
        use super::*;

        #[tokio::test]
        async fn test_title_contains() {
            let driver = MockDriver::new().with_title("I am a page title - Sauce Labs");
            let title = title_contains(&driver, "I am a page title").await.unwrap();
            assert!(title.ends_with("Sauce Labs"));
            assert!(title_contains(&driver, "Google").await.is_err());
        }

        #[tokio::test]
        async fn test_contexts_above() {
            let driver = MockDriver::new().with_contexts(&["NATIVE_APP", "WEBVIEW_1"]);
            assert_eq!(contexts_above(&driver, 1).await.unwrap().len(), 2);
            assert!(contexts_above(&driver, 2).await.is_err());
        }

        #[tokio::test]
        async fn test_text_matches() {
            let driver = MockDriver::new();
            let h1 = driver.add_element(Locator::tag_name("h1"), "h1");
            driver.push_text(&h1, "the server of awesome");
            let text = text_matches(
                &driver,
                &Locator::tag_name("h1"),
                &TextMatch::contains("server of awesome"),
            )
            .await
            .unwrap();
            assert_eq!(text, "the server of awesome");
            assert!(text_contains(&driver, &Locator::tag_name("h1"), "awesome")
                .await
                .is_ok());
        }

        #[tokio::test]
        async fn test_attribute_matches_missing_is_empty() {
            let driver = MockDriver::new();
            let input = driver.add_element(Locator::id("i_am_a_textbox"), "el-9");
            let lenient = TextMatch::exact("test string").allow_empty();
            assert_eq!(
                attribute_matches(&driver, &input, "value", &lenient)
                    .await
                    .unwrap(),
                ""
            );
            let strict = TextMatch::exact("test string");
            assert!(attribute_matches(&driver, &input, "value", &strict)
                .await
                .is_err());
        }
    }
}
