//! Driver - Abstract Automation Session Trait
//!
//! Scenarios and helpers only ever talk to a WebDriver/Appium session through
//! [`Driver`]. Implementations wrap a real client; the crate itself ships only
//! the scripted [`MockDriver`] used by its own tests.
//!
//! Every method takes `&self`: a driver is a handle onto a remote session, so
//! checks handed to the poller can borrow it freely between attempts.

use crate::capabilities::Capabilities;
use crate::result::{CheckError, CheckResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Name of the native (non-web) context exposed by mobile drivers
pub const NATIVE_CONTEXT: &str = "NATIVE_APP";

/// Element location strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Element id attribute
    Id,
    /// Platform class name (`UIATextField`, `android.widget.Button`)
    ClassName,
    /// Tag name (legacy mobile drivers use it for widget types)
    TagName,
    /// Accessibility identifier
    AccessibilityId,
    /// Element name
    Name,
    /// XPath expression
    XPath,
    /// CSS selector
    Css,
}

impl Strategy {
    /// Wire name of the strategy
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ClassName => "class name",
            Self::TagName => "tag name",
            Self::AccessibilityId => "accessibility id",
            Self::Name => "name",
            Self::XPath => "xpath",
            Self::Css => "css selector",
        }
    }
}

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Location strategy
    pub strategy: Strategy,
    /// Strategy-specific value
    pub value: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Locate by id
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Locate by class name
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, value)
    }

    /// Locate by tag name
    #[must_use]
    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::TagName, value)
    }

    /// Locate by accessibility id
    #[must_use]
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, value)
    }

    /// Locate by name
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    /// Locate by XPath
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Strategy::Css, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.as_str(), self.value)
    }
}

/// Handle to an element inside the remote session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Abstract automation session
///
/// # Implementations
///
/// - Adapters over a WebDriver/Appium client live outside this crate
/// - [`MockDriver`] - scripted double for unit testing
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> CheckResult<()>;

    /// Current page title
    async fn title(&self) -> CheckResult<String>;

    /// Page or view hierarchy source
    async fn source(&self) -> CheckResult<String>;

    /// Go back in history
    async fn back(&self) -> CheckResult<()>;

    /// Available contexts (native and webviews)
    async fn contexts(&self) -> CheckResult<Vec<String>>;

    /// Currently selected context
    async fn current_context(&self) -> CheckResult<String>;

    /// Switch to a context
    async fn set_context(&self, name: &str) -> CheckResult<()>;

    /// Find the first element matching the locator
    async fn find_element(&self, locator: &Locator) -> CheckResult<ElementHandle>;

    /// Find all elements matching the locator
    async fn find_elements(&self, locator: &Locator) -> CheckResult<Vec<ElementHandle>>;

    /// Visible text of an element
    async fn text(&self, element: &ElementHandle) -> CheckResult<String>;

    /// Attribute value of an element
    async fn attribute(&self, element: &ElementHandle, name: &str) -> CheckResult<Option<String>>;

    /// Type into an element
    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> CheckResult<()>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> CheckResult<()>;

    /// Clear an input element
    async fn clear(&self, element: &ElementHandle) -> CheckResult<()>;

    /// End the session
    async fn quit(&self) -> CheckResult<()>;
}

/// Shared session handles drive the same remote session
#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    async fn navigate(&self, url: &str) -> CheckResult<()> {
        (**self).navigate(url).await
    }

    async fn title(&self) -> CheckResult<String> {
        (**self).title().await
    }

    async fn source(&self) -> CheckResult<String> {
        (**self).source().await
    }

    async fn back(&self) -> CheckResult<()> {
        (**self).back().await
    }

    async fn contexts(&self) -> CheckResult<Vec<String>> {
        (**self).contexts().await
    }

    async fn current_context(&self) -> CheckResult<String> {
        (**self).current_context().await
    }

    async fn set_context(&self, name: &str) -> CheckResult<()> {
        (**self).set_context(name).await
    }

    async fn find_element(&self, locator: &Locator) -> CheckResult<ElementHandle> {
        (**self).find_element(locator).await
    }

    async fn find_elements(&self, locator: &Locator) -> CheckResult<Vec<ElementHandle>> {
        (**self).find_elements(locator).await
    }

    async fn text(&self, element: &ElementHandle) -> CheckResult<String> {
        (**self).text(element).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> CheckResult<Option<String>> {
        (**self).attribute(element, name).await
    }

    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> CheckResult<()> {
        (**self).send_keys(element, keys).await
    }

    async fn click(&self, element: &ElementHandle) -> CheckResult<()> {
        (**self).click(element).await
    }

    async fn clear(&self, element: &ElementHandle) -> CheckResult<()> {
        (**self).clear(element).await
    }

    async fn quit(&self) -> CheckResult<()> {
        (**self).quit().await
    }
}

/// Opens sessions for scenarios
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Start a session with the merged capabilities
    async fn start(&self, capabilities: &Capabilities) -> CheckResult<Box<dyn Driver>>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Values handed out one per call; the final value repeats forever
#[derive(Debug, Clone, Default)]
struct Script<T: Clone> {
    queue: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn push(&mut self, value: T) {
        self.queue.push_back(value);
    }

    fn advance(&mut self) -> Option<T> {
        if self.queue.len() > 1 {
            self.queue.pop_front()
        } else {
            self.queue.front().cloned()
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    titles: Script<String>,
    contexts: Script<Vec<String>>,
    current_context: String,
    source: String,
    elements: HashMap<Locator, Vec<ElementHandle>>,
    texts: HashMap<String, Script<String>>,
    attributes: HashMap<(String, String), Script<String>>,
    failing: HashMap<String, String>,
    history: Vec<String>,
}

/// Scripted driver for unit testing
///
/// Sequences (titles, contexts, texts, attributes) advance once per call and
/// keep returning their last value, which is how a slowly-settling UI looks
/// to a poller.
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver in the native context
    #[must_use]
    pub fn new() -> Self {
        let state = MockState {
            current_context: NATIVE_CONTEXT.to_string(),
            ..MockState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: String) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.history.push(call);
        state
    }

    /// Queue a title
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state().titles.push(title.into());
        self
    }

    /// Queue a contexts listing
    #[must_use]
    pub fn with_contexts(self, contexts: &[&str]) -> Self {
        let contexts = contexts.iter().map(|c| (*c).to_string()).collect();
        self.state().contexts.push(contexts);
        self
    }

    /// Set page source
    #[must_use]
    pub fn with_source(self, source: impl Into<String>) -> Self {
        self.state().source = source.into();
        self
    }

    /// Register an element under a locator, returning its handle
    pub fn add_element(&self, locator: Locator, id: impl Into<String>) -> ElementHandle {
        let handle = ElementHandle::new(id);
        self.state()
            .elements
            .entry(locator)
            .or_default()
            .push(handle.clone());
        handle
    }

    /// Queue a text value for an element
    pub fn push_text(&self, element: &ElementHandle, text: impl Into<String>) {
        self.state()
            .texts
            .entry(element.id.clone())
            .or_default()
            .push(text.into());
    }

    /// Queue an attribute value for an element
    pub fn push_attribute(
        &self,
        element: &ElementHandle,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.state()
            .attributes
            .entry((element.id.clone(), name.into()))
            .or_default()
            .push(value.into());
    }

    /// Make every call of `method` fail with `message`
    pub fn fail_on(&self, method: impl Into<String>, message: impl Into<String>) {
        self.state().failing.insert(method.into(), message.into());
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Number of calls whose record starts with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    fn check_failure(state: &MockState, method: &str) -> CheckResult<()> {
        state
            .failing
            .get(method)
            .map_or(Ok(()), |message| Err(CheckError::driver(message.clone())))
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> CheckResult<()> {
        let state = self.record(format!("navigate:{url}"));
        Self::check_failure(&state, "navigate").map_err(|err| CheckError::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    async fn title(&self) -> CheckResult<String> {
        let mut state = self.record("title".to_string());
        Self::check_failure(&state, "title")?;
        Ok(state.titles.advance().unwrap_or_default())
    }

    async fn source(&self) -> CheckResult<String> {
        let state = self.record("source".to_string());
        Self::check_failure(&state, "source")?;
        Ok(state.source.clone())
    }

    async fn back(&self) -> CheckResult<()> {
        let state = self.record("back".to_string());
        Self::check_failure(&state, "back")
    }

    async fn contexts(&self) -> CheckResult<Vec<String>> {
        let mut state = self.record("contexts".to_string());
        Self::check_failure(&state, "contexts")?;
        Ok(state
            .contexts
            .advance()
            .unwrap_or_else(|| vec![NATIVE_CONTEXT.to_string()]))
    }

    async fn current_context(&self) -> CheckResult<String> {
        let state = self.record("current_context".to_string());
        Ok(state.current_context.clone())
    }

    async fn set_context(&self, name: &str) -> CheckResult<()> {
        let mut state = self.record(format!("set_context:{name}"));
        Self::check_failure(&state, "set_context")?;
        state.current_context = name.to_string();
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> CheckResult<ElementHandle> {
        let state = self.record(format!("find_element:{locator}"));
        state
            .elements
            .get(locator)
            .and_then(|found| found.first().cloned())
            .ok_or_else(|| CheckError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    async fn find_elements(&self, locator: &Locator) -> CheckResult<Vec<ElementHandle>> {
        let state = self.record(format!("find_elements:{locator}"));
        Ok(state.elements.get(locator).cloned().unwrap_or_default())
    }

    async fn text(&self, element: &ElementHandle) -> CheckResult<String> {
        let mut state = self.record(format!("text:{}", element.id));
        Self::check_failure(&state, "text")?;
        Ok(state
            .texts
            .get_mut(&element.id)
            .and_then(Script::advance)
            .unwrap_or_default())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> CheckResult<Option<String>> {
        let mut state = self.record(format!("attribute:{}:{name}", element.id));
        Ok(state
            .attributes
            .get_mut(&(element.id.clone(), name.to_string()))
            .and_then(Script::advance))
    }

    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> CheckResult<()> {
        let state = self.record(format!("send_keys:{}:{keys}", element.id));
        Self::check_failure(&state, "send_keys")
    }

    async fn click(&self, element: &ElementHandle) -> CheckResult<()> {
        let state = self.record(format!("click:{}", element.id));
        Self::check_failure(&state, "click")
    }

    async fn clear(&self, element: &ElementHandle) -> CheckResult<()> {
        let state = self.record(format!("clear:{}", element.id));
        Self::check_failure(&state, "clear")
    }

    async fn quit(&self) -> CheckResult<()> {
        let state = self.record("quit".to_string());
        Self::check_failure(&state, "quit")
    }
}
