//! End-to-end suite runs against scripted drivers.
//!
//! Each scenario mirrors a real device check (guinea-pig page, iOS sum app,
//! hybrid webview, location services) with the remote session replaced by a
//! `MockDriver`.

#![allow(clippy::unwrap_used)]

use appcheck::prelude::*;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct SharedFactory {
    driver: Arc<MockDriver>,
    started: Mutex<Vec<Capabilities>>,
}

impl SharedFactory {
    fn new(driver: MockDriver) -> Self {
        Self {
            driver: Arc::new(driver),
            started: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DriverFactory for SharedFactory {
    async fn start(&self, capabilities: &Capabilities) -> CheckResult<Box<dyn Driver>> {
        self.started.lock().unwrap().push(capabilities.clone());
        Ok(Box::new(Arc::clone(&self.driver)))
    }
}

// === Scenarios ===

fn guinea_pig(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        let driver = session.driver();
        driver
            .navigate("http://saucelabs.com/test/guinea-pig")
            .await?;
        session.wait_for_title("I am a page title").await?;
        let comments = driver.find_element(&Locator::id("comments")).await?;
        driver.send_keys(&comments, "Hello! I am fine").await?;
        let submit = driver.find_element(&Locator::id("submit")).await?;
        driver.click(&submit).await?;
        let echo = Locator::id("your_comments");
        retry_interval(10, 1_000, || text_contains(driver, &echo, "Hello! I am fine")).await?;
        Ok(())
    })
}

fn ios_sum(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        let driver = session.driver();
        let fields = session.elements(ElementRole::IosTextField).await?;
        // Some servers report the UIAutomation helper fields too.
        let (first, second) = match fields.as_slice() {
            [first, second] | [first, _, second, _] => (first, second),
            other => {
                return Err(CheckError::assertion(format!(
                    "unexpected number of text fields: {}",
                    other.len()
                )))
            }
        };
        driver.send_keys(first, "4").await?;
        driver.send_keys(second, "5").await?;
        driver
            .click(&session.element(ElementRole::IosButton).await?)
            .await?;
        let label = session.element(ElementRole::IosStaticText).await?;
        let text = driver.text(&label).await?;
        Assertion::equals("9", text.as_str()).into_result()
    })
}

fn ios_hybrid(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        let driver = session.driver();
        switch_to_last(driver).await?;
        driver.navigate("http://google.com").await?;
        session.wait_for_title("Google").await?;
        switch_to_first(driver).await?;
        Assertion::contains(&driver.source().await?, "<AppiumAUT>").into_result()
    })
}

fn location_services(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        let driver = session.driver();
        retry_interval(5, 1_000, || async move {
            let switch = driver.find_element(&Locator::class_name("UIASwitch")).await?;
            attribute_matches(driver, &switch, "value", &TextMatch::exact("1")).await
        })
        .await?;
        Ok(())
    })
}

fn local_name(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        let host = session.local_name()?;
        let driver = session.driver();
        driver.navigate(&format!("http://{host}:8000")).await?;
        text_contains(driver, &Locator::tag_name("h1"), "the server of awesome").await?;
        Ok(())
    })
}

fn https_self_signed(session: &Session) -> BoxFuture<'_, CheckResult<()>> {
    Box::pin(async move {
        session
            .driver()
            .navigate("https://selfsigned.buildslave.saucelabs.com")
            .await?;
        session.wait_for_title("Sauce Labs").await?;
        Ok(())
    })
}

fn guinea_pig_driver() -> MockDriver {
    let driver = MockDriver::new()
        .with_title("")
        .with_title("I am a page title - Sauce Labs");
    driver.add_element(Locator::id("comments"), "el-comments");
    driver.add_element(Locator::id("submit"), "el-submit");
    let echo = driver.add_element(Locator::id("your_comments"), "el-echo");
    driver.push_text(&echo, "");
    driver.push_text(&echo, "");
    driver.push_text(&echo, "Your comments: Hello! I am fine");
    driver
}

// === Tests ===

#[tokio::test(start_paused = true)]
async fn test_guinea_pig_settles_and_passes() {
    let factory = SharedFactory::new(guinea_pig_driver());
    let mut suite = Suite::new(SuiteConfig::default());
    suite
        .register(Scenario::new("guinea_pig", guinea_pig))
        .unwrap();

    let results = suite.run_all(&factory).await;

    assert!(results.all_passed(), "{:?}", results.failures());
    let driver = &factory.driver;
    assert_eq!(driver.call_count("title"), 2);
    assert_eq!(driver.call_count("text:el-echo"), 3);
    assert!(driver
        .history()
        .contains(&"send_keys:el-comments:Hello! I am fine".to_string()));
    // One second for the title, two for the comment echo.
    assert_eq!(results.duration, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_ios_sum_uses_legacy_locators() {
    let driver = MockDriver::new();
    driver.add_element(Locator::tag_name("textField"), "f1");
    driver.add_element(Locator::tag_name("textField"), "f2");
    driver.add_element(Locator::tag_name("button"), "compute");
    let label = driver.add_element(Locator::tag_name("staticText"), "answer");
    driver.push_text(&label, "9");
    let factory = SharedFactory::new(driver);

    let config = SuiteConfig::new()
        .with_capabilities(Capabilities::new().with(APPIUM_VERSION, "0.18.2"));
    let mut suite = Suite::new(config);
    suite.register(Scenario::new("ios_sum", ios_sum)).unwrap();

    let result = suite.run_one(&factory, "ios_sum").await.unwrap();
    assert!(result.passed(), "{:?}", result.error);
    assert!(factory.driver.was_called("send_keys:f2:5"));
}

#[tokio::test(start_paused = true)]
async fn test_ios_sum_current_profile_with_helper_fields() {
    let driver = MockDriver::new();
    for id in ["f1", "helper1", "f2", "helper2"] {
        driver.add_element(Locator::class_name("UIATextField"), id);
    }
    driver.add_element(Locator::class_name("UIAButton"), "compute");
    let label = driver.add_element(Locator::class_name("UIAStaticText"), "answer");
    driver.push_text(&label, "10");
    let factory = SharedFactory::new(driver);

    let config = SuiteConfig::new()
        .with_capabilities(Capabilities::new().with(APPIUM_VERSION, "1.4.0"));
    let mut suite = Suite::new(config);
    suite.register(Scenario::new("ios_sum", ios_sum)).unwrap();

    let result = suite.run_one(&factory, "ios_sum").await.unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.error.unwrap().contains("\"10\""));
    assert!(factory.driver.was_called("send_keys:f2:5"));
    assert!(!factory.driver.was_called("send_keys:helper1"));
}

#[tokio::test(start_paused = true)]
async fn test_hybrid_requires_current_profile() {
    let factory = SharedFactory::new(
        MockDriver::new()
            .with_contexts(&["NATIVE_APP", "WEBVIEW_1"])
            .with_title("Google")
            .with_source("<AppiumAUT><UIAApplication/></AppiumAUT>"),
    );
    let mut suite = Suite::new(SuiteConfig::default());
    suite
        .register(Scenario::new("ios_hybrid", ios_hybrid).requires_current_profile())
        .unwrap();

    let legacy = suite.run_one(&factory, "ios_hybrid").await.unwrap();
    assert_eq!(legacy.outcome, Outcome::Failed);
    assert!(!factory.driver.was_called("navigate"));

    let config = SuiteConfig::new()
        .with_capabilities(Capabilities::new().with(APPIUM_VERSION, "1.3"));
    let mut suite = Suite::new(config);
    suite
        .register(Scenario::new("ios_hybrid", ios_hybrid).requires_current_profile())
        .unwrap();
    let current = suite.run_one(&factory, "ios_hybrid").await.unwrap();
    assert!(current.passed(), "{:?}", current.error);
    assert_eq!(
        factory.driver.current_context().await.unwrap(),
        "NATIVE_APP"
    );
}

#[tokio::test(start_paused = true)]
async fn test_location_services_extra_caps_and_retry() {
    let driver = MockDriver::new();
    let switch = driver.add_element(Locator::class_name("UIASwitch"), "loc-switch");
    driver.push_attribute(&switch, "value", "0");
    driver.push_attribute(&switch, "value", "1");
    let factory = SharedFactory::new(driver);

    let mut suite = Suite::new(SuiteConfig::default());
    suite
        .register(
            Scenario::new("location_services", location_services)
                .with_capability("locationServicesAuthorized", true)
                .with_capability("locationServicesEnabled", true)
                .with_capability("bundleId", "io.appium.TestApp"),
        )
        .unwrap();

    let results = suite.run_all(&factory).await;
    assert!(results.all_passed());
    let caps = factory.started.lock().unwrap()[0].clone();
    assert_eq!(caps.get_str("bundleId"), Some("io.appium.TestApp"));
    assert_eq!(factory.driver.call_count("attribute:loc-switch:value"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_local_name_needs_interesting_host() {
    let driver = MockDriver::new();
    let h1 = driver.add_element(Locator::tag_name("h1"), "h1");
    driver.push_text(&h1, "Welcome to the server of awesome");
    let factory = SharedFactory::new(driver);

    let mut suite = Suite::new(SuiteConfig::new().with_local_name("localhost"));
    suite.register(Scenario::new("local_name", local_name)).unwrap();
    let result = suite.run_one(&factory, "local_name").await.unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(!factory.driver.was_called("navigate"));

    let mut suite = Suite::new(SuiteConfig::new().with_local_name("devbox.example.com"));
    suite.register(Scenario::new("local_name", local_name)).unwrap();
    let result = suite.run_one(&factory, "local_name").await.unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.error.unwrap().contains("not a .local hostname"));
    assert!(!factory.driver.was_called("navigate"));

    let mut suite = Suite::new(SuiteConfig::new().with_local_name("devbox.local"));
    suite.register(Scenario::new("local_name", local_name)).unwrap();
    let result = suite.run_one(&factory, "local_name").await.unwrap();
    assert!(result.passed(), "{:?}", result.error);
    assert!(factory.driver.was_called("navigate:http://devbox.local:8000"));
}

#[tokio::test(start_paused = true)]
async fn test_suite_from_yaml_runs_with_concurrency() {
    let config = SuiteConfig::from_yaml_str(
        r#"
concurrency: 2
scenario_timeout_ms: 5000
poll:
  timeout_ms: 3000
  interval_ms: 1000
capabilities:
  browserName: safari
"#,
    )
    .unwrap();
    let factory = SharedFactory::new(MockDriver::new().with_title("Blank"));
    let mut suite = Suite::new(config);
    suite
        .register(Scenario::new("guinea_pig", guinea_pig))
        .unwrap();
    suite
        .register(
            Scenario::new("https_self_signed", https_self_signed)
                .with_capability("keepKeyChains", true),
        )
        .unwrap();

    let results = suite.run_all(&factory).await;

    assert_eq!(results.total(), 2);
    assert_eq!(results.failed_count(), 2);
    for failure in results.failures() {
        assert_eq!(failure.outcome, Outcome::Failed);
        assert!(failure.error.as_deref().unwrap().contains("gave up after 3 attempt(s)"));
    }
    // Both waits ran side by side: three attempts each, one second apart.
    assert_eq!(results.duration, Duration::from_secs(2));
    assert_eq!(factory.driver.call_count("quit"), 2);
}
