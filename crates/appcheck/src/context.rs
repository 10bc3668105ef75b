//! Webview Context Selection
//!
//! Hybrid apps expose a native context plus one or more webviews, and the
//! webviews show up some time after launch. [`select_webview`] waits for them
//! and switches the session into the first one.

use crate::assertion::contexts_above;
use crate::driver::{Driver, NATIVE_CONTEXT};
use crate::result::{CheckError, CheckResult};
use crate::wait::{PollConfig, Poller};
use tracing::info;

/// Whether a context name refers to a webview
#[must_use]
pub fn is_webview(context: &str) -> bool {
    context != NATIVE_CONTEXT
}

/// Wait for a webview to appear, then switch into it; yields its name
pub async fn select_webview(driver: &dyn Driver, poll: PollConfig) -> CheckResult<String> {
    let contexts = Poller::new(poll)
        .describe("more than one context available")
        .run(|| contexts_above(driver, 1))
        .await?;

    let webview = contexts
        .iter()
        .find(|c| is_webview(c))
        .cloned()
        .ok_or_else(|| CheckError::NoWebview {
            contexts: contexts.clone(),
        })?;
    driver.set_context(&webview).await?;
    info!(context = %webview, "switched to webview");
    Ok(webview)
}

/// Switch to the most recently listed context; yields its name
pub async fn switch_to_last(driver: &dyn Driver) -> CheckResult<String> {
    switch_to(driver, |contexts| contexts.last()).await
}

/// Switch to the first listed context; yields its name
pub async fn switch_to_first(driver: &dyn Driver) -> CheckResult<String> {
    switch_to(driver, |contexts| contexts.first()).await
}

async fn switch_to<F>(driver: &dyn Driver, pick: F) -> CheckResult<String>
where
    F: FnOnce(&[String]) -> Option<&String>,
{
    let contexts = driver.contexts().await?;
    let target = pick(contexts.as_slice())
        .cloned()
        .ok_or_else(|| CheckError::driver("driver reported no contexts"))?;
    driver.set_context(&target).await?;
    Ok(target)
}
