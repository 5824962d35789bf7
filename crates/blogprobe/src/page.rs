//! Page capability and auto-waiting page wrapper.
//!
//! [`PageDriver`] is the narrow interface every browser backend implements:
//! find by selector, click, fill, read text and computed style, evaluate a
//! script. [`Page`] adds the harness timing rules on top of any driver:
//! actions wait until their target is actionable, waits poll on the
//! configured interval, and every awaited step is bounded by a timeout.
//!
//! # Implementations
//!
//! - `ChromiumDriver` - chromiumoxide over CDP (`browser` feature)
//! - [`MockDriver`] - scripted elements, for unit testing

use crate::config::HarnessConfig;
use crate::dialog::DialogHandler;
use crate::locator::{Locator, Selector};
use crate::network::SharedRouter;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Abstract page interaction capability
///
/// Driver methods act once and return immediately; waiting is the job of
/// [`Page`]. `click` and `fill` act on the first match.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load event
    async fn goto(&mut self, url: &str) -> ProbeResult<()>;

    /// Number of elements matching the selector, rendered or not
    async fn count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// True when at least one match is rendered
    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool>;

    /// Click the first match
    async fn click(&mut self, selector: &Selector) -> ProbeResult<()>;

    /// Replace the value of the first match
    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()>;

    /// Text content of every match, in document order
    async fn text_content(&self, selector: &Selector) -> ProbeResult<Vec<String>>;

    /// Computed style property of the first rendered match
    async fn computed_style(
        &self,
        selector: &Selector,
        property: &str,
    ) -> ProbeResult<Option<String>>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&mut self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Route page requests through a router
    async fn install_router(&mut self, router: SharedRouter) -> ProbeResult<()>;

    /// Answer page dialogs with a handler
    async fn install_dialog_handler(&mut self, handler: DialogHandler) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Close the page and stop its listeners
    async fn close(&mut self) -> ProbeResult<()>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// Scripted element for [`MockDriver`]
///
/// `appears_after` and `vanishes_after` count visibility and count queries
/// against the element, which lets tests script elements that show up or
/// go away while a [`Page`] is polling.
#[derive(Debug)]
pub struct MockElement {
    selector: Selector,
    container: Option<String>,
    text: String,
    value: String,
    rendered: bool,
    styles: HashMap<String, String>,
    appears_after: usize,
    vanishes_after: Option<usize>,
    polls: AtomicUsize,
}

impl MockElement {
    /// Visible element matched by `selector`
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            container: None,
            text: String::new(),
            value: String::new(),
            rendered: true,
            styles: HashMap::new(),
            appears_after: 0,
            vanishes_after: None,
            polls: AtomicUsize::new(0),
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Place inside a container whose text is `text`, for scoped selectors
    #[must_use]
    pub fn in_container(mut self, text: impl Into<String>) -> Self {
        self.container = Some(text.into());
        self
    }

    /// Attached to the DOM but not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.rendered = false;
        self
    }

    /// Set a computed style property
    #[must_use]
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(property.into(), value.into());
        self
    }

    /// Absent for the first `polls` queries
    #[must_use]
    pub const fn appears_after(mut self, polls: usize) -> Self {
        self.appears_after = polls;
        self
    }

    /// Removed from the DOM after `polls` queries
    #[must_use]
    pub const fn vanishes_after(mut self, polls: usize) -> Self {
        self.vanishes_after = Some(polls);
        self
    }

    /// Current input value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether `selector` resolves to this element
    #[must_use]
    pub fn is_match(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Within { text, inner } => {
                self.container
                    .as_deref()
                    .is_some_and(|c| c.contains(text.as_str()))
                    && self.is_match(inner)
            }
            other => &self.selector == other,
        }
    }

    fn attached_at(&self, poll: usize) -> bool {
        poll >= self.appears_after && self.vanishes_after.map_or(true, |n| poll < n)
    }

    /// Attachment as seen by a query; advances the poll counter
    fn poll(&self) -> bool {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        self.attached_at(poll)
    }

    /// Attachment without advancing the poll counter
    fn attached(&self) -> bool {
        self.attached_at(self.polls.load(Ordering::SeqCst))
    }
}

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Current URL
    pub current_url: String,
    /// Scripted elements
    pub elements: Vec<MockElement>,
    /// Queued results for `evaluate`, returned in order
    pub js_results: VecDeque<serde_json::Value>,
    /// Call history for verification
    pub call_history: Vec<String>,
    /// Installed router
    pub router: Option<SharedRouter>,
    /// Installed dialog handler
    pub dialogs: Option<DialogHandler>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scripted element
    pub fn add_element(&mut self, element: MockElement) {
        self.elements.push(element);
    }

    /// Builder form of [`Self::add_element`]
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.add_element(element);
        self
    }

    /// Queue a result for the next `evaluate`
    pub fn set_js_result(&mut self, result: serde_json::Value) {
        self.js_results.push_back(result);
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Value last filled into the element matched by `selector`
    #[must_use]
    pub fn value_of(&self, selector: &Selector) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.is_match(selector))
            .map(MockElement::value)
    }

    fn matches<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = &'a MockElement> {
        self.elements.iter().filter(move |e| e.is_match(selector))
    }

    fn first_attached_mut(&mut self, selector: &Selector) -> ProbeResult<&mut MockElement> {
        self.elements
            .iter_mut()
            .find(|e| e.is_match(selector) && e.attached())
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: selector.to_string(),
            })
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.call_history.push(format!("goto:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        Ok(self.matches(selector).filter(|e| e.poll()).count())
    }

    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool> {
        // Poll every match so scripted timings advance uniformly.
        let polled: Vec<bool> = self
            .matches(selector)
            .map(|e| e.poll() && e.rendered)
            .collect();
        Ok(polled.into_iter().any(|r| r))
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.first_attached_mut(selector)?;
        self.call_history.push(format!("click:{selector}"));
        Ok(())
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()> {
        self.first_attached_mut(selector)?.value = value.to_string();
        self.call_history.push(format!("fill:{selector}={value}"));
        Ok(())
    }

    async fn text_content(&self, selector: &Selector) -> ProbeResult<Vec<String>> {
        Ok(self
            .matches(selector)
            .filter(|e| e.attached())
            .map(|e| e.text.clone())
            .collect())
    }

    async fn computed_style(
        &self,
        selector: &Selector,
        property: &str,
    ) -> ProbeResult<Option<String>> {
        Ok(self
            .matches(selector)
            .find(|e| e.attached() && e.rendered)
            .and_then(|e| e.styles.get(property).cloned()))
    }

    async fn evaluate(&mut self, script: &str) -> ProbeResult<serde_json::Value> {
        self.call_history.push(format!("evaluate:{}", script.len()));
        Ok(self.js_results.pop_front().unwrap_or(serde_json::Value::Null))
    }

    async fn install_router(&mut self, router: SharedRouter) -> ProbeResult<()> {
        self.call_history.push("install_router".to_string());
        self.router = Some(router);
        Ok(())
    }

    async fn install_dialog_handler(&mut self, handler: DialogHandler) -> ProbeResult<()> {
        self.call_history.push("install_dialog_handler".to_string());
        self.dialogs = Some(handler);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.current_url.clone())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.call_history.push("close".to_string());
        Ok(())
    }
}

// ============================================================================
// Auto-waiting page
// ============================================================================

/// Page wrapper applying auto-wait and timeouts to a driver
#[derive(Debug)]
pub struct Page<D: PageDriver> {
    driver: D,
    config: HarnessConfig,
}

impl<D: PageDriver> Page<D> {
    /// Wrap a driver
    pub fn new(driver: D, config: HarnessConfig) -> Self {
        Self { driver, config }
    }

    /// Get the driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Get the driver mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Unwrap the driver
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Get configuration
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Navigate, bounded by the navigation timeout
    pub async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        let budget = self.config.navigation_timeout();
        let what = format!("navigation to {url}");
        tracing::debug!(url, "goto");
        bounded(Instant::now() + budget, budget, &what, self.driver.goto(url)).await
    }

    /// Click once the target is actionable
    pub async fn click(&mut self, locator: impl Into<Locator>) -> ProbeResult<()> {
        let locator = locator.into();
        let deadline = self.wait_actionable(&locator).await?;
        let budget = locator.timeout_or(self.config.action_timeout());
        let what = format!("click on {locator}");
        bounded(deadline, budget, &what, self.driver.click(locator.selector())).await
    }

    /// Fill once the target is actionable
    pub async fn fill(&mut self, locator: impl Into<Locator>, value: &str) -> ProbeResult<()> {
        let locator = locator.into();
        let deadline = self.wait_actionable(&locator).await?;
        let budget = locator.timeout_or(self.config.action_timeout());
        let what = format!("fill of {locator}");
        bounded(
            deadline,
            budget,
            &what,
            self.driver.fill(locator.selector(), value),
        )
        .await
    }

    /// Evaluate a script, bounded by the action timeout
    pub async fn evaluate(&mut self, script: &str) -> ProbeResult<serde_json::Value> {
        let budget = self.config.action_timeout();
        bounded(
            Instant::now() + budget,
            budget,
            "script evaluation",
            self.driver.evaluate(script),
        )
        .await
    }

    /// Poll until any match is rendered
    pub async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        let deadline = Instant::now() + timeout;
        let what = format!("{locator} to be visible");
        loop {
            if bounded(deadline, timeout, &what, self.driver.is_visible(locator.selector()))
                .await?
            {
                return Ok(());
            }
            self.tick(deadline, timeout, &what).await?;
        }
    }

    /// Poll until no match is rendered; absent elements count as hidden
    pub async fn wait_for_hidden(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        let deadline = Instant::now() + timeout;
        let what = format!("{locator} to be hidden");
        loop {
            if !bounded(deadline, timeout, &what, self.driver.is_visible(locator.selector()))
                .await?
            {
                return Ok(());
            }
            self.tick(deadline, timeout, &what).await?;
        }
    }

    /// Whether any match is rendered right now
    pub async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        self.driver.is_visible(locator.selector()).await
    }

    /// Number of matches right now
    pub async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        self.driver.count(locator.selector()).await
    }

    /// Text of every match right now
    pub async fn text_content(&self, locator: &Locator) -> ProbeResult<Vec<String>> {
        self.driver.text_content(locator.selector()).await
    }

    /// Computed style of the first rendered match right now
    pub async fn computed_style(
        &self,
        locator: &Locator,
        property: &str,
    ) -> ProbeResult<Option<String>> {
        self.driver.computed_style(locator.selector(), property).await
    }

    /// Route requests through a router
    pub async fn install_router(&mut self, router: SharedRouter) -> ProbeResult<()> {
        self.driver.install_router(router).await
    }

    /// Answer dialogs with a handler
    pub async fn install_dialog_handler(&mut self, handler: DialogHandler) -> ProbeResult<()> {
        self.driver.install_dialog_handler(handler).await
    }

    /// Get current URL
    pub async fn current_url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Close the page
    pub async fn close(&mut self) -> ProbeResult<()> {
        self.driver.close().await
    }

    /// Wait until exactly one rendered target exists (or the first, when not
    /// strict). Returns the deadline left for the action itself.
    async fn wait_actionable(&self, locator: &Locator) -> ProbeResult<Instant> {
        let budget = locator.timeout_or(self.config.action_timeout());
        let deadline = Instant::now() + budget;
        let what = format!("{locator} to be actionable");
        let selector = locator.selector();
        let mut seen = false;

        loop {
            let count = bounded(deadline, budget, &what, self.driver.count(selector)).await?;
            if count > 1 && locator.options().strict {
                return Err(ProbeError::StrictModeViolation {
                    selector: locator.to_string(),
                    count,
                });
            }
            if count > 0 {
                seen = true;
                if bounded(deadline, budget, &what, self.driver.is_visible(selector)).await? {
                    return Ok(deadline);
                }
            }
            if let Err(err) = self.tick(deadline, budget, &what).await {
                return Err(if seen {
                    err
                } else {
                    ProbeError::ElementNotFound {
                        selector: locator.to_string(),
                    }
                });
            }
        }
    }

    /// Sleep one poll interval, or fail if the deadline has passed
    async fn tick(&self, deadline: Instant, budget: Duration, what: &str) -> ProbeResult<()> {
        let now = Instant::now();
        if now >= deadline {
            return Err(timeout_error(budget, what));
        }
        let pause = self.config.poll_interval().min(deadline - now);
        tokio::time::sleep(pause).await;
        Ok(())
    }
}

fn timeout_error(budget: Duration, what: &str) -> ProbeError {
    ProbeError::Timeout {
        ms: budget.as_millis() as u64,
        what: what.to_string(),
    }
}

/// Run a driver call, failing with `Timeout` if it outlives the deadline
async fn bounded<T, F>(deadline: Instant, budget: Duration, what: &str, fut: F) -> ProbeResult<T>
where
    F: Future<Output = ProbeResult<T>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(budget, what)),
    }
}
