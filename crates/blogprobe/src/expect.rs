//! Auto-waiting assertions.
//!
//! Every assertion polls the page until its condition holds or its timeout
//! elapses, then fails once with `AssertionFailed`. Nothing is retried after
//! the timeout.
//!
//! ```ignore
//! expect(ctx.page(), Locator::text(ui::LOGIN_ERROR))
//!     .to_have_css("color", ui::ERROR_COLOR)
//!     .await?;
//! ```

use crate::locator::Locator;
use crate::page::{Page, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use std::time::Duration;
use tokio::time::Instant;

/// Assertion builder over one locator
#[derive(Debug)]
pub struct Expect<'p, D: PageDriver> {
    page: &'p Page<D>,
    locator: Locator,
    timeout: Duration,
}

/// Start an assertion on `locator`
pub fn expect<D: PageDriver>(page: &Page<D>, locator: impl Into<Locator>) -> Expect<'_, D> {
    let locator = locator.into();
    let timeout = locator.timeout_or(page.config().assertion_timeout());
    Expect {
        page,
        locator,
        timeout,
    }
}

impl<D: PageDriver> Expect<'_, D> {
    /// Override the assertion timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// At least one match becomes rendered
    pub async fn to_be_visible(&self) -> ProbeResult<()> {
        self.visible_within(self.timeout).await
    }

    /// No match is rendered: removed from the DOM or present but hidden
    pub async fn to_be_hidden(&self) -> ProbeResult<()> {
        match self.page.wait_for_hidden(&self.locator, self.timeout).await {
            Err(ProbeError::Timeout { .. }) => Err(self.failure("to be hidden", "still visible")),
            other => other,
        }
    }

    /// Alias of [`Self::to_be_hidden`]
    pub async fn not_to_be_visible(&self) -> ProbeResult<()> {
        self.to_be_hidden().await
    }

    /// Some match's text contains `expected`
    pub async fn to_contain_text(&self, expected: &str) -> ProbeResult<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let texts = self.page.text_content(&self.locator).await?;
            if texts.iter().any(|t| t.contains(expected)) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(self.failure(
                    &format!("to contain text {expected:?}"),
                    &format!("got {texts:?}"),
                ));
            }
            self.sleep(deadline).await;
        }
    }

    /// The element becomes visible, then its computed `property` equals
    /// `expected` (after trimming).
    ///
    /// An element that never renders fails for the visibility reason, not
    /// with a style mismatch.
    pub async fn to_have_css(&self, property: &str, expected: &str) -> ProbeResult<()> {
        let deadline = Instant::now() + self.timeout;
        self.visible_within(self.timeout).await?;

        let expected = expected.trim();
        loop {
            let actual = self.page.computed_style(&self.locator, property).await?;
            if actual.as_deref().map(str::trim) == Some(expected) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let got = actual.map_or_else(|| "no value".to_string(), |v| format!("{v:?}"));
                return Err(self.failure(
                    &format!("to have {property}: {expected:?}"),
                    &format!("got {got}"),
                ));
            }
            self.sleep(deadline).await;
        }
    }

    /// Exactly `expected` matches are attached
    pub async fn to_have_count(&self, expected: usize) -> ProbeResult<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let count = self.page.count(&self.locator).await?;
            if count == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(self.failure(
                    &format!("to have count {expected}"),
                    &format!("got {count}"),
                ));
            }
            self.sleep(deadline).await;
        }
    }

    async fn visible_within(&self, timeout: Duration) -> ProbeResult<()> {
        match self.page.wait_for_visible(&self.locator, timeout).await {
            Err(ProbeError::Timeout { .. }) => {
                let reason = if self.page.count(&self.locator).await.unwrap_or(0) == 0 {
                    "no matching element"
                } else {
                    "present but not rendered"
                };
                Err(self.failure("to be visible", reason))
            }
            other => other,
        }
    }

    async fn sleep(&self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(self.page.config().poll_interval().min(remaining)).await;
    }

    fn failure(&self, expectation: &str, detail: &str) -> ProbeError {
        ProbeError::assertion(format!(
            "expected {} {expectation} within {}ms: {detail}",
            self.locator,
            self.timeout.as_millis()
        ))
    }
}
