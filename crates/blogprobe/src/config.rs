//! Harness configuration.
//!
//! Defaults target the development setup of the blog application (Vite dev
//! server on 5173, API on 3003). A YAML file can override any field, and
//! `BLOGPROBE_*` environment variables override the file.

use crate::model::User;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default application root
pub const DEFAULT_APP_URL: &str = "http://localhost:5173";

/// Default backend root
pub const DEFAULT_API_URL: &str = "http://localhost:3003";

/// Default timeout for a single UI action (click, fill)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

/// Default timeout for an auto-waiting assertion
pub const DEFAULT_ASSERTION_TIMEOUT_MS: u64 = 5000;

/// Default navigation timeout
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval while auto-waiting
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BLOGPROBE_";

/// Configuration shared by setup, page and assertions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Application root the browser navigates to
    pub app_url: String,
    /// Backend root for reset/seed calls
    pub api_url: String,
    /// Install the blog interception rule
    pub intercept: bool,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Per-action timeout in milliseconds
    pub action_timeout_ms: u64,
    /// Per-assertion timeout in milliseconds
    pub assertion_timeout_ms: u64,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// User seeded before every scenario
    pub seed_user: User,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            intercept: false,
            headless: true,
            sandbox: true,
            chromium_path: None,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            assertion_timeout_ms: DEFAULT_ASSERTION_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            seed_user: User::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing fields keep their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `BLOGPROBE_*` overrides from the process environment
    pub fn apply_env(self) -> ProbeResult<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("APP_URL") {
            self.app_url = v;
        }
        if let Some(v) = var("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("INTERCEPT") {
            self.intercept = parse_bool("INTERCEPT", &v)?;
        }
        if let Some(v) = var("HEADLESS") {
            self.headless = parse_bool("HEADLESS", &v)?;
        }
        if let Some(v) = var("SANDBOX") {
            self.sandbox = parse_bool("SANDBOX", &v)?;
        }
        if let Some(v) = var("CHROMIUM_PATH") {
            self.chromium_path = Some(v);
        }
        if let Some(v) = var("ACTION_TIMEOUT_MS") {
            self.action_timeout_ms = parse_ms("ACTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("ASSERTION_TIMEOUT_MS") {
            self.assertion_timeout_ms = parse_ms("ASSERTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("NAVIGATION_TIMEOUT_MS") {
            self.navigation_timeout_ms = parse_ms("NAVIGATION_TIMEOUT_MS", &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check invariants between fields
    pub fn validate(&self) -> ProbeResult<()> {
        for (field, url) in [("app_url", &self.app_url), ("api_url", &self.api_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ProbeError::config(format!(
                    "{field} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.action_timeout_ms == 0
            || self.assertion_timeout_ms == 0
            || self.navigation_timeout_ms == 0
        {
            return Err(ProbeError::config("timeouts must be non-zero"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.assertion_timeout_ms {
            return Err(ProbeError::config(
                "poll_interval_ms must be non-zero and not exceed assertion_timeout_ms",
            ));
        }
        if self.seed_user.username.is_empty() {
            return Err(ProbeError::config("seed_user.username must not be empty"));
        }
        Ok(())
    }

    /// Set the application root
    #[must_use]
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    /// Set the backend root
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Enable or disable interception
    #[must_use]
    pub const fn with_intercept(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set both action and assertion timeouts
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self.assertion_timeout_ms = ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the seeded user
    #[must_use]
    pub fn with_seed_user(mut self, user: User) -> Self {
        self.seed_user = user;
        self
    }

    /// Action timeout as Duration
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Assertion timeout as Duration
    #[must_use]
    pub const fn assertion_timeout(&self) -> Duration {
        Duration::from_millis(self.assertion_timeout_ms)
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_bool(name: &str, raw: &str) -> ProbeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProbeError::config(format!(
            "{ENV_PREFIX}{name}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_ms(name: &str, raw: &str) -> ProbeResult<u64> {
    raw.trim().parse().map_err(|_| {
        ProbeError::config(format!(
            "{ENV_PREFIX}{name}: expected milliseconds, got '{raw}'"
        ))
    })
}
