//! Result and error types for Blogprobe.

use thiserror::Error;

/// Result type for Blogprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Setup step that failed before any scenario logic ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// `POST /api/testing/reset`
    Reset,
    /// `POST /api/users`
    SeedUser,
    /// Pre-existing blog fixtures
    SeedBlogs,
    /// Interception or dialog wiring on the page
    InstallHandlers,
    /// Navigation to the application root
    Navigate,
}

impl std::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::SeedUser => write!(f, "seed user"),
            Self::SeedBlogs => write!(f, "seed blogs"),
            Self::InstallHandlers => write!(f, "install handlers"),
            Self::Navigate => write!(f, "navigate"),
        }
    }
}

/// Errors that can occur in Blogprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Expected UI state did not materialize within the timeout
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Scenario setup failed; fatal for the test
    #[error("Setup failed during {step}: {message}")]
    Setup {
        /// The failing step
        step: SetupStep,
        /// Error message
        message: String,
    },

    /// An awaited step exceeded its budget
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being awaited
        what: String,
    },

    /// A request passed through the interception layer and the real backend failed
    #[error("Pass-through {method} {url} failed: {message}")]
    PassThrough {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// Error message
        message: String,
    },

    /// The backend answered a direct API call with a non-success status
    #[error("Backend {method} {url} returned {status}: {body}")]
    Backend {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// Response status
        status: u16,
        /// Response body
        body: String,
    },

    /// No element matched a locator
    #[error("No element matches {selector}")]
    ElementNotFound {
        /// Rendered selector
        selector: String,
    },

    /// More than one element matched a strict locator
    #[error("Strict mode violation: {selector} resolved to {count} elements")]
    StrictModeViolation {
        /// Rendered selector
        selector: String,
        /// Number of matches
        count: usize,
    },

    /// Operation called in the wrong scenario state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Page interaction error
    #[error("Page error: {message}")]
    Page {
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

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

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

impl ProbeError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a setup failure for a step
    #[must_use]
    pub fn setup(step: SetupStep, message: impl Into<String>) -> Self {
        Self::Setup {
            step,
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
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

    /// Whether this error happened before scenario logic started
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}
