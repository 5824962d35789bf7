//! Blogprobe: browser-driven end-to-end tests for the blog application
//!
//! Drives the blog front end through a [`PageDriver`] and checks the login,
//! creation and deletion flows against either the real backend or an
//! in-process interception of the blog API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ TestSuite    │──►│ ScenarioSetup │──►│ Page<Driver> │──► chromium / mock
//! │ (scenarios)  │   │ reset + seed  │   │ actions      │
//! └──────────────┘   └───────┬───────┘   │ expect(..)   │
//!                            │           └──────┬───────┘
//!                    ┌───────▼───────┐   ┌──────▼───────┐
//!                    │ BackendClient │   │ Router       │──► BlogStore
//!                    │ (testing API) │   │ DialogHandler│
//!                    └───────────────┘   └──────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod actions;
mod backend;
#[cfg(feature = "browser")]
mod chromium;
mod config;
mod dialog;
mod expect;
mod locator;
mod model;
#[allow(clippy::missing_errors_doc)]
mod network;
mod page;
mod result;
pub mod scenarios;
mod setup;
mod store;
mod suite;
pub mod ui;

pub use backend::BackendClient;
#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumLauncher};
pub use config::{
    HarnessConfig, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_API_URL, DEFAULT_APP_URL,
    DEFAULT_ASSERTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    ENV_PREFIX,
};
pub use dialog::{
    DefaultAction, Dialog, DialogAction, DialogHandler, DialogHandlerFn, DialogKind, DialogPolicy,
};
pub use expect::{expect, Expect};
pub use locator::{normalize_name, Locator, LocatorOptions, Selector};
pub use model::{added_notice, Blog, BlogOwner, LoginToken, NewBlog, User};
pub use network::{
    dispatch_shared, Fulfillment, HttpMethod, InterceptedRequest, Route, RouteDecision,
    RouteHandler, Router, SharedRouter, UrlPattern,
};
pub use page::{MockDriver, MockElement, Page, PageDriver};
pub use result::{ProbeError, ProbeResult, SetupStep};
pub use setup::{ScenarioContext, ScenarioSetup, ScenarioState};
pub use store::{BlogStore, BlogsInterceptor, SharedStore, BLOGS_PATTERN};
pub use suite::{
    DriverFactory, ScenarioFn, SuiteResults, SuiteRunner, TestCase, TestResult, TestSuite,
    DEFAULT_CASE_TIMEOUT_MS, NAME_SEPARATOR,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::actions::*;
    pub use super::backend::*;
    #[cfg(feature = "browser")]
    pub use super::chromium::*;
    pub use super::config::*;
    pub use super::dialog::*;
    pub use super::expect::*;
    pub use super::locator::*;
    pub use super::model::*;
    pub use super::network::*;
    pub use super::page::*;
    pub use super::result::*;
    pub use super::setup::*;
    pub use super::store::*;
    pub use super::suite::*;
    pub use super::ui;
}
