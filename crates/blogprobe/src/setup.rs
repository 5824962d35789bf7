//! Per-scenario setup and the context a scenario runs in.
//!
//! Before every scenario: reset the backend, seed the known user, optionally
//! install the blog interception rule, then navigate to the application
//! root. A failing step aborts the scenario with a `Setup` error naming the
//! step; no scenario logic runs after it.
//!
//! The interception store, router and dialog handler belong to the
//! [`ScenarioContext`] and are only shared with that context's own page.

use crate::backend::BackendClient;
use crate::config::HarnessConfig;
use crate::dialog::{DialogHandler, DialogPolicy};
use crate::model::{Blog, NewBlog, User};
use crate::network::{Router, SharedRouter};
use crate::page::{Page, PageDriver};
use crate::result::{ProbeError, ProbeResult, SetupStep};
use crate::store::{BlogStore, BlogsInterceptor, SharedStore};
use serde::{Deserialize, Serialize};

/// Scenario progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioState {
    /// Nobody logged in
    Unauthenticated,
    /// Seeded user logged in
    Authenticated,
    /// A blog was created
    Created,
    /// The listing was observed
    Listed,
    /// A blog was deleted
    Deleted,
}

impl ScenarioState {
    /// Whether moving to `next` is allowed
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Unauthenticated => false,
            Self::Authenticated => matches!(self, Self::Unauthenticated),
            Self::Created | Self::Listed | Self::Deleted => {
                !matches!(self, Self::Unauthenticated)
            }
        }
    }
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Created => write!(f, "created"),
            Self::Listed => write!(f, "listed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Setup template shared by every scenario of a suite
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    config: HarnessConfig,
    user: User,
    intercept: bool,
    blogs: Vec<NewBlog>,
    dialog_policy: DialogPolicy,
}

impl ScenarioSetup {
    /// Setup from configuration: seeded user and interception mode come
    /// from the config
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            user: config.seed_user.clone(),
            intercept: config.intercept,
            config,
            blogs: Vec::new(),
            dialog_policy: DialogPolicy::default(),
        }
    }

    /// Seed a different user
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Enable or disable the blog interception rule
    #[must_use]
    pub const fn with_interception(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }

    /// Pre-existing blog owned by the seeded user
    #[must_use]
    pub fn with_blog(mut self, blog: NewBlog) -> Self {
        self.blogs.push(blog);
        self
    }

    /// Several pre-existing blogs
    #[must_use]
    pub fn with_blogs(mut self, blogs: impl IntoIterator<Item = NewBlog>) -> Self {
        self.blogs.extend(blogs);
        self
    }

    /// Dialog defaults for the scenario
    #[must_use]
    pub const fn with_dialog_policy(mut self, policy: DialogPolicy) -> Self {
        self.dialog_policy = policy;
        self
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Seeded user
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Whether interception is installed
    #[must_use]
    pub const fn intercepts(&self) -> bool {
        self.intercept
    }

    /// Pre-existing blogs
    #[must_use]
    pub fn blogs(&self) -> &[NewBlog] {
        &self.blogs
    }

    /// Run the setup steps against a fresh page driver
    pub async fn run<D: PageDriver>(
        &self,
        backend: &BackendClient,
        driver: D,
    ) -> ProbeResult<ScenarioContext<D>> {
        tracing::info!(
            api = backend.base_url(),
            app = %self.config.app_url,
            intercept = self.intercept,
            "scenario setup"
        );

        backend
            .reset()
            .await
            .map_err(|e| ProbeError::setup(SetupStep::Reset, e.to_string()))?;
        backend
            .create_user(&self.user)
            .await
            .map_err(|e| ProbeError::setup(SetupStep::SeedUser, e.to_string()))?;

        let store = self
            .seed_blogs(backend)
            .await
            .map_err(|e| ProbeError::setup(SetupStep::SeedBlogs, e.to_string()))?
            .shared();

        let router = Router::new().shared();
        let dialogs = DialogHandler::with_policy(self.dialog_policy);
        let mut page = Page::new(driver, self.config.clone());

        self.install(&mut page, &store, &router, &dialogs)
            .await
            .map_err(|e| ProbeError::setup(SetupStep::InstallHandlers, e.to_string()))?;

        page.goto(&self.config.app_url)
            .await
            .map_err(|e| ProbeError::setup(SetupStep::Navigate, e.to_string()))?;

        Ok(ScenarioContext {
            page,
            user: self.user.clone(),
            store,
            router,
            dialogs,
            state: ScenarioState::Unauthenticated,
            intercepting: self.intercept,
        })
    }

    /// Initial blogs: into the local store when intercepting, through the
    /// real API otherwise
    async fn seed_blogs(&self, backend: &BackendClient) -> ProbeResult<BlogStore> {
        let mut store = BlogStore::new();
        if self.blogs.is_empty() {
            return Ok(store);
        }

        if self.intercept {
            for blog in &self.blogs {
                let id = store.fresh_id();
                store.insert(Blog::from_new(id, blog.clone(), self.user.as_owner()));
            }
        } else {
            let token = backend
                .login(&self.user.username, &self.user.password)
                .await?;
            for blog in &self.blogs {
                backend.create_blog(&token, blog).await?;
            }
        }
        tracing::debug!(count = self.blogs.len(), "blogs seeded");
        Ok(store)
    }

    async fn install<D: PageDriver>(
        &self,
        page: &mut Page<D>,
        store: &SharedStore,
        router: &SharedRouter,
        dialogs: &DialogHandler,
    ) -> ProbeResult<()> {
        if self.intercept {
            let route =
                BlogsInterceptor::new(store.clone(), self.user.as_owner()).into_route();
            router
                .lock()
                .map_err(|_| ProbeError::page("router lock poisoned"))?
                .route(route);
            page.install_router(router.clone()).await?;
        }
        page.install_dialog_handler(dialogs.clone()).await
    }
}

/// A running scenario: page plus everything it owns
#[derive(Debug)]
pub struct ScenarioContext<D: PageDriver> {
    page: Page<D>,
    user: User,
    store: SharedStore,
    router: SharedRouter,
    dialogs: DialogHandler,
    state: ScenarioState,
    intercepting: bool,
}

impl<D: PageDriver> ScenarioContext<D> {
    /// Get the page
    pub const fn page(&self) -> &Page<D> {
        &self.page
    }

    /// Get the page mutably
    pub fn page_mut(&mut self) -> &mut Page<D> {
        &mut self.page
    }

    /// Seeded user
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Get configuration
    pub const fn config(&self) -> &HarnessConfig {
        self.page.config()
    }

    /// Interception store
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Copy of the intercepted collection
    pub fn store_snapshot(&self) -> Vec<Blog> {
        self.store
            .lock()
            .map(|s| s.blogs().to_vec())
            .unwrap_or_default()
    }

    /// Request router
    pub const fn router(&self) -> &SharedRouter {
        &self.router
    }

    /// Dialog handler
    pub const fn dialogs(&self) -> &DialogHandler {
        &self.dialogs
    }

    /// Whether the blog interception rule is installed
    pub const fn is_intercepting(&self) -> bool {
        self.intercepting
    }

    /// Current state
    pub const fn state(&self) -> ScenarioState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: ScenarioState) -> ProbeResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProbeError::InvalidState {
                message: format!("cannot go from {} to {next}", self.state),
            });
        }
        tracing::debug!(from = %self.state, to = %next, "scenario state");
        self.state = next;
        Ok(())
    }

    /// Close the page
    pub async fn close(&mut self) -> ProbeResult<()> {
        self.page.close().await
    }
}
