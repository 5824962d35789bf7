//! In-memory blog collection behind the interception rule.
//!
//! One [`BlogStore`] exists per scenario. The scenario context owns it and
//! hands a clone of the `Arc` to exactly one [`BlogsInterceptor`], which is the
//! only writer while the scenario runs.

use crate::model::{Blog, BlogOwner, NewBlog};
use crate::network::{
    Fulfillment, HttpMethod, InterceptedRequest, Route, RouteDecision, RouteHandler, UrlPattern,
};
use std::sync::{Arc, Mutex};

/// URL pattern of the blog-listing endpoint
pub const BLOGS_PATTERN: &str = "**/api/blogs*";

/// Store shared between a scenario and its interceptor
pub type SharedStore = Arc<Mutex<BlogStore>>;

/// Ordered collection of blog fixtures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogStore {
    blogs: Vec<Blog>,
}

impl BlogStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding pre-existing fixtures
    #[must_use]
    pub fn with_blogs(blogs: Vec<Blog>) -> Self {
        Self { blogs }
    }

    /// Wrap for sharing with an interceptor
    #[must_use]
    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Current fixtures in insertion order
    #[must_use]
    pub fn blogs(&self) -> &[Blog] {
        &self.blogs
    }

    /// Number of fixtures
    #[must_use]
    pub fn len(&self) -> usize {
        self.blogs.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blogs.is_empty()
    }

    /// Find a fixture by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Blog> {
        self.blogs.iter().find(|b| b.id == id)
    }

    /// Append a fixture; returns false if the id is already taken
    pub fn insert(&mut self, blog: Blog) -> bool {
        if self.get(&blog.id).is_some() {
            return false;
        }
        self.blogs.push(blog);
        true
    }

    /// Remove a fixture by id
    pub fn remove(&mut self, id: &str) -> Option<Blog> {
        let index = self.blogs.iter().position(|b| b.id == id)?;
        Some(self.blogs.remove(index))
    }

    /// Generate an id not present in the store
    #[must_use]
    pub fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// Method dispatch for the blog endpoint
///
/// - GET fulfills 200 with the current collection
/// - POST assigns a fresh id and the seeded owner, appends, fulfills 201
/// - DELETE removes by the last path segment, fulfills 204
/// - anything else continues to the real backend
///
/// Only a matched method touches the store.
#[derive(Debug, Clone)]
pub struct BlogsInterceptor {
    store: SharedStore,
    owner: BlogOwner,
}

impl BlogsInterceptor {
    /// Create an interceptor over a scenario's store
    #[must_use]
    pub fn new(store: SharedStore, owner: BlogOwner) -> Self {
        Self { store, owner }
    }

    /// Route installing this interceptor on the blog endpoint
    #[must_use]
    pub fn into_route(self) -> Route {
        Route::new(
            UrlPattern::Glob(BLOGS_PATTERN.to_string()),
            HttpMethod::Any,
            self,
        )
    }

    fn list(store: &BlogStore) -> RouteDecision {
        match Fulfillment::json(200, &store.blogs()) {
            Ok(response) => RouteDecision::Fulfill(response),
            Err(e) => RouteDecision::Fulfill(Fulfillment::error(500, &e.to_string())),
        }
    }

    fn create(&self, store: &mut BlogStore, request: &InterceptedRequest) -> RouteDecision {
        let new: NewBlog = match request.body_json() {
            Ok(new) => new,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "rejecting unparseable blog body");
                return RouteDecision::Fulfill(Fulfillment::error(400, &e.to_string()));
            }
        };

        let blog = Blog::from_new(store.fresh_id(), new, self.owner.clone());
        let response = Fulfillment::json(201, &blog);
        tracing::info!(id = %blog.id, title = %blog.title, "intercepted blog creation");
        store.insert(blog);
        match response {
            Ok(response) => RouteDecision::Fulfill(response),
            Err(e) => RouteDecision::Fulfill(Fulfillment::error(500, &e.to_string())),
        }
    }

    fn delete(store: &mut BlogStore, request: &InterceptedRequest) -> RouteDecision {
        if let Some(id) = request.last_segment() {
            if let Some(removed) = store.remove(id) {
                tracing::info!(id = %removed.id, title = %removed.title, "intercepted blog deletion");
            }
        }
        RouteDecision::Fulfill(Fulfillment::empty(204))
    }
}

impl RouteHandler for BlogsInterceptor {
    fn handle(&mut self, request: &InterceptedRequest) -> RouteDecision {
        if !matches!(
            request.method,
            HttpMethod::Get | HttpMethod::Post | HttpMethod::Delete
        ) {
            return RouteDecision::Continue;
        }

        let Ok(mut store) = self.store.lock() else {
            tracing::warn!("blog store lock poisoned; continuing request");
            return RouteDecision::Continue;
        };

        match request.method {
            HttpMethod::Get => Self::list(&store),
            HttpMethod::Post => self.create(&mut store, request),
            HttpMethod::Delete => Self::delete(&mut store, request),
            _ => RouteDecision::Continue,
        }
    }
}
