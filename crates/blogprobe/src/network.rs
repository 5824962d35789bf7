//! Network Request Interception
//!
//! Scripted responses for requests the page makes. A [`Router`] holds routes
//! (URL pattern + method + handler); each intercepted request is dispatched to
//! the first matching route, whose handler either fulfills it or lets it
//! continue to the real backend unmodified.

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// HEAD request
    Head,
    /// OPTIONS request
    Options,
    /// Any method (route matching only)
    Any,
}

impl HttpMethod {
    /// Parse from string; unknown methods map to `Any`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => Self::Any,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "*",
        }
    }

    /// Check if this method matches another
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scripted HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
}

impl Default for Fulfillment {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            content_type: "application/json".to_string(),
        }
    }
}

impl Fulfillment {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON response
    pub fn json<T: Serialize>(status: u16, data: &T) -> ProbeResult<Self> {
        Ok(Self {
            status,
            body: serde_json::to_vec(data)?,
            ..Self::default()
        })
    }

    /// Create a response with no body
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Create an error response with a JSON `{ "error": ... }` body
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            body: body.into_bytes(),
            ..Self::default()
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// All headers including the content type, for transports that need a list
    #[must_use]
    pub fn header_list(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self.body.is_empty()
            && !self
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"))
        {
            headers.push(("Content-Type".to_string(), self.content_type.clone()));
        }
        headers.sort();
        headers
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/api/blogs*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Simple glob matching for URLs. `*` spans any run of characters; the
    /// first and last literal segments are anchored to the ends of the URL.
    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        let [first, middle @ .., last] = parts.as_slice() else {
            return pattern == url;
        };
        if !url.starts_with(*first) {
            return false;
        }

        let mut pos = first.len();
        for part in middle.iter().filter(|p| !p.is_empty()) {
            match url[pos..].find(*part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
        url[pos..].ends_with(*last)
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s)
            | Self::Prefix(s)
            | Self::Contains(s)
            | Self::Regex(s)
            | Self::Glob(s) => write!(f, "{s}"),
            Self::Any => write!(f, "*"),
        }
    }
}

/// A request seen by the interception layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Milliseconds since the router was created
    pub timestamp_ms: u64,
}

impl InterceptedRequest {
    /// Create a new request
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            body: None,
            timestamp_ms: 0,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse body as JSON
    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> ProbeResult<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| ProbeError::page("request has no body"))?;
        Ok(serde_json::from_slice(body)?)
    }

    /// URL path without scheme, host, query or fragment
    #[must_use]
    pub fn path(&self) -> &str {
        let without_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let path_start = if self.url.contains("://") {
            without_scheme.find('/').unwrap_or(without_scheme.len())
        } else {
            0
        };
        let path = &without_scheme[path_start..];
        let end = path.find(['?', '#']).unwrap_or(path.len());
        &path[..end]
    }

    /// Last non-empty path segment
    #[must_use]
    pub fn last_segment(&self) -> Option<&str> {
        self.path().rsplit('/').find(|s| !s.is_empty())
    }
}

/// What to do with an intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Answer with a scripted response
    Fulfill(Fulfillment),
    /// Let the request through to the real backend unmodified
    Continue,
}

/// Handler invoked for requests matching a route
pub trait RouteHandler: Send {
    /// Decide how to answer a request
    fn handle(&mut self, request: &InterceptedRequest) -> RouteDecision;
}

impl RouteHandler for Fulfillment {
    fn handle(&mut self, _request: &InterceptedRequest) -> RouteDecision {
        RouteDecision::Fulfill(self.clone())
    }
}

impl<F> RouteHandler for F
where
    F: FnMut(&InterceptedRequest) -> RouteDecision + Send,
{
    fn handle(&mut self, request: &InterceptedRequest) -> RouteDecision {
        self(request)
    }
}

/// A route definition for interception
pub struct Route {
    /// URL pattern to match
    pub pattern: UrlPattern,
    /// HTTP method to match
    pub method: HttpMethod,
    /// Number of times this route should be used (None = unlimited)
    pub times: Option<usize>,
    /// Number of times this route has been matched
    pub match_count: usize,
    handler: Box<dyn RouteHandler>,
}

impl Route {
    /// Create a new route
    #[must_use]
    pub fn new(pattern: UrlPattern, method: HttpMethod, handler: impl RouteHandler + 'static) -> Self {
        Self {
            pattern,
            method,
            times: None,
            match_count: 0,
            handler: Box::new(handler),
        }
    }

    /// Set how many times this route should match
    #[must_use]
    pub const fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this route matches a request
    #[must_use]
    pub fn matches(&self, url: &str, method: &HttpMethod) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.pattern.matches(url) && self.method.matches(method)
    }

    /// Check if route is exhausted
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.times.is_some_and(|max| self.match_count >= max)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("times", &self.times)
            .field("match_count", &self.match_count)
            .finish()
    }
}

/// Router shared between a scenario and its driver's interception listener
pub type SharedRouter = Arc<Mutex<Router>>;

/// Ordered set of routes plus a log of intercepted requests
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    captured: Vec<InterceptedRequest>,
    start_time: Instant,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            captured: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Wrap for sharing with a driver
    #[must_use]
    pub fn shared(self) -> SharedRouter {
        Arc::new(Mutex::new(self))
    }

    /// Add a route; earlier routes win
    pub fn route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Get route count
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Remove all routes
    pub fn clear_routes(&mut self) {
        self.routes.clear();
    }

    /// Dispatch a request to the first matching route
    ///
    /// Requests that match no route are neither captured nor answered.
    pub fn dispatch(&mut self, mut request: InterceptedRequest) -> RouteDecision {
        request.timestamp_ms = self.start_time.elapsed().as_millis() as u64;

        let Some(route) = self
            .routes
            .iter_mut()
            .find(|r| r.matches(&request.url, &request.method))
        else {
            return RouteDecision::Continue;
        };

        route.match_count += 1;
        let decision = route.handler.handle(&request);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            pattern = %route.pattern,
            fulfilled = matches!(decision, RouteDecision::Fulfill(_)),
            "intercepted request"
        );
        self.captured.push(request);
        decision
    }

    /// All requests that matched a route
    #[must_use]
    pub fn captured_requests(&self) -> &[InterceptedRequest] {
        &self.captured
    }

    /// Captured requests with a given method
    #[must_use]
    pub fn requests_by_method(&self, method: HttpMethod) -> Vec<&InterceptedRequest> {
        self.captured.iter().filter(|r| r.method == method).collect()
    }

    /// Assert a request matching the pattern was intercepted
    pub fn assert_requested(&self, pattern: &UrlPattern) -> ProbeResult<()> {
        if self.captured.iter().any(|r| pattern.matches(&r.url)) {
            Ok(())
        } else {
            Err(ProbeError::assertion(format!(
                "expected a request matching {pattern}, but none was intercepted"
            )))
        }
    }

    /// Clear the captured request log
    pub fn clear_captured(&mut self) {
        self.captured.clear();
    }
}

/// Dispatch through a shared router
///
/// A poisoned lock lets the request continue rather than answering it.
pub fn dispatch_shared(router: &SharedRouter, request: InterceptedRequest) -> RouteDecision {
    match router.lock() {
        Ok(mut router) => router.dispatch(request),
        Err(_) => {
            tracing::warn!("interception router lock poisoned; continuing request");
            RouteDecision::Continue
        }
    }
}
