//! HTTP client for the blog backend.
//!
//! Covers the calls scenario setup makes directly, outside the browser:
//! resetting state, seeding the user, and (when not intercepting) seeding
//! blogs through the real API.

use crate::config::HarnessConfig;
use crate::model::{Blog, LoginToken, NewBlog, User};
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use std::time::Duration;

/// Blog backend client
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl BackendClient {
    /// Create a client for `base_url` with a request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Client for the configured `api_url`, bounded by the navigation timeout
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.api_url, config.navigation_timeout())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /api/testing/reset`
    pub async fn reset(&self) -> ProbeResult<()> {
        let url = self.url("/api/testing/reset");
        let resp = self.client.post(&url).send().await?;
        check("POST", &url, resp).await?;
        tracing::debug!(%url, "backend reset");
        Ok(())
    }

    /// `POST /api/users`
    pub async fn create_user(&self, user: &User) -> ProbeResult<()> {
        let url = self.url("/api/users");
        let resp = self.client.post(&url).json(user).send().await?;
        check("POST", &url, resp).await?;
        tracing::debug!(username = %user.username, "user seeded");
        Ok(())
    }

    /// `POST /api/login`
    pub async fn login(&self, username: &str, password: &str) -> ProbeResult<LoginToken> {
        let url = self.url("/api/login");
        let resp = self
            .client
            .post(&url)
            .json(&Credentials { username, password })
            .send()
            .await?;
        Ok(check("POST", &url, resp).await?.json().await?)
    }

    /// `GET /api/blogs`
    pub async fn list_blogs(&self) -> ProbeResult<Vec<Blog>> {
        let url = self.url("/api/blogs");
        let resp = self.client.get(&url).send().await?;
        Ok(check("GET", &url, resp).await?.json().await?)
    }

    /// `POST /api/blogs` with a bearer token
    pub async fn create_blog(&self, token: &LoginToken, blog: &NewBlog) -> ProbeResult<Blog> {
        let url = self.url("/api/blogs");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&token.token)
            .json(blog)
            .send()
            .await?;
        Ok(check("POST", &url, resp).await?.json().await?)
    }

    /// `DELETE /api/blogs/{id}` with a bearer token
    pub async fn delete_blog(&self, token: &LoginToken, id: &str) -> ProbeResult<()> {
        let url = self.url(&format!("/api/blogs/{id}"));
        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&token.token)
            .send()
            .await?;
        check("DELETE", &url, resp).await?;
        Ok(())
    }
}

async fn check(method: &str, url: &str, resp: reqwest::Response) -> ProbeResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProbeError::Backend {
        method: method.to_string(),
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
