//! In-process stand-in for the blog front end and its backend.
//!
//! [`BlogApp`] renders the same role/test-id/text contract as the real
//! application and sends its API calls through the installed router, falling
//! through to [`FakeBackend`] when a request is continued. The testing API the
//! harness calls during setup is served by mockito and forwarded into the same
//! [`FakeBackend`], so seeding and the page see one state.

#![allow(dead_code)]

use async_trait::async_trait;
use blogprobe::{
    dispatch_shared, normalize_name, ui, Blog, BlogOwner, Dialog, DialogHandler, HttpMethod,
    InterceptedRequest, LoginToken, NewBlog, PageDriver, ProbeError, ProbeResult, RouteDecision,
    Selector, SharedRouter, User,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub type SharedBackend = Arc<Mutex<FakeBackend>>;

// ============================================================================
// Backend
// ============================================================================

/// Minimal blog API state
#[derive(Debug, Default)]
pub struct FakeBackend {
    users: Vec<User>,
    blogs: Vec<Blog>,
    tokens: HashMap<String, String>,
    last_login: Option<String>,
    next_id: u64,
}

impl FakeBackend {
    pub fn shared() -> SharedBackend {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add_user(&mut self, user: User) {
        self.users.push(user);
    }

    pub fn blogs(&self) -> &[Blog] {
        &self.blogs
    }

    pub fn login(&mut self, username: &str, password: &str) -> Option<LoginToken> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)?
            .clone();
        self.next_id += 1;
        let token = format!("token-{}", self.next_id);
        self.tokens.insert(token.clone(), user.username.clone());
        self.last_login = Some(user.username.clone());
        Some(LoginToken {
            token,
            username: user.username,
            name: user.name,
        })
    }

    /// Create a blog owned by the token's user, or by the last login
    pub fn create(&mut self, token: Option<&str>, new: NewBlog) -> Option<Blog> {
        let username = match token {
            Some(token) => self.tokens.get(token)?.clone(),
            None => self.last_login.clone()?,
        };
        let owner = self.users.iter().find(|u| u.username == username)?.as_owner();
        self.next_id += 1;
        let blog = Blog::from_new(format!("b{}", self.next_id), new, owner);
        self.blogs.push(blog.clone());
        Some(blog)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.blogs.len();
        self.blogs.retain(|b| b.id != id);
        self.blogs.len() != before
    }

    /// Serve one page request: `(status, json body)`
    fn serve(&mut self, request: &InterceptedRequest, token: Option<&str>) -> (u16, Value) {
        let path = request.path().to_string();
        match (request.method, path.as_str()) {
            (HttpMethod::Post, "/api/login") => {
                let body: Value = request.body_json().unwrap_or(Value::Null);
                let username = body["username"].as_str().unwrap_or_default();
                let password = body["password"].as_str().unwrap_or_default();
                match self.login(username, password) {
                    Some(token) => (200, json!(token)),
                    None => (401, json!({ "error": "invalid username or password" })),
                }
            }
            (HttpMethod::Get, "/api/blogs") => (200, json!(self.blogs)),
            (HttpMethod::Post, "/api/blogs") => {
                let created = request
                    .body_json::<NewBlog>()
                    .ok()
                    .and_then(|new| self.create(token, new));
                match created {
                    Some(blog) => (201, json!(blog)),
                    None => (401, json!({ "error": "token invalid" })),
                }
            }
            (HttpMethod::Delete, p) if p.starts_with("/api/blogs/") => {
                let id = request.last_segment().unwrap_or_default().to_string();
                self.delete(&id);
                (204, Value::Null)
            }
            _ => (404, json!({ "error": "unknown endpoint" })),
        }
    }
}

/// Serve the testing API from `backend`
pub async fn backend_server(backend: SharedBackend) -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;

    let state = backend.clone();
    server
        .mock("POST", "/api/testing/reset")
        .with_status(204)
        .with_body_from_request(move |_| {
            state.lock().unwrap().reset();
            Vec::new()
        })
        .create_async()
        .await;

    let state = backend.clone();
    server
        .mock("POST", "/api/users")
        .with_status(201)
        .with_body_from_request(move |req| {
            let body = req.body().ok().cloned().unwrap_or_default();
            if let Ok(user) = serde_json::from_slice::<User>(&body) {
                state.lock().unwrap().add_user(user);
            }
            b"{}".to_vec()
        })
        .create_async()
        .await;

    let state = backend.clone();
    server
        .mock("POST", "/api/login")
        .with_status(200)
        .with_body_from_request(move |req| {
            let body = req.body().ok().cloned().unwrap_or_default();
            let creds: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            let token = state.lock().unwrap().login(
                creds["username"].as_str().unwrap_or_default(),
                creds["password"].as_str().unwrap_or_default(),
            );
            serde_json::to_vec(&token).unwrap()
        })
        .create_async()
        .await;

    let state = backend;
    server
        .mock("POST", "/api/blogs")
        .with_status(201)
        .with_body_from_request(move |req| {
            let body = req.body().ok().cloned().unwrap_or_default();
            let blog = serde_json::from_slice::<NewBlog>(&body)
                .ok()
                .and_then(|new| state.lock().unwrap().create(None, new));
            serde_json::to_vec(&blog).unwrap()
        })
        .create_async()
        .await;

    server
}

// ============================================================================
// Front end
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Button(String),
    Input(&'static str),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    OpenLogin,
    SubmitLogin,
    Logout,
    OpenBlogForm,
    SubmitBlog,
    CloseForms,
    Toggle(String),
    Delete(String),
}

#[derive(Debug, Clone)]
struct Element {
    target: Target,
    container: Option<String>,
    text: String,
    rendered: bool,
    styles: Vec<(&'static str, &'static str)>,
    action: Option<Action>,
}

impl Element {
    fn text(text: impl Into<String>) -> Self {
        Self {
            target: Target::Text,
            container: None,
            text: text.into(),
            rendered: true,
            styles: Vec::new(),
            action: None,
        }
    }

    fn button(label: &str, action: Action) -> Self {
        Self {
            target: Target::Button(label.to_string()),
            container: None,
            text: label.to_string(),
            rendered: true,
            styles: Vec::new(),
            action: Some(action),
        }
    }

    fn input(test_id: &'static str) -> Self {
        Self {
            target: Target::Input(test_id),
            container: None,
            text: String::new(),
            rendered: true,
            styles: Vec::new(),
            action: None,
        }
    }

    fn shown(mut self, rendered: bool) -> Self {
        self.rendered = rendered;
        self
    }

    /// Place inside a list entry whose text is `entry`
    fn inside(mut self, entry: &str) -> Self {
        self.container = Some(entry.to_string());
        self
    }

    fn styled(mut self, styles: &[(&'static str, &'static str)]) -> Self {
        self.styles = styles.to_vec();
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        match (selector, &self.target) {
            (Selector::Within { text, inner }, _) => {
                self.container
                    .as_deref()
                    .is_some_and(|c| c.contains(text.as_str()))
                    && self.matches(inner)
            }
            (Selector::Role { role, name }, Target::Button(label)) => {
                role == "button"
                    && name
                        .as_deref()
                        .map_or(true, |n| normalize_name(n) == normalize_name(label))
            }
            (Selector::TestId { value }, Target::Input(id)) => value == id,
            (Selector::Text { value }, Target::Text | Target::Button(_)) => {
                self.text.contains(value.as_str())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    username: String,
    name: String,
}

#[derive(Debug, Clone)]
struct Notification {
    message: String,
    error: bool,
}

/// Simulated blog front end
#[derive(Debug)]
pub struct BlogApp {
    backend: SharedBackend,
    url: String,
    loaded: bool,
    session: Option<Session>,
    login_open: bool,
    blog_form_open: bool,
    fields: HashMap<&'static str, String>,
    notification: Option<Notification>,
    blogs: Vec<Blog>,
    expanded: HashSet<String>,
    router: Option<SharedRouter>,
    dialogs: Option<DialogHandler>,
    local_storage: HashMap<String, String>,
    closed: bool,
    /// Page-level request log, in order
    pub requests: Vec<(HttpMethod, String)>,
}

impl BlogApp {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            url: "about:blank".to_string(),
            loaded: false,
            session: None,
            login_open: false,
            blog_form_open: false,
            fields: HashMap::new(),
            notification: None,
            blogs: Vec::new(),
            expanded: HashSet::new(),
            router: None,
            dialogs: None,
            local_storage: HashMap::new(),
            closed: false,
            requests: Vec::new(),
        }
    }

    fn render(&self) -> Vec<Element> {
        if !self.loaded || self.closed {
            return Vec::new();
        }
        let mut els = vec![Element::text(ui::HEADING)];

        if let Some(n) = &self.notification {
            let styles: &[(&str, &str)] = if n.error {
                &[("border-style", "solid"), ("color", "rgb(255, 0, 0)")]
            } else {
                &[("border-style", "solid"), ("color", "rgb(0, 128, 0)")]
            };
            els.push(Element::text(n.message.clone()).styled(styles));
        }

        match &self.session {
            None => {
                els.push(Element::button(ui::OPEN_LOGIN_BUTTON, Action::OpenLogin).shown(!self.login_open));
                els.push(Element::input(ui::USERNAME_FIELD).shown(self.login_open));
                els.push(Element::input(ui::PASSWORD_FIELD).shown(self.login_open));
                els.push(Element::button(ui::LOGIN_BUTTON, Action::SubmitLogin).shown(self.login_open));
                els.push(Element::button("cancel", Action::CloseForms).shown(self.login_open));
            }
            Some(session) => {
                els.push(Element::text(format!("{} logged in", session.name)));
                els.push(Element::button("logout", Action::Logout));
                els.push(
                    Element::button(ui::NEW_BLOG_BUTTON, Action::OpenBlogForm)
                        .shown(!self.blog_form_open),
                );
                for field in [ui::TITLE_FIELD, ui::AUTHOR_FIELD, ui::URL_FIELD, ui::LIKES_FIELD] {
                    els.push(Element::input(field).shown(self.blog_form_open));
                }
                els.push(Element::button(ui::ADD_BUTTON, Action::SubmitBlog).shown(self.blog_form_open));

                for blog in &self.blogs {
                    let open = self.expanded.contains(&blog.id);
                    let entry = format!("{} {}", blog.title, blog.author);
                    els.push(Element::text(entry.clone()).inside(&entry));
                    let label = if open { "hide" } else { ui::SHOW_BUTTON };
                    els.push(Element::button(label, Action::Toggle(blog.id.clone())).inside(&entry));
                    els.push(Element::text(blog.url.clone()).shown(open).inside(&entry));
                    els.push(
                        Element::text(format!("likes {}", blog.likes))
                            .shown(open)
                            .inside(&entry),
                    );
                    if blog.user.username == session.username {
                        els.push(
                            Element::button(ui::DELETE_BUTTON, Action::Delete(blog.id.clone()))
                                .shown(open)
                                .inside(&entry),
                        );
                    }
                }
            }
        }

        els.push(Element::text(ui::FOOTER));
        els
    }

    /// Send a request the way the page's fetch would
    fn fetch(&mut self, method: HttpMethod, path: &str, body: Option<Value>) -> ProbeResult<(u16, Value)> {
        let origin = self.url.trim_end_matches('/').to_string();
        let mut request = InterceptedRequest::new(method, format!("{origin}{path}"));
        if let Some(body) = body {
            request = request
                .with_header("content-type", "application/json")
                .with_body(serde_json::to_vec(&body)?);
        }
        let token = self.session.as_ref().map(|s| s.token.clone());
        if let Some(token) = &token {
            request = request.with_header("authorization", &format!("Bearer {token}"));
        }
        self.requests.push((method, path.to_string()));

        if let Some(router) = &self.router {
            if let RouteDecision::Fulfill(response) = dispatch_shared(router, request.clone()) {
                let value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);
                return Ok((response.status, value));
            }
        }

        let mut backend = self
            .backend
            .lock()
            .map_err(|_| ProbeError::PassThrough {
                method: method.to_string(),
                url: request.url.clone(),
                message: "backend unavailable".to_string(),
            })?;
        Ok(backend.serve(&request, token.as_deref()))
    }

    fn field(&self, id: &str) -> String {
        self.fields.get(id).cloned().unwrap_or_default()
    }

    fn perform(&mut self, action: Action) -> ProbeResult<()> {
        match action {
            Action::OpenLogin => self.login_open = true,
            Action::CloseForms => {
                self.login_open = false;
                self.blog_form_open = false;
            }
            Action::SubmitLogin => self.submit_login()?,
            Action::Logout => {
                self.session = None;
                self.blogs.clear();
            }
            Action::OpenBlogForm => self.blog_form_open = true,
            Action::SubmitBlog => self.submit_blog()?,
            Action::Toggle(id) => {
                if !self.expanded.remove(&id) {
                    self.expanded.insert(id);
                }
            }
            Action::Delete(id) => self.delete(&id)?,
        }
        Ok(())
    }

    fn submit_login(&mut self) -> ProbeResult<()> {
        let body = json!({
            "username": self.field(ui::USERNAME_FIELD),
            "password": self.field(ui::PASSWORD_FIELD),
        });
        let (status, value) = self.fetch(HttpMethod::Post, "/api/login", Some(body))?;
        if status != 200 {
            self.notification = Some(Notification {
                message: ui::LOGIN_ERROR.to_string(),
                error: true,
            });
            return Ok(());
        }
        let token: LoginToken = serde_json::from_value(value)?;
        self.session = Some(Session {
            token: token.token,
            username: token.username,
            name: token.name,
        });
        self.fields.clear();
        self.login_open = false;
        self.notification = None;

        let (_, blogs) = self.fetch(HttpMethod::Get, "/api/blogs", None)?;
        self.blogs = serde_json::from_value(blogs).unwrap_or_default();
        self.local_storage
            .insert(ui::BLOGS_STORAGE_KEY.to_string(), serde_json::to_string(&self.blogs)?);
        Ok(())
    }

    fn submit_blog(&mut self) -> ProbeResult<()> {
        let body = json!({
            "title": self.field(ui::TITLE_FIELD),
            "author": self.field(ui::AUTHOR_FIELD),
            "url": self.field(ui::URL_FIELD),
            "likes": self.field(ui::LIKES_FIELD),
        });
        let (status, value) = self.fetch(HttpMethod::Post, "/api/blogs", Some(body))?;
        if status != 201 {
            self.notification = Some(Notification {
                message: "blog could not be added".to_string(),
                error: true,
            });
            return Ok(());
        }
        let blog: Blog = serde_json::from_value(value)?;
        self.notification = Some(Notification {
            message: blog.added_notice(),
            error: false,
        });
        self.blogs.push(blog);
        self.blog_form_open = false;
        for field in [ui::TITLE_FIELD, ui::AUTHOR_FIELD, ui::URL_FIELD, ui::LIKES_FIELD] {
            self.fields.remove(field);
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> ProbeResult<()> {
        let Some(blog) = self.blogs.iter().find(|b| b.id == id).cloned() else {
            return Ok(());
        };
        let question = Dialog::confirm(format!("Remove blog {} by {}", blog.title, blog.author));
        // Without a handler the browser dismisses dialogs.
        let accepted = self
            .dialogs
            .as_ref()
            .is_some_and(|h| h.handle(question).action().is_accept());
        if !accepted {
            return Ok(());
        }
        self.fetch(HttpMethod::Delete, &format!("/api/blogs/{id}"), None)?;
        self.blogs.retain(|b| b.id != id);
        self.expanded.remove(id);
        Ok(())
    }

    fn owner_of_stored(&self) -> Vec<BlogOwner> {
        self.blogs.iter().map(|b| b.user.clone()).collect()
    }
}

#[async_trait]
impl PageDriver for BlogApp {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.url = url.to_string();
        self.loaded = true;
        Ok(())
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        Ok(self.render().iter().filter(|e| e.matches(selector)).count())
    }

    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool> {
        Ok(self
            .render()
            .iter()
            .any(|e| e.matches(selector) && e.rendered))
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        let action = self
            .render()
            .into_iter()
            .find(|e| e.matches(selector))
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: selector.to_string(),
            })?
            .action;
        match action {
            Some(action) => self.perform(action),
            None => Ok(()),
        }
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()> {
        let target = self
            .render()
            .into_iter()
            .find(|e| e.matches(selector))
            .map(|e| e.target);
        match target {
            Some(Target::Input(id)) => {
                self.fields.insert(id, value.to_string());
                Ok(())
            }
            _ => Err(ProbeError::ElementNotFound {
                selector: selector.to_string(),
            }),
        }
    }

    async fn text_content(&self, selector: &Selector) -> ProbeResult<Vec<String>> {
        Ok(self
            .render()
            .into_iter()
            .filter(|e| e.matches(selector))
            .map(|e| e.text)
            .collect())
    }

    async fn computed_style(
        &self,
        selector: &Selector,
        property: &str,
    ) -> ProbeResult<Option<String>> {
        Ok(self
            .render()
            .into_iter()
            .find(|e| e.matches(selector) && e.rendered)
            .and_then(|e| {
                e.styles
                    .iter()
                    .find(|(p, _)| *p == property)
                    .map(|(_, v)| (*v).to_string())
            }))
    }

    async fn evaluate(&mut self, _script: &str) -> ProbeResult<Value> {
        let owners = self.owner_of_stored();
        Ok(json!(owners.iter().filter(|o| o.username.is_empty()).count()))
    }

    async fn install_router(&mut self, router: SharedRouter) -> ProbeResult<()> {
        self.router = Some(router);
        Ok(())
    }

    async fn install_dialog_handler(&mut self, handler: DialogHandler) -> ProbeResult<()> {
        self.dialogs = Some(handler);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.url.clone())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.closed = true;
        Ok(())
    }
}
