//! Scenario-local fixtures.
//!
//! Users and blogs are transient: created per scenario, never shared across
//! scenarios, discarded when the scenario ends.

use serde::{Deserialize, Deserializer, Serialize};

/// User fixture seeded before every scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name, shown in the "<name> logged in" banner
    pub name: String,
    /// Login name
    pub username: String,
    /// Plain-text password submitted by the login form
    pub password: String,
    /// Optional fixed id (sent as `_id`)
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl User {
    /// Create a user fixture
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            password: password.into(),
            id: None,
        }
    }

    /// Set a fixed id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The name shown by the application after login
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Text of the authenticated banner
    #[must_use]
    pub fn logged_in_banner(&self) -> String {
        format!("{} logged in", self.display_name())
    }

    /// Owner record for blogs created by this user
    #[must_use]
    pub fn as_owner(&self) -> BlogOwner {
        BlogOwner {
            username: self.username.clone(),
            name: self.name.clone(),
            id: self.id.clone().unwrap_or_default(),
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new("Matti Luukkainen", "mluukkai", "salainen")
    }
}

/// Owner association of a blog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogOwner {
    /// Owner login name
    #[serde(default)]
    pub username: String,
    /// Owner display name
    #[serde(default)]
    pub name: String,
    /// Owner id
    #[serde(default)]
    pub id: String,
}

/// Blog fixture as returned by `GET /api/blogs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    /// Unique id within the scenario collection
    pub id: String,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Url
    pub url: String,
    /// Like count
    #[serde(default, deserialize_with = "deserialize_likes")]
    pub likes: u64,
    /// Owner; decides whether the delete control is shown. A bare id string
    /// or a missing owner reads as an owner with only the id set.
    #[serde(default, deserialize_with = "deserialize_owner")]
    pub user: BlogOwner,
}

impl Blog {
    /// Build a stored blog from a submitted one
    #[must_use]
    pub fn from_new(id: impl Into<String>, new: NewBlog, owner: BlogOwner) -> Self {
        Self {
            id: id.into(),
            title: new.title,
            author: new.author,
            url: new.url,
            likes: new.likes,
            user: owner,
        }
    }

    /// Whether `user` owns this blog
    #[must_use]
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user.username == user.username
    }

    /// Listing text the application shows after creation
    #[must_use]
    pub fn added_notice(&self) -> String {
        added_notice(&self.title, &self.author)
    }
}

/// Body of `POST /api/blogs`: a blog without id or owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlog {
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Url
    #[serde(default)]
    pub url: String,
    /// Like count; numeric strings are accepted
    #[serde(default, deserialize_with = "deserialize_likes")]
    pub likes: u64,
}

impl NewBlog {
    /// Create a submitted blog; `likes` is parsed leniently
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
        likes: &str,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            url: url.into(),
            likes: parse_likes(likes),
        }
    }
}

/// "added <title> by <author>"
#[must_use]
pub fn added_notice(title: &str, author: &str) -> String {
    format!("added {title} by {author}")
}

/// Non-numeric values count as zero likes.
fn parse_likes(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

fn deserialize_likes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Likes {
        Number(u64),
        Float(f64),
        Text(String),
        Null(()),
    }

    Ok(match Likes::deserialize(deserializer)? {
        Likes::Number(n) => n,
        Likes::Float(f) if f.is_finite() && f >= 0.0 => f as u64,
        Likes::Text(s) => parse_likes(&s),
        Likes::Float(_) | Likes::Null(()) => 0,
    })
}

fn deserialize_owner<'de, D>(deserializer: D) -> Result<BlogOwner, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Owner {
        Full(BlogOwner),
        Id(String),
        Null(()),
    }

    Ok(match Owner::deserialize(deserializer)? {
        Owner::Full(owner) => owner,
        Owner::Id(id) => BlogOwner {
            id,
            ..BlogOwner::default()
        },
        Owner::Null(()) => BlogOwner::default(),
    })
}

/// Credentials returned by `POST /api/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginToken {
    /// Bearer token
    pub token: String,
    /// Login name
    pub username: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}
