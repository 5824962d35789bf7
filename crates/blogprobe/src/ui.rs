//! Role, test-id and text contract of the blog application UI.

/// Opens the login form
pub const OPEN_LOGIN_BUTTON: &str = "log in";
/// Submits the login form
pub const LOGIN_BUTTON: &str = "login";
/// Opens the blog creation form
pub const NEW_BLOG_BUTTON: &str = "create new blog";
/// Submits the blog creation form
pub const ADD_BUTTON: &str = "add";
/// Expands a listing entry
pub const SHOW_BUTTON: &str = "show";
/// Deletes an expanded entry (owner only)
pub const DELETE_BUTTON: &str = "delete";

/// Login form username field (test id)
pub const USERNAME_FIELD: &str = "username";
/// Login form password field (test id)
pub const PASSWORD_FIELD: &str = "password";

/// Blog form fields (test ids)
pub const TITLE_FIELD: &str = "title";
#[allow(missing_docs)]
pub const AUTHOR_FIELD: &str = "author";
#[allow(missing_docs)]
pub const URL_FIELD: &str = "url";
#[allow(missing_docs)]
pub const LIKES_FIELD: &str = "likes";

/// Page heading
pub const HEADING: &str = "Blogs";

/// Page footer
pub const FOOTER: &str = "Blog app, Department of Computer Science, University of Helsinki 2024";

/// Error banner after a failed login
pub const LOGIN_ERROR: &str = "wrong username or password";

/// Border style of the error banner
pub const ERROR_BORDER_STYLE: &str = "solid";
/// Text color of the error banner
pub const ERROR_COLOR: &str = "rgb(255, 0, 0)";

/// localStorage key holding the client-side blog list
pub const BLOGS_STORAGE_KEY: &str = "blogs";
