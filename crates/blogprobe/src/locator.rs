//! Locator abstraction for element selection.
//!
//! Selectors describe elements by the contract the application exposes
//! (roles and accessible names, test ids, labels, visible text) rather than
//! by markup. Every selector renders to a JavaScript expression that resolves
//! to an array of matching elements, used by the CDP driver.
//!
//! Role names are compared case-insensitively after collapsing whitespace and
//! must match the full accessible name: `button "login"` never resolves to a
//! button named "log in".

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selector for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Selector {
    /// ARIA role with optional accessible name (e.g. button "log in")
    Role {
        /// ARIA role
        role: String,
        /// Accessible name
        name: Option<String>,
    },
    /// Test ID selector (data-testid attribute)
    TestId {
        /// The data-testid value
        value: String,
    },
    /// Form control by label text or aria-label
    Label {
        /// Label text
        value: String,
    },
    /// Innermost elements whose text contains the value
    Text {
        /// Text to find
        value: String,
    },
    /// CSS selector
    Css {
        /// CSS selector string
        value: String,
    },
    /// Matches of `inner` inside the innermost element whose text contains
    /// `text` and that holds at least one such match (a list entry, say)
    Within {
        /// Text identifying the container
        text: String,
        /// Selector resolved inside the container
        inner: Box<Selector>,
    },
}

impl Selector {
    /// Element by role and accessible name
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    /// Button by accessible name
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::role("button", name)
    }

    /// Test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { value: id.into() }
    }

    /// Label selector
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label { value: text.into() }
    }

    /// Text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { value: text.into() }
    }

    /// CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            value: selector.into(),
        }
    }

    /// Scope this selector to the container holding `text`
    #[must_use]
    pub fn within(self, text: impl Into<String>) -> Self {
        Self::Within {
            text: text.into(),
            inner: Box::new(self),
        }
    }

    /// JavaScript expression evaluating to an array of matching elements
    #[must_use]
    pub fn to_query(&self) -> String {
        let arg = serde_json::to_string(self).unwrap_or_else(|_| "null".to_string());
        format!("({RESOLVE_JS})({arg})")
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_query())
    }

    /// JavaScript expression: true when any match is rendered
    #[must_use]
    pub fn to_visible_query(&self) -> String {
        format!("{}.some({IS_VISIBLE_JS})", self.to_query())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role { role, name: Some(name) } => write!(f, "{role} {name:?}"),
            Self::Role { role, name: None } => write!(f, "{role}"),
            Self::TestId { value } => write!(f, "test id {value:?}"),
            Self::Label { value } => write!(f, "label {value:?}"),
            Self::Text { value } => write!(f, "text {value:?}"),
            Self::Css { value } => write!(f, "css {value:?}"),
            Self::Within { text, inner } => write!(f, "{inner} within {text:?}"),
        }
    }
}

/// Collapse whitespace and lowercase, as role name matching does
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Element resolver shared by all queries. Takes a serialized [`Selector`].
const RESOLVE_JS: &str = r#"function resolve(sel) {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
  const all = (css) => Array.from(document.querySelectorAll(css));
  const innermost = (els, pred) => els.filter((el) => pred(el) && !Array.from(el.children).some(pred));
  const roleCss = {
    button: 'button, [role="button"], input[type="button"], input[type="submit"]',
    textbox: 'input:not([type]), input[type="text"], input[type="password"], input[type="email"], input[type="url"], input[type="number"], textarea, [role="textbox"]',
    heading: 'h1, h2, h3, h4, h5, h6, [role="heading"]',
    link: 'a[href], [role="link"]',
    listitem: 'li, [role="listitem"]',
  };
  const accessibleName = (el) => {
    if (el.getAttribute('aria-label')) return el.getAttribute('aria-label');
    if (el.tagName === 'INPUT' && (el.type === 'button' || el.type === 'submit')) return el.value;
    if (el.labels && el.labels.length) return el.labels[0].textContent;
    return el.textContent;
  };
  switch (sel && sel.kind) {
    case 'css':
      return all(sel.value);
    case 'testid':
      return all('[data-testid]').filter((el) => el.getAttribute('data-testid') === sel.value);
    case 'label': {
      const want = norm(sel.value);
      const byLabel = all('label').filter((l) => norm(l.textContent) === want && l.control).map((l) => l.control);
      const byAria = all('[aria-label]').filter((el) => norm(el.getAttribute('aria-label')) === want);
      return Array.from(new Set(byLabel.concat(byAria)));
    }
    case 'text':
      return innermost(all('body *'), (el) => (el.textContent || '').includes(sel.value));
    case 'role': {
      const css = roleCss[sel.role] || `[role="${sel.role}"]`;
      const els = all(css);
      if (sel.name === null || sel.name === undefined) return els;
      const want = norm(sel.name);
      return els.filter((el) => norm(accessibleName(el)) === want);
    }
    case 'within': {
      const inner = resolve(sel.inner);
      const holds = (el) => (el.textContent || '').includes(sel.text) && inner.some((m) => m !== el && el.contains(m));
      const scopes = innermost(all('body *'), holds);
      return inner.filter((m) => scopes.some((scope) => scope.contains(m)));
    }
    default:
      return [];
  }
}"#;

/// Rendered-ness test applied per element.
pub(crate) const IS_VISIBLE_JS: &str = r"(el) => {
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;
}";

/// Options controlling locator auto-waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout override; None uses the harness default
    pub timeout: Option<Duration>,
    /// Fail when more than one element matches an action target
    pub strict: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            strict: true,
        }
    }
}

/// A selector plus auto-wait options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            options: LocatorOptions::default(),
        }
    }

    /// Button by accessible name
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::new(Selector::button(name))
    }

    /// Element by test id
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Selector::test_id(id))
    }

    /// Element by text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Selector::text(text))
    }

    /// Control by label
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::new(Selector::label(text))
    }

    /// Restrict matches to the container holding `text`
    #[must_use]
    pub fn within(mut self, text: impl Into<String>) -> Self {
        self.selector = self.selector.within(text);
        self
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Allow multiple matches for actions (first match is used)
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Effective timeout given the harness default
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.options.timeout.unwrap_or(default)
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.selector.fmt(f)
    }
}
