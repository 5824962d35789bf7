//! Dialog handling (alert, confirm, prompt, beforeunload).
//!
//! The driver calls [`DialogHandler::handle`] at the moment a dialog opens.
//! A registered callback decides first; a dialog it leaves pending gets the
//! explicit default of the [`DialogPolicy`] for its kind. Every dialog is
//! logged and recorded, so a destructive confirmation is never dismissed
//! without a trace.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogKind {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl std::fmt::Display for DialogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// Action taken on a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Dialog was accepted (OK/Yes/Leave)
    Accept,
    /// Dialog was accepted with input text (for prompts)
    AcceptWith(String),
    /// Dialog was dismissed (Cancel/No/Stay)
    Dismiss,
    /// Dialog is pending (not yet handled)
    Pending,
}

impl DialogAction {
    /// Whether the page sees the dialog as accepted
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept | Self::AcceptWith(_))
    }

    /// Prompt text to send back, if any
    #[must_use]
    pub fn prompt_text(&self) -> Option<&str> {
        match self {
            Self::AcceptWith(text) => Some(text),
            _ => None,
        }
    }
}

/// Represents a browser dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    kind: DialogKind,
    message: String,
    default_value: Option<String>,
    action: DialogAction,
}

impl Dialog {
    /// Create a new dialog
    #[must_use]
    pub fn new(kind: DialogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            default_value: None,
            action: DialogAction::Pending,
        }
    }

    /// Create a confirm dialog
    #[must_use]
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Confirm, message)
    }

    /// Create a prompt dialog
    #[must_use]
    pub fn prompt(message: impl Into<String>, default: Option<String>) -> Self {
        let mut dialog = Self::new(DialogKind::Prompt, message);
        dialog.default_value = default;
        dialog
    }

    /// Get dialog kind
    #[must_use]
    pub const fn kind(&self) -> DialogKind {
        self.kind
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get default value (for prompts)
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Get action taken
    #[must_use]
    pub const fn action(&self) -> &DialogAction {
        &self.action
    }

    /// Check if dialog was handled
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self.action, DialogAction::Pending)
    }

    /// Accept the dialog
    pub fn accept(&mut self) {
        self.action = DialogAction::Accept;
    }

    /// Accept the dialog with input text (for prompts)
    pub fn accept_with(&mut self, text: impl Into<String>) {
        self.action = DialogAction::AcceptWith(text.into());
    }

    /// Dismiss the dialog
    pub fn dismiss(&mut self) {
        self.action = DialogAction::Dismiss;
    }
}

/// Default answer for one dialog kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultAction {
    /// Accept
    Accept,
    /// Accept a prompt with its default value (plain accept for other kinds)
    AcceptDefault,
    /// Dismiss
    Dismiss,
}

/// Explicit default action per dialog kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogPolicy {
    /// Alerts
    pub alert: DefaultAction,
    /// Confirmations
    pub confirm: DefaultAction,
    /// Prompts
    pub prompt: DefaultAction,
    /// Before-unload prompts
    pub before_unload: DefaultAction,
}

impl Default for DialogPolicy {
    fn default() -> Self {
        Self {
            alert: DefaultAction::Accept,
            confirm: DefaultAction::Accept,
            prompt: DefaultAction::AcceptDefault,
            before_unload: DefaultAction::Accept,
        }
    }
}

impl DialogPolicy {
    /// Dismiss every kind
    #[must_use]
    pub const fn dismiss_all() -> Self {
        Self {
            alert: DefaultAction::Dismiss,
            confirm: DefaultAction::Dismiss,
            prompt: DefaultAction::Dismiss,
            before_unload: DefaultAction::Dismiss,
        }
    }

    /// Override the confirmation default
    #[must_use]
    pub const fn with_confirm(mut self, action: DefaultAction) -> Self {
        self.confirm = action;
        self
    }

    /// Default for a kind
    #[must_use]
    pub const fn for_kind(&self, kind: DialogKind) -> DefaultAction {
        match kind {
            DialogKind::Alert => self.alert,
            DialogKind::Confirm => self.confirm,
            DialogKind::Prompt => self.prompt,
            DialogKind::BeforeUnload => self.before_unload,
        }
    }

    fn apply(&self, dialog: &mut Dialog) {
        match self.for_kind(dialog.kind) {
            DefaultAction::Accept => dialog.accept(),
            DefaultAction::AcceptDefault => match dialog.default_value.clone() {
                Some(default) => dialog.accept_with(default),
                None => dialog.accept(),
            },
            DefaultAction::Dismiss => dialog.dismiss(),
        }
    }
}

/// Handler function type for dialogs
pub type DialogHandlerFn = Box<dyn Fn(&mut Dialog) + Send + Sync>;

/// Dialog handler shared between a scenario and its driver
#[derive(Clone)]
pub struct DialogHandler {
    dialogs: Arc<Mutex<Vec<Dialog>>>,
    handler: Arc<Mutex<Option<DialogHandlerFn>>>,
    policy: Arc<Mutex<DialogPolicy>>,
}

impl DialogHandler {
    /// Create a handler with the default policy
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DialogPolicy::default())
    }

    /// Create a handler with an explicit policy
    #[must_use]
    pub fn with_policy(policy: DialogPolicy) -> Self {
        Self {
            dialogs: Arc::new(Mutex::new(Vec::new())),
            handler: Arc::new(Mutex::new(None)),
            policy: Arc::new(Mutex::new(policy)),
        }
    }

    /// Register the callback invoked when a dialog opens
    pub fn on_dialog<F>(&self, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        if let Ok(mut h) = self.handler.lock() {
            *h = Some(Box::new(handler));
        }
    }

    /// Remove the registered callback
    pub fn clear_callback(&self) {
        if let Ok(mut h) = self.handler.lock() {
            *h = None;
        }
    }

    /// Replace the policy
    pub fn set_policy(&self, policy: DialogPolicy) {
        if let Ok(mut p) = self.policy.lock() {
            *p = policy;
        }
    }

    /// Current policy
    #[must_use]
    pub fn policy(&self) -> DialogPolicy {
        self.policy.lock().map(|p| *p).unwrap_or_default()
    }

    /// Decide an incoming dialog; never returns it pending
    pub fn handle(&self, mut dialog: Dialog) -> Dialog {
        if let Ok(handler) = self.handler.lock() {
            if let Some(ref h) = *handler {
                h(&mut dialog);
            }
        }

        let by_default = !dialog.is_handled();
        if by_default {
            self.policy().apply(&mut dialog);
        }

        tracing::info!(
            kind = %dialog.kind,
            message = %dialog.message,
            action = ?dialog.action,
            by_default,
            "dialog handled"
        );

        if let Ok(mut dialogs) = self.dialogs.lock() {
            dialogs.push(dialog.clone());
        }
        dialog
    }

    /// Get all dialogs encountered
    #[must_use]
    pub fn dialogs(&self) -> Vec<Dialog> {
        self.dialogs.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Get count of dialogs
    #[must_use]
    pub fn dialog_count(&self) -> usize {
        self.dialogs.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Get last dialog
    #[must_use]
    pub fn last_dialog(&self) -> Option<Dialog> {
        self.dialogs.lock().ok().and_then(|d| d.last().cloned())
    }

    /// Clear dialog history
    pub fn clear(&self) {
        if let Ok(mut d) = self.dialogs.lock() {
            d.clear();
        }
    }
}

impl Default for DialogHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DialogHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogHandler")
            .field("dialog_count", &self.dialog_count())
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod dialog_tests {
        use super::*;

        #[test]
        fn test_new_dialog_is_pending() {
            let dialog = Dialog::confirm("Remove blog?");
            assert_eq!(dialog.kind(), DialogKind::Confirm);
            assert!(!dialog.is_handled());
            assert_eq!(dialog.message(), "Remove blog?");
        }

        #[test]
        fn test_actions() {
            let mut dialog = Dialog::prompt("Name?", Some("x".into()));
            dialog.accept_with("y");
            assert!(dialog.action().is_accept());
            assert_eq!(dialog.action().prompt_text(), Some("y"));

            dialog.dismiss();
            assert!(!dialog.action().is_accept());
            assert_eq!(dialog.action().prompt_text(), None);
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_default_policy_accepts_confirm() {
            let handler = DialogHandler::new();
            let dialog = handler.handle(Dialog::confirm("Remove blog?"));
            assert_eq!(dialog.action(), &DialogAction::Accept);
        }

        #[test]
        fn test_prompt_default_uses_default_value() {
            let handler = DialogHandler::new();
            let dialog = handler.handle(Dialog::prompt("Name?", Some("anon".into())));
            assert_eq!(dialog.action(), &DialogAction::AcceptWith("anon".into()));

            let dialog = handler.handle(Dialog::prompt("Name?", None));
            assert_eq!(dialog.action(), &DialogAction::Accept);
        }

        #[test]
        fn test_dismiss_policy() {
            let handler = DialogHandler::with_policy(DialogPolicy::dismiss_all());
            let dialog = handler.handle(Dialog::new(DialogKind::Alert, "hi"));
            assert_eq!(dialog.action(), &DialogAction::Dismiss);
        }

        #[test]
        fn test_with_confirm_override() {
            let policy = DialogPolicy::default().with_confirm(DefaultAction::Dismiss);
            assert_eq!(policy.for_kind(DialogKind::Confirm), DefaultAction::Dismiss);
            assert_eq!(policy.for_kind(DialogKind::Alert), DefaultAction::Accept);
        }
    }

    mod handler_tests {
        use super::*;

        #[test]
        fn test_callback_wins_over_policy() {
            let handler = DialogHandler::new();
            handler.on_dialog(|d| {
                if d.kind() == DialogKind::Confirm {
                    d.dismiss();
                }
            });
            let dialog = handler.handle(Dialog::confirm("Remove blog?"));
            assert_eq!(dialog.action(), &DialogAction::Dismiss);
        }

        #[test]
        fn test_callback_leaving_pending_falls_back() {
            let handler = DialogHandler::with_policy(DialogPolicy::dismiss_all());
            handler.on_dialog(|_| {});
            let dialog = handler.handle(Dialog::confirm("x"));
            assert_eq!(dialog.action(), &DialogAction::Dismiss);
        }

        #[test]
        fn test_history_is_shared_between_clones() {
            let handler = DialogHandler::new();
            let clone = handler.clone();
            clone.handle(Dialog::confirm("first"));
            clone.handle(Dialog::new(DialogKind::Alert, "second"));

            assert_eq!(handler.dialog_count(), 2);
            assert_eq!(handler.last_dialog().unwrap().message(), "second");
            assert!(handler.dialogs().iter().all(Dialog::is_handled));

            handler.clear();
            assert_eq!(clone.dialog_count(), 0);
        }

        #[test]
        fn test_clear_callback() {
            let handler = DialogHandler::new();
            handler.on_dialog(|d| d.dismiss());
            handler.clear_callback();
            assert!(handler.handle(Dialog::confirm("x")).action().is_accept());
        }
    }
}
