//! Cancellable request context.
//!
//! A [`Context`] bounds the lifetime of exchanges and carries key/value tags
//! for diagnostics. Contexts form a tree: cancelling a context cancels every
//! context derived from it with [`child`](Context::child), but never its
//! parent or its siblings.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cancellation signal plus diagnostic tags.
///
/// Cloning is cheap and the clone shares the same cancellation state.
#[derive(Clone, Default)]
pub struct Context {
    token: CancellationToken,
    tags: Arc<Vec<(String, String)>>,
}

impl Context {
    /// Create a root context that is never cancelled unless
    /// [`cancel`](Context::cancel) is called on it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with its own cancellation.
    ///
    /// The child is cancelled when this context is, and inherits its tags.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            tags: Arc::clone(&self.tags),
        }
    }

    /// Derive a context carrying an additional tag.
    ///
    /// The result shares this context's cancellation. A later tag with the
    /// same key shadows an earlier one.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut tags = Vec::with_capacity(self.tags.len() + 1);
        tags.extend(self.tags.iter().cloned());
        tags.push((key.into(), value.into()));
        Self {
            token: self.token.clone(),
            tags: Arc::new(tags),
        }
    }

    /// Look up a tag.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over all tags, oldest first.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Cancel this context and everything derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns whether this context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until this context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("tags", &self.tags)
            .finish()
    }
}
