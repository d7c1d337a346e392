//! Unsubscribe handles for push-style feeds.
//!
//! Every push feed (identity changes, collection changes) hands back a
//! [`Subscription`]. Holding it keeps the listener registered; calling
//! [`Subscription::unsubscribe`] or dropping it removes the listener. Owners
//! keep at most one handle per logical feed in an `Option` slot and release
//! the old handle before installing a new one.

use std::fmt;

type Teardown = Box<dyn FnOnce() + Send>;

/// Registration of a listener on a push feed.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    label: &'static str,
    teardown: Option<Teardown>,
}

impl Subscription {
    /// Wrap the feed's removal action.
    pub fn new(label: &'static str, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop(label: &'static str) -> Self {
        Self {
            label,
            teardown: None,
        }
    }

    /// Feed name, for logging.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            tracing::trace!(feed = self.label, "unsubscribing");
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("live", &self.teardown.is_some())
            .finish()
    }
}
