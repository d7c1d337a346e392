//! Transient user notices.
//!
//! A [`Notice`] is a short status message with an expiry timestamp. The
//! [`NoticeBoard`] holds the single visible notice: posting replaces it, and
//! a deferred clear removes it once its window passes unless a newer notice
//! took its place. Every posted notice is also broadcast so a presentation
//! layer can log the full stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::clock::{Clock, SystemClock};
use crate::constants::DEFAULT_NOTICE_TTL_MS;

const STREAM_CAPACITY: usize = 64;

/// Tone of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    /// Progress or success.
    Info,
    /// A recoverable failure.
    Error,
}

/// A short-lived status message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Monotonic sequence number within one board.
    pub seq: u64,
    /// Tone.
    pub kind: NoticeKind,
    /// Message text.
    pub text: String,
    /// When the notice was posted.
    pub posted_at: DateTime<Utc>,
    /// When the notice stops being visible.
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    /// Whether the notice is still inside its visibility window at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

struct Inner {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    seq: AtomicU64,
    current: watch::Sender<Option<Notice>>,
    stream: broadcast::Sender<Notice>,
}

/// Shared handle to the visible notice. Cheap to clone.
#[derive(Clone)]
pub struct NoticeBoard {
    inner: Arc<Inner>,
}

impl NoticeBoard {
    /// Create a board whose notices stay visible for `ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let (current, _) = watch::channel(None);
        let (stream, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                ttl,
                clock,
                seq: AtomicU64::new(0),
                current,
                stream,
            }),
        }
    }

    /// Post an informational notice.
    pub fn info(&self, text: impl Into<String>) -> Notice {
        self.post(NoticeKind::Info, text.into())
    }

    /// Post an error notice.
    pub fn error(&self, text: impl Into<String>) -> Notice {
        self.post(NoticeKind::Error, text.into())
    }

    /// Replace the visible notice and arrange for it to clear after the window.
    ///
    /// The clear is skipped when called outside a tokio runtime; the notice
    /// then stays until replaced.
    pub fn post(&self, kind: NoticeKind, text: String) -> Notice {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let posted_at = self.inner.clock.now();
        let expires_at = posted_at
            + chrono::Duration::from_std(self.inner.ttl).unwrap_or(chrono::Duration::zero());
        let notice = Notice {
            seq,
            kind,
            text,
            posted_at,
            expires_at,
        };

        tracing::debug!(seq, kind = ?kind, text = %notice.text, "notice posted");
        let _ = self.inner.current.send_replace(Some(notice.clone()));
        let _ = self.inner.stream.send(notice.clone());

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            let _ = handle.spawn(async move {
                tokio::time::sleep(inner.ttl).await;
                let _ = inner.current.send_if_modified(|current| {
                    if current.as_ref().is_some_and(|n| n.seq == seq) {
                        *current = None;
                        true
                    } else {
                        false
                    }
                });
            });
        }

        notice
    }

    /// The visible notice, if any.
    pub fn current(&self) -> Option<Notice> {
        self.inner.current.borrow().clone()
    }

    /// Watch the visible notice.
    pub fn watch(&self) -> watch::Receiver<Option<Notice>> {
        self.inner.current.subscribe()
    }

    /// Receive every notice as it is posted.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.inner.stream.subscribe()
    }

    /// Visibility window.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_NOTICE_TTL_MS),
            Arc::new(SystemClock),
        )
    }
}

impl std::fmt::Debug for NoticeBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeBoard")
            .field("ttl", &self.inner.ttl)
            .field("current", &self.current().map(|n| n.text))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
