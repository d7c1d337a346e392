//! In-process reminder collection.
//!
//! Stands in for the remote document store in the CLI and tests. Listeners
//! are called synchronously after each write, outside the state lock, so a
//! push may reach the engine before `insert` returns. Failure injection
//! covers the write and subscription error paths.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nudge_core::{Clock, IdentityId, Reminder, ReminderId, Subscription};
use parking_lot::Mutex;
use tracing::debug;

use crate::collection::{OwnerFilter, RemoteCollection, ReminderDraft, SnapshotListener};
use crate::errors::SyncError;

struct Listener {
    filter: OwnerFilter,
    callback: SnapshotListener,
}

#[derive(Default)]
struct State {
    records: Vec<Reminder>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    write_failure: Option<String>,
}

impl State {
    fn matching(&self, filter: &OwnerFilter) -> Vec<Reminder> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Result sets for every listener scoped to `owner`.
    fn pushes_for(&self, owner: &IdentityId) -> Vec<(SnapshotListener, Vec<Reminder>)> {
        self.listeners
            .values()
            .filter(|l| &l.filter.owner_id == owner)
            .map(|l| (Arc::clone(&l.callback), self.matching(&l.filter)))
            .collect()
    }
}

/// Reminder collection held in memory.
pub struct MemoryCollection {
    path: String,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<State>>,
}

impl MemoryCollection {
    /// Create an empty collection at `path`. `clock` stamps `created_at`.
    pub fn new(path: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Make subsequent writes fail with `reason`, or succeed again with `None`.
    pub fn set_write_failure(&self, reason: Option<&str>) {
        self.state.lock().write_failure = reason.map(str::to_owned);
    }

    /// Deliver a subscription failure to every listener.
    pub fn fail_subscriptions(&self, reason: &str) {
        let callbacks: Vec<SnapshotListener> = self
            .state
            .lock()
            .listeners
            .values()
            .map(|l| Arc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback(Err(SyncError::Subscription(reason.to_owned())));
        }
    }

    /// Every stored record regardless of owner.
    pub fn records(&self) -> Vec<Reminder> {
        self.state.lock().records.clone()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn check_writable(state: &State) -> Result<(), SyncError> {
        match &state.write_failure {
            Some(reason) => Err(SyncError::Write(reason.clone())),
            None => Ok(()),
        }
    }
}

fn deliver(pushes: Vec<(SnapshotListener, Vec<Reminder>)>) {
    for (callback, records) in pushes {
        callback(Ok(records));
    }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    fn path(&self) -> &str {
        &self.path
    }

    async fn insert(&self, draft: ReminderDraft) -> Result<ReminderId, SyncError> {
        let (id, pushes) = {
            let mut state = self.state.lock();
            Self::check_writable(&state)?;
            let record = Reminder {
                id: ReminderId::new(),
                owner_id: draft.owner_id,
                label: draft.label,
                scheduled_at: draft.scheduled_at,
                wants_notification: draft.wants_notification,
                created_at: self.clock.now(),
            };
            let id = record.id.clone();
            let owner = record.owner_id.clone();
            state.records.push(record);
            (id, state.pushes_for(&owner))
        };
        debug!(path = %self.path, reminder_id = %id, "record inserted");
        deliver(pushes);
        Ok(id)
    }

    async fn remove(&self, id: &ReminderId) -> Result<(), SyncError> {
        let pushes = {
            let mut state = self.state.lock();
            Self::check_writable(&state)?;
            let Some(pos) = state.records.iter().position(|r| &r.id == id) else {
                return Ok(());
            };
            let removed = state.records.remove(pos);
            state.pushes_for(&removed.owner_id)
        };
        debug!(path = %self.path, reminder_id = %id, "record removed");
        deliver(pushes);
        Ok(())
    }

    fn subscribe(&self, filter: OwnerFilter, listener: SnapshotListener) -> Subscription {
        let (key, initial) = {
            let mut state = self.state.lock();
            let key = state.next_listener;
            state.next_listener += 1;
            let initial = state.matching(&filter);
            let _ = state.listeners.insert(
                key,
                Listener {
                    filter,
                    callback: Arc::clone(&listener),
                },
            );
            (key, initial)
        };
        listener(Ok(initial));

        let state = Arc::clone(&self.state);
        Subscription::new("reminders", move || {
            let _ = state.lock().listeners.remove(&key);
        })
    }
}

impl std::fmt::Debug for MemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("path", &self.path)
            .field("records", &self.state.lock().records.len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use nudge_core::ManualClock;

    type Seen = Arc<Mutex<Vec<Result<Vec<Reminder>, SyncError>>>>;

    fn collection() -> MemoryCollection {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        MemoryCollection::new("artifacts/test/public/data/reminders", Arc::new(clock))
    }

    fn draft(owner: &str, label: &str) -> ReminderDraft {
        ReminderDraft {
            owner_id: IdentityId::from(owner),
            label: label.into(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            wants_notification: false,
        }
    }

    fn listen(c: &MemoryCollection, owner: &str) -> (Seen, Subscription) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sub = c.subscribe(
            OwnerFilter::new(IdentityId::from(owner)),
            Arc::new(move |r| s.lock().push(r)),
        );
        (seen, sub)
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_filtered_set() {
        let c = collection();
        let _ = c.insert(draft("alice", "a")).await.unwrap();
        let _ = c.insert(draft("bob", "b")).await.unwrap();
        let (seen, _sub) = listen(&c, "alice");
        let seen = seen.lock();
        let first = seen[0].as_ref().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].label, "a");
    }

    #[tokio::test]
    async fn insert_stamps_server_fields_and_pushes() {
        let c = collection();
        let (seen, _sub) = listen(&c, "alice");
        let id = c.insert(draft("alice", "Call mom")).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        let records = seen[1].as_ref().unwrap();
        assert_eq!(records[0].id, id);
        assert_eq!(
            records[0].created_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn other_owners_writes_do_not_push() {
        let c = collection();
        let (seen, _sub) = listen(&c, "alice");
        let _ = c.insert(draft("bob", "b")).await.unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn remove_pushes_without_record() {
        let c = collection();
        let keep = c.insert(draft("alice", "keep")).await.unwrap();
        let gone = c.insert(draft("alice", "gone")).await.unwrap();
        let (seen, _sub) = listen(&c, "alice");
        c.remove(&gone).await.unwrap();
        let seen = seen.lock();
        let last = seen.last().unwrap().as_ref().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, keep);
    }

    #[tokio::test]
    async fn removing_missing_record_is_ok() {
        let c = collection();
        assert!(c.remove(&ReminderId::from("nope")).await.is_ok());
    }

    #[tokio::test]
    async fn write_failure_injection() {
        let c = collection();
        c.set_write_failure(Some("offline"));
        assert_matches!(c.insert(draft("alice", "a")).await, Err(SyncError::Write(_)));
        assert!(c.records().is_empty());
        c.set_write_failure(None);
        assert!(c.insert(draft("alice", "a")).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_subscription_stops_pushes() {
        let c = collection();
        let (seen, sub) = listen(&c, "alice");
        drop(sub);
        assert_eq!(c.listener_count(), 0);
        let _ = c.insert(draft("alice", "a")).await.unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn subscription_failure_reaches_listeners() {
        let c = collection();
        let (seen, _sub) = listen(&c, "alice");
        c.fail_subscriptions("permission denied");
        assert_matches!(seen.lock().last(), Some(Err(SyncError::Subscription(_))));
    }
}
