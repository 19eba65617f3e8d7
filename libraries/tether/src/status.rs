//! Per-collection sync status, observable through listeners.
//!
//! Listeners are not called while the board is borrowed. Status changes queue notifications;
//! the owner drains them with [`SyncBoard::drain_due_notifications`] after releasing its borrow,
//! because listener callbacks commonly call back into code that borrows the board again.

use std::{collections::BTreeMap, rc::Rc};

use chrono::{DateTime, Utc};

slotmap::new_key_type! {
    pub struct ListenerKey;
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SyncStatus {
    /// Passes started but not yet finished. Duplicate triggers can make this exceed one.
    pub in_flight: usize,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    /// The error from the most recent finished pass, if it had one.
    pub last_error: Option<String>,
    pub last_uploaded: usize,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn last_sync_failed(&self) -> bool {
        self.last_error.is_some()
    }
}

type Listener = Rc<dyn Fn(&str, &SyncStatus)>;

#[derive(Default)]
pub struct SyncBoard {
    statuses: BTreeMap<String, SyncStatus>,
    listeners: slotmap::SlotMap<ListenerKey, Listener>,
    pending: Vec<String>,
}

impl std::fmt::Debug for SyncBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBoard")
            .field("statuses", &self.statuses)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl SyncBoard {
    pub fn status(&self, collection: &str) -> SyncStatus {
        self.statuses.get(collection).cloned().unwrap_or_default()
    }

    pub fn statuses(&self) -> &BTreeMap<String, SyncStatus> {
        &self.statuses
    }

    pub fn register_listener(&mut self, listener: impl Fn(&str, &SyncStatus) + 'static) -> ListenerKey {
        self.listeners.insert(Rc::new(listener))
    }

    pub fn unregister_listener(&mut self, key: ListenerKey) {
        self.listeners.remove(key);
    }

    pub fn mark_sync_started(&mut self, collection: &str, now: DateTime<Utc>) {
        let status = self.statuses.entry(collection.to_string()).or_default();
        status.in_flight += 1;
        status.last_started = Some(now);
        self.queue(collection);
    }

    pub fn mark_sync_finished(
        &mut self,
        collection: &str,
        now: DateTime<Utc>,
        uploaded: usize,
        error: Option<String>,
    ) {
        let status = self.statuses.entry(collection.to_string()).or_default();
        status.in_flight = status.in_flight.saturating_sub(1);
        status.last_finished = Some(now);
        status.last_uploaded = uploaded;
        status.last_error = error;
        self.queue(collection);
    }

    fn queue(&mut self, collection: &str) {
        if !self.pending.iter().any(|pending| pending == collection) {
            self.pending.push(collection.to_string());
        }
    }

    /// Take the queued notifications. Call the returned closures after the board's borrow ends.
    pub fn drain_due_notifications(&mut self) -> Vec<Box<dyn FnOnce()>> {
        let mut notifications: Vec<Box<dyn FnOnce()>> = Vec::new();
        for collection in std::mem::take(&mut self.pending) {
            let status = self.status(&collection);
            for listener in self.listeners.values() {
                let listener = Rc::clone(listener);
                let collection = collection.clone();
                let status = status.clone();
                notifications.push(Box::new(move || listener(&collection, &status)));
            }
        }
        notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_started_and_finished_update_status() {
        let mut board = SyncBoard::default();
        let now = Utc::now();

        board.mark_sync_started("completions", now);
        board.mark_sync_started("completions", now);
        assert_eq!(board.status("completions").in_flight, 2);
        assert!(board.status("completions").is_syncing());

        board.mark_sync_finished("completions", now, 3, Some("offline".to_string()));
        let status = board.status("completions");
        assert_eq!(status.in_flight, 1);
        assert_eq!(status.last_uploaded, 3);
        assert!(status.last_sync_failed());

        board.mark_sync_finished("completions", now, 0, None);
        let status = board.status("completions");
        assert!(!status.is_syncing());
        assert!(!status.last_sync_failed());
    }

    #[test]
    fn test_notifications_are_deferred_and_coalesced() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut board = SyncBoard::default();
        let sink = Rc::clone(&seen);
        board.register_listener(move |collection, status| {
            sink.borrow_mut()
                .push((collection.to_string(), status.in_flight));
        });

        let now = Utc::now();
        board.mark_sync_started("queue", now);
        board.mark_sync_finished("queue", now, 0, None);
        assert!(seen.borrow().is_empty(), "listeners must not run inline");

        for notification in board.drain_due_notifications() {
            notification();
        }
        assert_eq!(*seen.borrow(), vec![("queue".to_string(), 0)]);
        assert!(board.drain_due_notifications().is_empty());
    }

    #[test]
    fn test_unregistered_listener_is_not_called() {
        let calls = Rc::new(RefCell::new(0));
        let mut board = SyncBoard::default();
        let counter = Rc::clone(&calls);
        let key = board.register_listener(move |_, _| *counter.borrow_mut() += 1);
        board.unregister_listener(key);

        board.mark_sync_started("queue", Utc::now());
        for notification in board.drain_due_notifications() {
            notification();
        }
        assert_eq!(*calls.borrow(), 0);
    }
}
