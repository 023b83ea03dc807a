//! In-memory mirror of the persistent note store.
//!
//! Reads never touch the store. Local saves land here synchronously and hand
//! back a [`PendingWrite`] that the caller persists and later settles.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::resolver::ListingId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// One delivered change notification for a note key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
    Set(ListingId, String),
    Removed(ListingId),
}

impl StoreChange {
    pub fn id(&self) -> &ListingId {
        match self {
            Self::Set(id, _) | Self::Removed(id) => id,
        }
    }
}

/// A write applied to the mirror but not yet confirmed by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    id: ListingId,
    text: String,
    seq: u64,
}

impl PendingWrite {
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub fn id(&self) -> &ListingId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct NoteMirror {
    notes: HashMap<ListingId, String>,
    state: LoadState,
    pending: HashMap<ListingId, u64>,
    /// Keys changed by another tab before the bulk load landed.
    observed_early: HashSet<ListingId>,
    /// Keys whose latest local write the store rejected.
    failed: HashSet<ListingId>,
    next_seq: u64,
}

/// Whether a note value should produce a visible indicator.
pub fn is_displayable(text: &str) -> bool {
    !text.trim().is_empty()
}

impl NoteMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// Marks a bulk load as in flight. Returns `false` if one already is, or
    /// the mirror is loaded.
    pub fn begin_load(&mut self) -> bool {
        if self.state != LoadState::Unloaded {
            return false;
        }
        self.state = LoadState::Loading;
        true
    }

    /// Resets an in-flight load so the next request retries it.
    pub fn abort_load(&mut self) {
        if self.state == LoadState::Loading {
            self.state = LoadState::Unloaded;
        }
    }

    /// Replaces the contents with a full snapshot of the store. Keys with an
    /// unconfirmed local write, or changed by another tab while the snapshot
    /// was in flight, keep the value seen here.
    pub fn load(&mut self, snapshot: impl IntoIterator<Item = (ListingId, String)>) {
        let mut notes: HashMap<ListingId, String> = snapshot.into_iter().collect();
        for id in self.pending.keys().chain(&self.observed_early) {
            match self.notes.get(id) {
                Some(local) => {
                    notes.insert(id.clone(), local.clone());
                }
                None => {
                    notes.remove(id);
                }
            }
        }
        self.notes = notes;
        self.observed_early.clear();
        self.state = LoadState::Loaded;
        tracing::debug!(notes = self.notes.len(), "note mirror loaded");
    }

    pub fn get(&self, id: &ListingId) -> Option<&str> {
        self.notes.get(id).map(String::as_str)
    }

    /// The note for `id` if it is worth displaying (not empty or blank).
    pub fn displayable(&self, id: &ListingId) -> Option<&str> {
        self.get(id).filter(|text| is_displayable(text))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Applies a local save. The returned write must be persisted and then
    /// passed to [`NoteMirror::settle`].
    pub fn save(&mut self, id: ListingId, text: impl Into<String>) -> PendingWrite {
        let text = text.into();
        self.next_seq += 1;
        self.notes.insert(id.clone(), text.clone());
        self.pending.insert(id.clone(), self.next_seq);
        self.failed.remove(&id);
        PendingWrite {
            id,
            text,
            seq: self.next_seq,
        }
    }

    pub fn is_pending(&self, id: &ListingId) -> bool {
        self.pending.contains_key(id)
    }

    /// Whether the latest local write for `id` was rejected and not retried.
    pub fn save_failed(&self, id: &ListingId) -> bool {
        self.failed.contains(id)
    }

    /// Records the store's answer for a write. A failure leaves the local
    /// value in place and marks the key until the next save of it settles.
    pub fn settle(&mut self, write: &PendingWrite, outcome: Result<(), Error>) -> SaveStatus {
        let latest = self.pending.get(&write.id) == Some(&write.seq);
        if latest {
            self.pending.remove(&write.id);
        }
        match outcome {
            Ok(()) => {
                if latest {
                    self.failed.remove(&write.id);
                }
                SaveStatus::Saved
            }
            Err(err) => {
                tracing::warn!(id = %write.id, "note save failed: {err}");
                if latest {
                    self.failed.insert(write.id.clone());
                }
                SaveStatus::Failed(err.to_string())
            }
        }
    }

    /// Applies a change delivered by the store subscription. Returns whether
    /// the visible value changed.
    pub fn apply_external(&mut self, change: StoreChange) -> bool {
        // The other tab's value now stands; a local rejection no longer shows.
        self.failed.remove(change.id());
        if !self.is_loaded() {
            self.observed_early.insert(change.id().clone());
        }
        match change {
            StoreChange::Set(id, text) => {
                let changed = self.notes.get(&id) != Some(&text);
                self.notes.insert(id, text);
                changed
            }
            StoreChange::Removed(id) => self.notes.remove(&id).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ListingId {
        ListingId::new(raw)
    }

    #[test]
    fn save_is_visible_immediately() {
        let mut mirror = NoteMirror::new();
        mirror.load(Vec::new());
        let write = mirror.save(id("1"), "Great yard");
        assert_eq!(mirror.get(&id("1")), Some("Great yard"));
        assert!(mirror.is_pending(&id("1")));

        assert_eq!(mirror.settle(&write, Ok(())), SaveStatus::Saved);
        assert!(!mirror.is_pending(&id("1")));
        assert_eq!(mirror.get(&id("1")), Some("Great yard"));
    }

    #[test]
    fn empty_string_round_trips_but_is_not_displayable() {
        let mut mirror = NoteMirror::new();
        let write = mirror.save(id("1"), "");
        mirror.settle(&write, Ok(()));
        assert_eq!(mirror.get(&id("1")), Some(""));
        assert_eq!(mirror.displayable(&id("1")), None);

        mirror.save(id("2"), " \n\t ");
        assert_eq!(mirror.displayable(&id("2")), None);
    }

    #[test]
    fn failed_save_keeps_optimistic_value() {
        let mut mirror = NoteMirror::new();
        let write = mirror.save(id("1"), "draft");
        let status = mirror.settle(&write, Err(Error::Storage("quota".into())));
        assert_eq!(status, SaveStatus::Failed("Storage error: quota".into()));
        assert_eq!(mirror.get(&id("1")), Some("draft"));
    }

    #[test]
    fn older_settlement_does_not_clear_newer_pending() {
        let mut mirror = NoteMirror::new();
        let first = mirror.save(id("1"), "a");
        let _second = mirror.save(id("1"), "b");
        mirror.settle(&first, Ok(()));
        assert!(mirror.is_pending(&id("1")));
        assert_eq!(mirror.get(&id("1")), Some("b"));
    }

    #[test]
    fn external_changes_apply_in_delivery_order() {
        let mut mirror = NoteMirror::new();
        mirror.load(vec![(id("1"), "old".to_string())]);
        assert!(mirror.apply_external(StoreChange::Set(id("1"), "new".into())));
        assert!(!mirror.apply_external(StoreChange::Set(id("1"), "new".into())));
        mirror.save(id("1"), "local");
        assert!(mirror.apply_external(StoreChange::Set(id("1"), "other tab".into())));
        assert_eq!(mirror.get(&id("1")), Some("other tab"));
        assert!(mirror.apply_external(StoreChange::Removed(id("1"))));
        assert_eq!(mirror.get(&id("1")), None);
    }

    #[test]
    fn load_preserves_unconfirmed_local_writes() {
        let mut mirror = NoteMirror::new();
        assert!(mirror.begin_load());
        assert!(!mirror.begin_load());
        mirror.save(id("1"), "typed during load");
        mirror.load(vec![
            (id("1"), "stale".to_string()),
            (id("2"), "kept".to_string()),
        ]);
        assert!(mirror.is_loaded());
        assert_eq!(mirror.get(&id("1")), Some("typed during load"));
        assert_eq!(mirror.get(&id("2")), Some("kept"));
    }

    #[test]
    fn load_keeps_changes_seen_while_in_flight() {
        let mut mirror = NoteMirror::new();
        assert!(mirror.begin_load());
        mirror.apply_external(StoreChange::Set(id("1"), "new".into()));
        mirror.apply_external(StoreChange::Removed(id("2")));
        mirror.load(vec![
            (id("1"), "old".to_string()),
            (id("2"), "deleted elsewhere".to_string()),
            (id("3"), "untouched".to_string()),
        ]);
        assert_eq!(mirror.get(&id("1")), Some("new"));
        assert_eq!(mirror.get(&id("2")), None);
        assert_eq!(mirror.get(&id("3")), Some("untouched"));

        // Only the in-flight window is protected.
        mirror.load(vec![(id("1"), "reloaded".to_string())]);
        assert_eq!(mirror.get(&id("1")), Some("reloaded"));
    }

    #[test]
    fn rejected_write_stays_marked_until_retried() {
        let mut mirror = NoteMirror::new();
        let write = mirror.save(id("1"), "draft");
        mirror.settle(&write, Err(Error::Storage("quota".into())));
        assert!(mirror.save_failed(&id("1")));

        let retry = mirror.save(id("1"), "draft");
        assert!(!mirror.save_failed(&id("1")));
        mirror.settle(&retry, Ok(()));
        assert!(!mirror.save_failed(&id("1")));
    }

    #[test]
    fn stale_rejection_does_not_mark_newer_write() {
        let mut mirror = NoteMirror::new();
        let first = mirror.save(id("1"), "a");
        let _second = mirror.save(id("1"), "b");
        mirror.settle(&first, Err(Error::Storage("quota".into())));
        assert!(!mirror.save_failed(&id("1")));
    }

    #[test]
    fn aborted_load_can_retry() {
        let mut mirror = NoteMirror::new();
        assert!(mirror.begin_load());
        mirror.abort_load();
        assert_eq!(mirror.state(), LoadState::Unloaded);
        assert!(mirror.begin_load());
    }
}
