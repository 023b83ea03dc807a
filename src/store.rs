//! Persistent store interface.
//!
//! The store is a flat key-value map owned by the browser. Note keys are
//! listing identifiers; keys under [`RESERVED_PREFIX`] belong to the
//! extension itself.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::mirror::StoreChange;
use crate::resolver::ListingId;

pub const RESERVED_PREFIX: &str = "znt:";

pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

#[allow(async_fn_in_trait)]
pub trait NoteStore {
    async fn get_all(&self) -> Result<HashMap<String, Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn set_note(&self, id: &ListingId, text: &str) -> Result<()> {
        self.set(id.as_str(), Value::String(text.to_string())).await
    }
}

/// A bulk read split into notes and settings.
#[derive(Debug, Default, PartialEq)]
pub struct StoreSnapshot {
    pub notes: Vec<(ListingId, String)>,
    pub settings: Option<Value>,
}

impl StoreSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut snapshot = Self::default();
        for (key, value) in entries {
            if key == Config::STORAGE_KEY {
                snapshot.settings = Some(value);
                continue;
            }
            if is_reserved_key(&key) {
                continue;
            }
            match value {
                Value::String(text) => snapshot.notes.push((ListingId::new(key), text)),
                other => tracing::debug!(key = %key, "skipping non-text store value: {other}"),
            }
        }
        snapshot
    }

    pub fn config(&self) -> Config {
        Config::from_value_or_default(self.settings.clone())
    }
}

/// What one changed key means to the engine.
#[derive(Debug, PartialEq)]
pub enum Delivery {
    Note(StoreChange),
    Settings(Option<Value>),
}

/// Classifies one `{key, newValue}` pair from the change subscription.
/// A missing `new_value` is a deletion.
pub fn classify_change(key: String, new_value: Option<Value>) -> Option<Delivery> {
    if key == Config::STORAGE_KEY {
        return Some(Delivery::Settings(new_value));
    }
    if is_reserved_key(&key) {
        return None;
    }
    let id = ListingId::new(key);
    match new_value {
        None => Some(Delivery::Note(StoreChange::Removed(id))),
        Some(Value::String(text)) => Some(Delivery::Note(StoreChange::Set(id, text))),
        Some(_) => None,
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn snapshot_separates_settings_and_notes() {
        let snapshot = StoreSnapshot::from_entries(vec![
            ("2077".to_string(), json!("Great yard")),
            ("znt:settings".to_string(), json!({ "snippet_chars": 20 })),
            ("znt:other".to_string(), json!("ignored")),
            ("31".to_string(), json!(42)),
        ]);
        assert_eq!(
            snapshot.notes,
            vec![(ListingId::new("2077"), "Great yard".to_string())]
        );
        assert_eq!(snapshot.config().snippet_chars, 20);
    }

    #[test]
    fn classifies_changes() {
        assert_eq!(
            classify_change("5".into(), None),
            Some(Delivery::Note(StoreChange::Removed(ListingId::new("5"))))
        );
        assert_eq!(
            classify_change("5".into(), Some(json!("hi"))),
            Some(Delivery::Note(StoreChange::Set(ListingId::new("5"), "hi".into())))
        );
        assert_eq!(
            classify_change("znt:settings".into(), Some(json!({}))),
            Some(Delivery::Settings(Some(json!({}))))
        );
        assert_eq!(classify_change("znt:cache".into(), None), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::default();
        block_on(store.set_note(&ListingId::new("9"), "")).unwrap();
        let all = block_on(store.get_all()).unwrap();
        assert_eq!(all.get("9"), Some(&json!("")));

        store.fail_writes.set(true);
        assert!(block_on(store.set_note(&ListingId::new("9"), "x")).is_err());
    }
}
