//! `chrome.storage.local` behind [`NoteStore`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

use super::describe;
use crate::error::{Error, Result};
use crate::store::{classify_change, Delivery, NoteStore};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn local_get(keys: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn local_set(items: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn add_changed_listener(
        listener: &Closure<dyn FnMut(JsValue, JsValue)>,
    ) -> std::result::Result<(), JsValue>;
}

pub struct ChromeStore;

impl NoteStore for ChromeStore {
    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        let raw = local_get(JsValue::NULL)
            .await
            .map_err(|err| Error::StorageUnavailable(describe(&err)))?;
        serde_wasm_bindgen::from_value(raw).map_err(|err| Error::Storage(err.to_string()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let items = Value::Object(serde_json::Map::from_iter([(key.to_string(), value)]))
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| Error::Storage(err.to_string()))?;
        local_set(items)
            .await
            .map(|_| ())
            .map_err(|err| Error::Storage(describe(&err)))
    }
}

#[derive(Deserialize)]
struct RawChange {
    #[serde(rename = "newValue", default)]
    new_value: Option<Value>,
}

/// Decodes the `changes` argument of an `onChanged` event.
pub fn parse_changes(changes: JsValue) -> Vec<Delivery> {
    let parsed: HashMap<String, RawChange> = match serde_wasm_bindgen::from_value(changes) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!("unreadable storage change: {err}");
            return Vec::new();
        }
    };
    parsed
        .into_iter()
        .filter_map(|(key, change)| classify_change(key, change.new_value))
        .collect()
}

pub fn subscribe(listener: &Closure<dyn FnMut(JsValue, JsValue)>) -> Result<()> {
    add_changed_listener(listener).map_err(|err| Error::StorageUnavailable(describe(&err)))
}
