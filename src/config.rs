use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Runtime settings, stored as a JSON object under [`Config::STORAGE_KEY`].
///
/// Missing fields take their defaults, so a partial object is valid.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Quiet period that collapses a mutation burst into one pass.
    pub debounce_ms: u32,
    /// Character bound of the snippet shown on a card.
    pub snippet_chars: usize,
    /// How long the "Note Saved!" message stays visible.
    pub saved_flash_ms: u32,
    /// Origin used to absolutise listing links in exports.
    pub site_origin: String,
    /// Console filter for this crate's logs, `error` through `trace`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            snippet_chars: 60,
            saved_flash_ms: 2000,
            site_origin: "https://www.zillow.com".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub const STORAGE_KEY: &'static str = "znt:settings";

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parses a stored settings value, falling back to defaults when it is
    /// malformed.
    pub fn from_value_or_default(value: Option<serde_json::Value>) -> Self {
        match value.map(Self::from_value) {
            Some(Ok(config)) => config,
            Some(Err(err)) => {
                tracing::warn!("Ignoring stored settings: {err}");
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Origin without a trailing slash.
    pub fn origin(&self) -> &str {
        self.site_origin.trim_end_matches('/')
    }
}
