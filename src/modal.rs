//! State of the page-global edit modal.
//!
//! The overlay itself is rendered once by the web layer; this type decides
//! what it shows and what a save writes.

use crate::mirror::{NoteMirror, PendingWrite};
use crate::resolver::ListingId;

#[derive(Debug, Default)]
pub struct EditModal {
    target: Option<ListingId>,
    draft: String,
}

impl EditModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the modal to `id` and seeds the draft from the mirror. Opening
    /// while already open simply rebinds.
    pub fn open(&mut self, id: ListingId, mirror: &NoteMirror) -> &str {
        self.draft = mirror.get(&id).unwrap_or_default().to_string();
        self.target = Some(id);
        &self.draft
    }

    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&ListingId> {
        self.target.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Writes the draft through the mirror and closes. `None` when nothing
    /// is bound.
    pub fn save(&mut self, mirror: &mut NoteMirror) -> Option<PendingWrite> {
        let id = self.target.take()?;
        let text = std::mem::take(&mut self.draft);
        Some(mirror.save(id, text))
    }

    /// Closes without saving (close button, backdrop click).
    pub fn close(&mut self) {
        self.target = None;
        self.draft.clear();
    }
}
