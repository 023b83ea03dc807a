//! Top-level driver.
//!
//! The coordinator is the only place that triggers work. Mutation and
//! navigation signals are coalesced by a [`Debouncer`]; each surviving signal
//! runs one pass, full after a location change and incremental otherwise.

use crate::action::Action;
use crate::annotator::{self, SyncReport};
use crate::config::Config;
use crate::detail_panel::{DetailPanel, Feedback, TEXTAREA_ID};
use crate::error::{Error, Result};
use crate::export;
use crate::mirror::{NoteMirror, PendingWrite, SaveStatus, StoreChange};
use crate::modal::EditModal;
use crate::page::{create_with_class, Page};
use crate::resolver::{is_detail_location, ListingId};
use crate::store::{Delivery, StoreSnapshot};

pub const EXPORT_BUTTON_ID: &str = "znt-export-btn";

/// Identifies one scheduled debounce timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

/// Trailing-edge coalescing: every signal supersedes the previous one, and
/// only the ticket of the latest signal may fire.
#[derive(Debug, Default)]
pub struct Debouncer {
    generation: u64,
    armed: bool,
}

impl Debouncer {
    pub fn signal(&mut self) -> Ticket {
        self.generation += 1;
        self.armed = true;
        Ticket(self.generation)
    }

    pub fn fire(&mut self, ticket: Ticket) -> bool {
        if self.armed && ticket.0 == self.generation {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Location changed: every piece of UI was re-established.
    Full(SyncReport),
    /// Same location: cards re-scanned, panel re-checked.
    Incremental(SyncReport),
    /// The mirror must be loaded first; the caller should read the store
    /// and hand the result to [`Coordinator::complete_load`].
    AwaitingLoad,
    /// A load is already in flight; its completion runs the pass.
    Deferred,
}

/// What the caller has to do after a user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Persist this write, then call [`Coordinator::write_settled`].
    Persist(PendingWrite),
    /// The modal was bound to a listing; show it with this draft.
    ShowModal { id: ListingId, draft: String },
    /// Show the export block.
    ShowExport(String),
}

pub struct Coordinator<P: Page> {
    page: P,
    config: Config,
    mirror: NoteMirror,
    panel: DetailPanel,
    modal: EditModal,
    debouncer: Debouncer,
    last_location: Option<String>,
    /// Sequence of the most recent write handed out for persisting.
    last_write: Option<u64>,
}

impl<P: Page> Coordinator<P> {
    pub fn new(page: P, config: Config) -> Self {
        Self {
            page,
            config,
            mirror: NoteMirror::new(),
            panel: DetailPanel::new(),
            modal: EditModal::new(),
            debouncer: Debouncer::default(),
            last_location: None,
            last_write: None,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mirror(&self) -> &NoteMirror {
        &self.mirror
    }

    pub fn modal(&self) -> &EditModal {
        &self.modal
    }

    /// Records a mutation or navigation signal. The caller schedules the
    /// returned ticket after `config().debounce_ms`, cancelling any earlier one.
    pub fn signal(&mut self) -> Ticket {
        self.debouncer.signal()
    }

    /// Focus left the element with `element_id`. Leaving the panel editor
    /// releases a value held back while it was focused, so it counts as a
    /// signal.
    pub fn on_focus_left(&mut self, element_id: Option<&str>) -> Option<Ticket> {
        (element_id == Some(TEXTAREA_ID)).then(|| self.signal())
    }

    /// Runs a pass if `ticket` is still the latest signal.
    pub fn fire(&mut self, ticket: Ticket) -> Option<Pass> {
        self.debouncer.fire(ticket).then(|| self.run_pass())
    }

    pub fn run_pass(&mut self) -> Pass {
        let location = self.page.location();
        let navigated = self.last_location.as_deref() != Some(location.as_str());
        if navigated {
            tracing::info!(location = %location, "location changed");
            self.last_location = Some(location);
        }

        if !self.mirror.is_loaded() {
            // A navigation seen now is still pending when the load lands,
            // which always runs a full init.
            return if self.mirror.begin_load() {
                Pass::AwaitingLoad
            } else {
                Pass::Deferred
            };
        }

        if navigated {
            Pass::Full(self.full_init())
        } else {
            Pass::Incremental(self.resync())
        }
    }

    /// Applies the bulk read and runs the full initialisation it was gating.
    pub fn complete_load(&mut self, snapshot: StoreSnapshot) -> SyncReport {
        self.config = snapshot.config();
        self.mirror.load(snapshot.notes);
        self.full_init()
    }

    /// The bulk read failed; the next signal retries it.
    pub fn fail_load(&mut self, err: &Error) {
        tracing::warn!("note store load failed: {err}");
        self.mirror.abort_load();
    }

    fn full_init(&mut self) -> SyncReport {
        let report = annotator::synchronize(&self.page, &self.page.root(), &self.mirror, &self.config);
        if is_detail_location(&self.page.location()) {
            self.retire_export_trigger();
            self.ensure_panel();
        } else {
            self.panel.retire(&self.page);
            if let Err(err) = self.ensure_export_trigger() {
                tracing::warn!("export trigger unavailable: {err}");
            }
        }
        report
    }

    fn resync(&mut self) -> SyncReport {
        let report = annotator::synchronize(&self.page, &self.page.root(), &self.mirror, &self.config);
        if is_detail_location(&self.page.location()) {
            self.ensure_panel();
        }
        report
    }

    fn ensure_panel(&mut self) {
        match self.panel.ensure_present(&self.page, &self.mirror) {
            Ok(outcome) => tracing::trace!(?outcome, "detail panel checked"),
            Err(err) => tracing::warn!("detail panel injection failed: {err}"),
        }
    }

    fn ensure_export_trigger(&self) -> Result<()> {
        if self.page.element_by_id(EXPORT_BUTTON_ID).is_some() {
            return Ok(());
        }
        let Some(body) = self.page.body() else {
            return Ok(());
        };
        let button = create_with_class(&self.page, "button", "znt-export-btn", Some(EXPORT_BUTTON_ID))?;
        self.page.set_attribute(&button, "type", "button")?;
        self.page.set_text(&button, "Export Listings");
        Action::Export.bind(&self.page, &button)?;
        self.page.append(&body, &button)
    }

    fn retire_export_trigger(&self) {
        if let Some(button) = self.page.element_by_id(EXPORT_BUTTON_ID) {
            self.page.remove(&button);
        }
    }

    /// Applies changes delivered by the store subscription and brings the
    /// visible UI in line without waiting for a mutation signal.
    pub fn on_external_change(&mut self, deliveries: impl IntoIterator<Item = Delivery>) -> bool {
        let mut changed = false;
        for delivery in deliveries {
            match delivery {
                Delivery::Note(change) => changed |= self.apply_note_change(change),
                Delivery::Settings(value) => {
                    self.config = Config::from_value_or_default(value);
                    changed = true;
                }
            }
        }
        if changed && self.mirror.is_loaded() {
            self.resync();
        }
        changed
    }

    fn apply_note_change(&mut self, change: StoreChange) -> bool {
        let id = change.id().clone();
        let changed = self.mirror.apply_external(change);
        if changed {
            tracing::debug!(%id, "external note change");
        }
        changed
    }

    /// Dispatches a clicked control.
    pub fn handle_action(&mut self, action: Action) -> Effect {
        match action {
            Action::Edit(id) => self.open_modal(id),
            Action::SavePanel => self.save_panel(),
            Action::Export => Effect::ShowExport(self.export_text()),
        }
    }

    pub fn open_modal(&mut self, id: ListingId) -> Effect {
        let draft = self.modal.open(id.clone(), &self.mirror).to_string();
        Effect::ShowModal { id, draft }
    }

    /// Saves the modal's draft. The modal closes either way.
    pub fn save_modal(&mut self, draft: impl Into<String>) -> Effect {
        if !self.modal.is_open() {
            return Effect::None;
        }
        self.modal.set_draft(draft);
        match self.modal.save(&mut self.mirror) {
            Some(write) => {
                self.last_write = Some(write.seq());
                self.resync();
                Effect::Persist(write)
            }
            None => Effect::None,
        }
    }

    pub fn close_modal(&mut self) {
        self.modal.close();
    }

    fn save_panel(&mut self) -> Effect {
        let Some((id, text)) = DetailPanel::draft(&self.page) else {
            return Effect::None;
        };
        self.panel.mark_saved(&id, &text);
        let write = self.mirror.save(id, text);
        self.last_write = Some(write.seq());
        DetailPanel::show_feedback(&self.page, Feedback::Saving);
        self.resync();
        Effect::Persist(write)
    }

    /// Records the store's answer for a write and surfaces it: on the panel
    /// if the panel shows that listing, and on the listing's cards.
    pub fn write_settled(&mut self, write: &PendingWrite, outcome: Result<()>) -> SaveStatus {
        let status = self.mirror.settle(write, outcome);
        if self.mirror.is_loaded() {
            self.resync();
        }
        if DetailPanel::bound_id(&self.page).as_ref() == Some(write.id()) {
            let feedback = match status {
                SaveStatus::Saved => Feedback::Saved,
                SaveStatus::Failed(_) => Feedback::Failed,
            };
            DetailPanel::show_feedback(&self.page, feedback);
        }
        status
    }

    /// Hides the transient "saved" message of `write`. Returns `false` when
    /// a later save has started and owns the message.
    pub fn clear_feedback(&mut self, write: &PendingWrite) -> bool {
        if self.last_write != Some(write.seq()) {
            return false;
        }
        DetailPanel::show_feedback(&self.page, Feedback::Idle);
        true
    }

    pub fn export_text(&self) -> String {
        export::export_text(&self.page, &self.mirror, &self.config)
    }
}
