//! Note editor on a listing's own detail page.

use crate::action::{Action, ID_ATTR};
use crate::error::Result;
use crate::mirror::NoteMirror;
use crate::page::{create_with_class, Page};
use crate::resolver::{resolve_page, ListingId};
use crate::selector::{AttrOp, Selector};

pub const PANEL_ID: &str = "znt-details-container";
pub const TEXTAREA_ID: &str = "znt-note-area";
pub const SAVE_BUTTON_ID: &str = "znt-save-btn";
pub const MESSAGE_ID: &str = "znt-msg";

const VISIBLE_CLASS: &str = "visible";
const ERROR_CLASS: &str = "znt-error";

/// Layout regions the panel can be prepended to, most preferred first. The
/// host's detail layout varies between experiments.
const PLACEMENTS: &[Selector] = &[
    Selector::attr("data-testid", AttrOp::Equals("home-details-chip-container")),
    Selector::class("ds-data-col"),
    Selector::attr("data-testid", AttrOp::Equals("data-column")),
];

const TEXTAREA: Selector = Selector::attr("id", AttrOp::Equals(TEXTAREA_ID));
const MESSAGE: Selector = Selector::attr("id", AttrOp::Equals(MESSAGE_ID));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelOutcome {
    /// The page does not resolve to a listing.
    NotListing,
    /// No placement region matched; the panel is absent for now.
    NoPlacement,
    Injected(ListingId),
    Refreshed(ListingId),
    /// The editor has focus; the mirror value waits.
    Preserved(ListingId),
    Unchanged(ListingId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Idle,
    Saving,
    Saved,
    Failed,
}

impl Feedback {
    fn message(self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Saving => Some("Saving..."),
            Self::Saved => Some("Note Saved!"),
            Self::Failed => Some("Save failed, try again"),
        }
    }
}

/// Tracks the value last pushed into the editor so that passes which bring
/// nothing new leave the user's text alone.
#[derive(Debug, Default)]
pub struct DetailPanel {
    synced: Option<(ListingId, String)>,
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures the current listing page carries exactly one panel bound to
    /// its identifier, replacing a panel left over from another listing.
    pub fn ensure_present<P: Page>(&mut self, page: &P, mirror: &NoteMirror) -> Result<PanelOutcome> {
        let Some(id) = resolve_page(page) else {
            return Ok(PanelOutcome::NotListing);
        };

        if let Some(panel) = page.element_by_id(PANEL_ID) {
            let bound = page.attribute(&panel, ID_ATTR);
            if bound.as_deref() == Some(id.as_str()) {
                if let Some(area) = page.select(&panel, &[TEXTAREA]) {
                    return Ok(self.refresh(page, &area, id, mirror));
                }
            }
            tracing::info!(stale = ?bound, %id, "replacing detail panel");
            page.remove(&panel);
            self.synced = None;
        }

        let Some(target) = page.select_first_of(&page.root(), PLACEMENTS) else {
            tracing::debug!(%id, "no placement region for detail panel");
            return Ok(PanelOutcome::NoPlacement);
        };

        let (panel, area) = build(page, &id)?;
        let text = mirror.get(&id).unwrap_or_default().to_string();
        page.set_value(&area, &text);
        page.prepend(&target, &panel)?;
        tracing::info!(%id, "detail panel injected");
        self.synced = Some((id.clone(), text));
        Ok(PanelOutcome::Injected(id))
    }

    fn refresh<P: Page>(
        &mut self,
        page: &P,
        area: &P::Node,
        id: ListingId,
        mirror: &NoteMirror,
    ) -> PanelOutcome {
        let current = mirror.get(&id).unwrap_or_default();
        let in_sync = self
            .synced
            .as_ref()
            .is_some_and(|(synced_id, text)| *synced_id == id && text == current);
        if in_sync {
            return PanelOutcome::Unchanged(id);
        }
        if page.has_focus(area) {
            return PanelOutcome::Preserved(id);
        }
        page.update_value(area, current);
        self.synced = Some((id.clone(), current.to_string()));
        PanelOutcome::Refreshed(id)
    }

    /// Removes the panel, used when the page is no longer a listing.
    pub fn retire<P: Page>(&mut self, page: &P) {
        if let Some(panel) = page.element_by_id(PANEL_ID) {
            tracing::info!("removing detail panel from non-listing page");
            page.remove(&panel);
        }
        self.synced = None;
    }

    /// Records text written through the panel so the next pass treats it as
    /// already in sync.
    pub fn mark_saved(&mut self, id: &ListingId, text: &str) {
        self.synced = Some((id.clone(), text.to_string()));
    }

    pub fn bound_id<P: Page>(page: &P) -> Option<ListingId> {
        let panel = page.element_by_id(PANEL_ID)?;
        ListingId::from_digits(&page.attribute(&panel, ID_ATTR)?)
    }

    /// The panel's identifier and the text currently in its editor.
    pub fn draft<P: Page>(page: &P) -> Option<(ListingId, String)> {
        let panel = page.element_by_id(PANEL_ID)?;
        let id = ListingId::from_digits(&page.attribute(&panel, ID_ATTR)?)?;
        let area = page.select(&panel, &[TEXTAREA])?;
        Some((id, page.value(&area)))
    }

    pub fn show_feedback<P: Page>(page: &P, feedback: Feedback) {
        let Some(panel) = page.element_by_id(PANEL_ID) else {
            return;
        };
        let Some(message) = page.select(&panel, &[MESSAGE]) else {
            return;
        };
        if let Some(text) = feedback.message() {
            page.update_text(&message, text);
        }
        page.update_class(&message, VISIBLE_CLASS, feedback != Feedback::Idle);
        page.update_class(&message, ERROR_CLASS, feedback == Feedback::Failed);
    }
}

fn build<P: Page>(page: &P, id: &ListingId) -> Result<(P::Node, P::Node)> {
    let panel = create_with_class(page, "div", "znt-note-container", Some(PANEL_ID))?;
    page.set_attribute(&panel, ID_ATTR, id.as_str())?;

    let title = create_with_class(page, "div", "znt-title", None)?;
    page.set_text(&title, "My Private Note");

    let area = create_with_class(page, "textarea", "znt-textarea", Some(TEXTAREA_ID))?;
    page.set_attribute(&area, "placeholder", "Enter your thoughts about this property...")?;

    let actions = create_with_class(page, "div", "znt-actions", None)?;
    let save = create_with_class(page, "button", "znt-save-btn", Some(SAVE_BUTTON_ID))?;
    page.set_attribute(&save, "type", "button")?;
    page.set_text(&save, "Save Note");
    Action::SavePanel.bind(page, &save)?;
    let message = create_with_class(page, "span", "znt-status-msg", Some(MESSAGE_ID))?;

    page.append(&actions, &save)?;
    page.append(&actions, &message)?;
    page.append(&panel, &title)?;
    page.append(&panel, &area)?;
    page.append(&panel, &actions)?;
    Ok((panel, area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::StoreChange;
    use crate::page::memory::{MemoryPage, NodeId};

    fn detail_page(zpid: &str) -> (MemoryPage, NodeId) {
        let page = MemoryPage::new(&format!(
            "https://www.zillow.com/homedetails/1-Main-St/{zpid}_zpid/"
        ));
        let column = page.add(page.body_id(), "div", &[("class", "ds-data-col")]);
        page.add(column, "div", &[("class", "ds-facts")]);
        (page, column)
    }

    fn mirror_with(id: &str, text: &str) -> NoteMirror {
        let mut mirror = NoteMirror::new();
        mirror.load(vec![(ListingId::new(id), text.to_string())]);
        mirror
    }

    fn editor(page: &MemoryPage) -> NodeId {
        page.element_by_id(TEXTAREA_ID).unwrap()
    }

    #[test]
    fn injects_seeded_panel_at_first_placement() {
        let (page, column) = detail_page("42");
        let chip = page.add(
            page.body_id(),
            "div",
            &[("data-testid", "home-details-chip-container")],
        );
        let mirror = mirror_with("42", "Check the basement");
        let mut panel = DetailPanel::new();

        let outcome = panel.ensure_present(&page, &mirror).unwrap();
        assert_eq!(outcome, PanelOutcome::Injected(ListingId::new("42")));
        assert_eq!(page.value(&editor(&page)), "Check the basement");

        let node = page.element_by_id(PANEL_ID).unwrap();
        assert_eq!(page.select(&chip, &[Selector::attr("id", AttrOp::Equals(PANEL_ID))]), Some(node));
        assert_eq!(page.select(&column, &[Selector::attr("id", AttrOp::Equals(PANEL_ID))]), None);
        assert_eq!(DetailPanel::bound_id(&page), Some(ListingId::new("42")));
    }

    #[test]
    fn repeated_passes_keep_one_panel() {
        let (page, _) = detail_page("42");
        let mirror = mirror_with("42", "note");
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &mirror).unwrap();
        let outcome = panel.ensure_present(&page, &mirror).unwrap();
        assert_eq!(outcome, PanelOutcome::Unchanged(ListingId::new("42")));
        assert_eq!(
            page.count(&[Selector::attr("id", AttrOp::Equals(PANEL_ID))]),
            1
        );
    }

    #[test]
    fn no_placement_is_not_an_error() {
        let page = MemoryPage::new("https://www.zillow.com/homedetails/1-Main-St/42_zpid/");
        let mut panel = DetailPanel::new();
        let outcome = panel.ensure_present(&page, &NoteMirror::new()).unwrap();
        assert_eq!(outcome, PanelOutcome::NoPlacement);
        assert_eq!(page.element_by_id(PANEL_ID), None);
    }

    #[test]
    fn non_listing_page_is_a_no_op() {
        let page = MemoryPage::new("https://www.zillow.com/homes/for_sale/");
        page.add(page.body_id(), "div", &[("class", "ds-data-col")]);
        let mut panel = DetailPanel::new();
        let outcome = panel.ensure_present(&page, &NoteMirror::new()).unwrap();
        assert_eq!(outcome, PanelOutcome::NotListing);
    }

    #[test]
    fn stale_panel_is_replaced() {
        let (page, _) = detail_page("42");
        let mirror = {
            let mut mirror = mirror_with("42", "first house");
            mirror.apply_external(StoreChange::Set(ListingId::new("43"), "second house".into()));
            mirror
        };
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &mirror).unwrap();
        let old = page.element_by_id(PANEL_ID).unwrap();

        page.set_location("https://www.zillow.com/homedetails/2-Main-St/43_zpid/");
        let outcome = panel.ensure_present(&page, &mirror).unwrap();

        assert_eq!(outcome, PanelOutcome::Injected(ListingId::new("43")));
        assert!(!page.is_attached(old));
        assert_eq!(DetailPanel::bound_id(&page), Some(ListingId::new("43")));
        assert_eq!(page.value(&editor(&page)), "second house");
    }

    #[test]
    fn focused_editor_is_not_overwritten() {
        let (page, _) = detail_page("42");
        let mut mirror = mirror_with("42", "original");
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &mirror).unwrap();

        let area = editor(&page);
        page.focus(area);
        page.set_value(&area, "user is typing");
        mirror.apply_external(StoreChange::Set(ListingId::new("42"), "from other tab".into()));

        let outcome = panel.ensure_present(&page, &mirror).unwrap();
        assert_eq!(outcome, PanelOutcome::Preserved(ListingId::new("42")));
        assert_eq!(page.value(&area), "user is typing");

        page.blur();
        let outcome = panel.ensure_present(&page, &mirror).unwrap();
        assert_eq!(outcome, PanelOutcome::Refreshed(ListingId::new("42")));
        assert_eq!(page.value(&area), "from other tab");
    }

    #[test]
    fn unrelated_pass_keeps_blurred_draft() {
        let (page, _) = detail_page("42");
        let mirror = mirror_with("42", "original");
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &mirror).unwrap();

        let area = editor(&page);
        page.set_value(&area, "unsaved draft");
        panel.ensure_present(&page, &mirror).unwrap();
        assert_eq!(page.value(&area), "unsaved draft");
        assert_eq!(
            DetailPanel::draft(&page),
            Some((ListingId::new("42"), "unsaved draft".to_string()))
        );
    }

    #[test]
    fn feedback_states() {
        let (page, _) = detail_page("42");
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &NoteMirror::new()).unwrap();
        let message = page.element_by_id(MESSAGE_ID).unwrap();

        DetailPanel::show_feedback(&page, Feedback::Saving);
        assert_eq!(page.text(&message), "Saving...");
        assert!(page.has_class(&message, VISIBLE_CLASS));

        DetailPanel::show_feedback(&page, Feedback::Failed);
        assert!(page.has_class(&message, ERROR_CLASS));

        DetailPanel::show_feedback(&page, Feedback::Saved);
        assert_eq!(page.text(&message), "Note Saved!");
        assert!(!page.has_class(&message, ERROR_CLASS));

        DetailPanel::show_feedback(&page, Feedback::Idle);
        assert!(!page.has_class(&message, VISIBLE_CLASS));
    }

    #[test]
    fn retire_removes_panel() {
        let (page, _) = detail_page("42");
        let mut panel = DetailPanel::new();
        panel.ensure_present(&page, &NoteMirror::new()).unwrap();
        page.set_location("https://www.zillow.com/homes/for_sale/");
        panel.retire(&page);
        assert_eq!(page.element_by_id(PANEL_ID), None);
    }
}
