//! Card annotations.
//!
//! Every listing card whose identifier resolves carries exactly one
//! annotation: an edit icon with a tooltip, and a snippet of the note.

use crate::action::Action;
use crate::config::Config;
use crate::error::Result;
use crate::mirror::NoteMirror;
use crate::page::{create_with_class, Page};
use crate::resolver::{resolve_card, ListingId};
use crate::selector::{AttrOp, Selector};

/// Card shapes seen across search list, grid and "nearby homes" widgets.
pub const CARD_PATTERNS: &[Selector] = &[
    Selector::tag("article"),
    Selector::tag("li").with_attr("class", AttrOp::Contains("ListItem-")),
    Selector::attr("data-test", AttrOp::Equals("property-card")),
];

const MEDIA_WRAPPERS: &[Selector] = &[
    Selector::attr("class", AttrOp::Contains("Photo-")),
    Selector::class("list-card-top"),
];

pub const ANNOTATION_CLASS: &str = "znt-card-annotation";
pub const ICON_CLASS: &str = "znt-card-indicator";
pub const TOOLTIP_CLASS: &str = "znt-tooltip";
pub const SNIPPET_CLASS: &str = "znt-card-snippet";
pub const HAS_NOTE_CLASS: &str = "znt-has-note";
pub const HIDDEN_CLASS: &str = "znt-hidden";
pub const SAVE_FAILED_CLASS: &str = "znt-save-failed";
const GLYPH_CLASS: &str = "znt-glyph";

pub const PLACEHOLDER_TOOLTIP: &str = "Click to add a note";
pub const SAVE_FAILED_TOOLTIP: &str = "Save failed, click to retry";

const ANNOTATION: Selector = Selector::class(ANNOTATION_CLASS);
const ICON: Selector = Selector::class(ICON_CLASS);
const TOOLTIP: Selector = Selector::class(TOOLTIP_CLASS);
const SNIPPET: Selector = Selector::class(SNIPPET_CLASS);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Cards matched by any pattern.
    pub cards: usize,
    /// Cards now carrying an annotation.
    pub annotated: usize,
    /// Annotated cards whose note is displayable.
    pub with_notes: usize,
    /// Cards without a resolvable identifier.
    pub skipped: usize,
    /// Wrappers left to the inner card of the same listing.
    pub nested: usize,
    /// Cards where a page write threw.
    pub failed: usize,
}

struct Parts<N> {
    annotation: N,
    icon: N,
    tooltip: N,
    snippet: N,
}

/// Truncates `text` to `max_chars` characters, marking the cut with "...".
pub fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Brings every card under `scope` in line with the mirror.
///
/// Safe to call as often as needed: existing annotations are updated in
/// place, and only differing values are written.
pub fn synchronize<P: Page>(
    page: &P,
    scope: &P::Node,
    mirror: &NoteMirror,
    config: &Config,
) -> SyncReport {
    let mut report = SyncReport::default();
    for card in page.select_all(scope, CARD_PATTERNS) {
        report.cards += 1;
        let Some(id) = resolve_card(page, &card) else {
            report.skipped += 1;
            continue;
        };
        if wraps_same_listing(page, &card, &id) {
            release_wrapper_annotations(page, &card);
            report.nested += 1;
            continue;
        }
        match annotate(page, &card, &id, mirror, config) {
            Ok(has_note) => {
                report.annotated += 1;
                if has_note {
                    report.with_notes += 1;
                }
            }
            Err(err) => {
                tracing::warn!(%id, "card annotation failed: {err}");
                report.failed += 1;
            }
        }
    }
    tracing::debug!(
        cards = report.cards,
        annotated = report.annotated,
        skipped = report.skipped,
        "cards synchronized"
    );
    report
}

/// A list item wrapping an `article` for the same listing matches two card
/// shapes; only the innermost one is annotated.
fn wraps_same_listing<P: Page>(page: &P, card: &P::Node, id: &ListingId) -> bool {
    page.select_all(card, CARD_PATTERNS)
        .iter()
        .any(|inner| resolve_card(page, inner).as_ref() == Some(id))
}

/// Removes annotations a wrapper received before its inner card rendered.
/// Annotations inside inner cards belong to those cards and stay.
fn release_wrapper_annotations<P: Page>(page: &P, wrapper: &P::Node) {
    let owned_by_inner: Vec<P::Node> = page
        .select_all(wrapper, CARD_PATTERNS)
        .iter()
        .flat_map(|inner| page.select_all(inner, &[ANNOTATION]))
        .collect();
    for annotation in page.select_all(wrapper, &[ANNOTATION]) {
        if !owned_by_inner.contains(&annotation) {
            page.remove(&annotation);
        }
    }
}

fn annotate<P: Page>(
    page: &P,
    card: &P::Node,
    id: &ListingId,
    mirror: &NoteMirror,
    config: &Config,
) -> Result<bool> {
    let parts = match page.select(card, &[ANNOTATION]) {
        Some(existing) => match existing_parts(page, existing.clone()) {
            Some(parts) => parts,
            None => {
                // Partially stripped by the host; start over.
                page.remove(&existing);
                build(page, card)?
            }
        },
        None => build(page, card)?,
    };

    page.update_attribute(&parts.annotation, crate::action::ID_ATTR, id.as_str())?;
    Action::Edit(id.clone()).bind(page, &parts.icon)?;

    let note = mirror.displayable(id);
    let failed = mirror.save_failed(id);
    page.update_class(&parts.annotation, HAS_NOTE_CLASS, note.is_some());
    page.update_class(&parts.annotation, SAVE_FAILED_CLASS, failed);
    match note {
        Some(text) => {
            page.update_text(&parts.snippet, &snippet(text, config.snippet_chars));
            page.update_class(&parts.snippet, HIDDEN_CLASS, false);
            page.update_text(&parts.tooltip, if failed { SAVE_FAILED_TOOLTIP } else { text });
        }
        None => {
            page.update_text(&parts.snippet, "");
            page.update_class(&parts.snippet, HIDDEN_CLASS, true);
            let tooltip = if failed { SAVE_FAILED_TOOLTIP } else { PLACEHOLDER_TOOLTIP };
            page.update_text(&parts.tooltip, tooltip);
        }
    }
    Ok(note.is_some())
}

fn existing_parts<P: Page>(page: &P, annotation: P::Node) -> Option<Parts<P::Node>> {
    let icon = page.select(&annotation, &[ICON])?;
    let tooltip = page.select(&icon, &[TOOLTIP])?;
    let snippet = page.select(&annotation, &[SNIPPET])?;
    Some(Parts {
        annotation,
        icon,
        tooltip,
        snippet,
    })
}

fn build<P: Page>(page: &P, card: &P::Node) -> Result<Parts<P::Node>> {
    let anchor = page
        .select_first_of(card, MEDIA_WRAPPERS)
        .unwrap_or_else(|| card.clone());
    if page.is_statically_positioned(&anchor) {
        page.set_style(&anchor, "position", "relative")?;
    }

    let annotation = create_with_class(page, "div", ANNOTATION_CLASS, None)?;
    let icon = create_with_class(page, "button", ICON_CLASS, None)?;
    page.set_attribute(&icon, "type", "button")?;
    page.set_attribute(&icon, "aria-label", "Edit note")?;
    let glyph = create_with_class(page, "span", GLYPH_CLASS, None)?;
    page.set_text(&glyph, "\u{1F4DD}");
    let tooltip = create_with_class(page, "div", TOOLTIP_CLASS, None)?;
    let snippet = create_with_class(page, "div", SNIPPET_CLASS, None)?;

    page.append(&icon, &glyph)?;
    page.append(&icon, &tooltip)?;
    page.append(&annotation, &icon)?;
    page.append(&annotation, &snippet)?;
    // Attach last so a failure above leaves the card untouched.
    page.append(&anchor, &annotation)?;

    Ok(Parts {
        annotation,
        icon,
        tooltip,
        snippet,
    })
}
