//! Plain-text export of the listings currently on screen.

use std::collections::HashSet;

use crate::annotator::CARD_PATTERNS;
use crate::config::Config;
use crate::mirror::NoteMirror;
use crate::page::Page;
use crate::resolver::{resolve_card, resolve_url, ListingId};
use crate::selector::{AttrOp, Selector};

pub const DIVIDER: &str = "----------------------------------------";
pub const EMPTY_MESSAGE: &str = "No listings found on this page.";
pub const NOTE_LABEL: &str = "MY NOTES:";

const PRICE: &[Selector] = &[
    Selector::attr("data-test", AttrOp::Equals("property-card-price")),
    Selector::class("list-card-price"),
];

const ADDRESS: &[Selector] = &[
    Selector::tag("address"),
    Selector::attr("data-test", AttrOp::Equals("property-card-addr")),
    Selector::class("list-card-addr"),
];

const LINKS: &[Selector] = &[
    Selector::tag("a").with_attr("href", AttrOp::Contains("_zpid")),
    Selector::tag("a").with_attr("href", AttrOp::Contains("zpid=")),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRecord {
    pub id: ListingId,
    pub address: String,
    pub price: String,
    pub link: String,
    pub note: Option<String>,
}

impl ExportRecord {
    fn render(&self) -> String {
        let mut block = format!("{}\n{}\n{}", self.address, self.price, self.link);
        if let Some(note) = &self.note {
            block.push('\n');
            block.push_str(NOTE_LABEL);
            block.push(' ');
            block.push_str(note);
        }
        block
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn absolutize(href: &str, origin: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

fn display_text<P: Page>(page: &P, card: &P::Node, chain: &[Selector], fallback: &str) -> String {
    page.select_first_of(card, chain)
        .map(|node| collapse_whitespace(&page.text(&node)))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn listing_link<P: Page>(page: &P, card: &P::Node, id: &ListingId, origin: &str) -> String {
    page.select_all(card, LINKS)
        .iter()
        .filter_map(|anchor| page.attribute(anchor, "href"))
        .find(|href| resolve_url(href).as_ref() == Some(id))
        .map(|href| absolutize(&href, origin))
        .unwrap_or_else(|| format!("{origin}/homedetails/{id}_zpid/"))
}

/// Builds one record per visible listing, in document order. A listing
/// matched by two nested card shapes appears once.
pub fn collect<P: Page>(
    page: &P,
    scope: &P::Node,
    mirror: &NoteMirror,
    config: &Config,
) -> Vec<ExportRecord> {
    let origin = config.origin();
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for card in page.select_all(scope, CARD_PATTERNS) {
        let Some(id) = resolve_card(page, &card) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        records.push(ExportRecord {
            address: display_text(page, &card, ADDRESS, "Address N/A"),
            price: display_text(page, &card, PRICE, "Price N/A"),
            link: listing_link(page, &card, &id, origin),
            note: mirror.displayable(&id).map(str::to_string),
            id,
        });
    }
    records
}

pub fn render(records: &[ExportRecord]) -> String {
    if records.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }
    let separator = format!("\n{DIVIDER}\n");
    records
        .iter()
        .map(ExportRecord::render)
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

pub fn export_text<P: Page>(page: &P, mirror: &NoteMirror, config: &Config) -> String {
    let records = collect(page, &page.root(), mirror, config);
    tracing::info!(records = records.len(), "export built");
    render(&records)
}
