//! Listing identifier resolution.
//!
//! Every source is tried through an ordered chain of cheap extractors. A step
//! that finds nothing hands over to the next one; running out of steps means
//! "unresolved", which callers treat as "skip this element".

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::page::Page;
use crate::selector::{AttrOp, Selector};

/// Opaque token naming one listing. Compared by exact string equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Accepts only a non-empty run of ASCII digits.
    pub fn from_digits(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (!raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named step of a fallback chain.
pub struct Strategy<C: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&C) -> Option<T>,
}

/// Runs `strategies` in order and returns the first success.
pub fn first_match<C: ?Sized, T>(strategies: &[Strategy<C, T>], ctx: &C) -> Option<T> {
    strategies.iter().find_map(|strategy| {
        let found = (strategy.run)(ctx);
        if found.is_some() {
            tracing::trace!(strategy = strategy.name, "identifier resolved");
        }
        found
    })
}

pub const DETAIL_MARKER: &str = "/homedetails/";

const CANONICAL_LINK: Selector = Selector::tag("link").with_attr("rel", AttrOp::Equals("canonical"));
const FORM_CONTROL: Selector = Selector::tag("input").with_attr("name", AttrOp::Exists);
const LISTING_ANCHOR: Selector = Selector::tag("a").with_attr("href", AttrOp::Contains("_zpid"));
const QUERY_ANCHOR: Selector = Selector::tag("a").with_attr("href", AttrOp::Contains("zpid="));
const ID_ATTRIBUTE: &str = "data-zpid";

fn path_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|/)(\d+)_zpid(?:[/?#]|$)").unwrap())
}

fn query_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]zpid=(\d+)(?:[&#]|$)").unwrap())
}

fn numeric_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)$").unwrap())
}

fn capture_id(re: &Regex, haystack: &str) -> Option<ListingId> {
    re.captures(haystack)
        .and_then(|cap| cap.get(1))
        .and_then(|m| ListingId::from_digits(m.as_str()))
}

pub fn from_path_marker(url: &str) -> Option<ListingId> {
    capture_id(path_marker_re(), url)
}

pub fn from_query_param(url: &str) -> Option<ListingId> {
    capture_id(query_param_re(), url)
}

/// Resolves a bare URL: the path marker first, then the query parameter.
pub fn resolve_url(url: &str) -> Option<ListingId> {
    const STRATEGIES: &[Strategy<str, ListingId>] = &[
        Strategy {
            name: "path-marker",
            run: from_path_marker,
        },
        Strategy {
            name: "query-param",
            run: from_query_param,
        },
    ];
    first_match(STRATEGIES, url)
}

pub fn is_detail_location(url: &str) -> bool {
    url.contains(DETAIL_MARKER)
}

/// Resolves the current page: its URL, then the canonical link in metadata.
pub fn resolve_page<P: Page>(page: &P) -> Option<ListingId> {
    fn from_location<P: Page>(page: &P) -> Option<ListingId> {
        resolve_url(&page.location())
    }
    fn from_canonical<P: Page>(page: &P) -> Option<ListingId> {
        let link = page.select(&page.root(), &[CANONICAL_LINK])?;
        from_path_marker(&page.attribute(&link, "href")?)
    }

    let strategies: [Strategy<P, ListingId>; 2] = [
        Strategy {
            name: "location",
            run: from_location::<P>,
        },
        Strategy {
            name: "canonical-link",
            run: from_canonical::<P>,
        },
    ];
    first_match(&strategies, page)
}

/// A card under inspection.
pub struct CardRef<'a, P: Page> {
    pub page: &'a P,
    pub card: &'a P::Node,
}

fn card_form_control<P: Page>(ctx: &CardRef<'_, P>) -> Option<ListingId> {
    ctx.page
        .select_all(ctx.card, &[FORM_CONTROL])
        .iter()
        .find_map(|control| ListingId::from_digits(&ctx.page.attribute(control, "name")?))
}

fn card_anchor<P: Page>(ctx: &CardRef<'_, P>) -> Option<ListingId> {
    ctx.page
        .select_all(ctx.card, &[LISTING_ANCHOR, QUERY_ANCHOR])
        .iter()
        .find_map(|anchor| resolve_url(&ctx.page.attribute(anchor, "href")?))
}

fn card_attribute<P: Page>(ctx: &CardRef<'_, P>) -> Option<ListingId> {
    ListingId::from_digits(&ctx.page.attribute(ctx.card, ID_ATTRIBUTE)?)
}

fn card_id_suffix<P: Page>(ctx: &CardRef<'_, P>) -> Option<ListingId> {
    capture_id(numeric_suffix_re(), &ctx.page.attribute(ctx.card, "id")?)
}

/// Resolves a card node.
pub fn resolve_card<P: Page>(page: &P, card: &P::Node) -> Option<ListingId> {
    let strategies: [Strategy<CardRef<'_, P>, ListingId>; 4] = [
        Strategy {
            name: "form-control",
            run: card_form_control::<P>,
        },
        Strategy {
            name: "anchor",
            run: card_anchor::<P>,
        },
        Strategy {
            name: "id-attribute",
            run: card_attribute::<P>,
        },
        Strategy {
            name: "id-suffix",
            run: card_id_suffix::<P>,
        },
    ];
    first_match(&strategies, &CardRef { page, card })
}
