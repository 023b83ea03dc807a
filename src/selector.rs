//! Typed compound selectors.
//!
//! The host page is matched with a handful of structural patterns. Keeping
//! them typed lets the web page hand them to `querySelectorAll` while the
//! in-memory page used by tests evaluates the same patterns natively.

use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals(&'static str),
    Contains(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrTest {
    pub name: &'static str,
    pub op: AttrOp,
}

/// A compound selector: optional tag, optional class, optional attribute test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub class: Option<&'static str>,
    pub attr: Option<AttrTest>,
}

/// Read access an element needs to offer for native matching.
pub trait ElementView {
    fn tag_name(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl Selector {
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag: Some(tag),
            class: None,
            attr: None,
        }
    }

    pub const fn class(class: &'static str) -> Self {
        Self {
            tag: None,
            class: Some(class),
            attr: None,
        }
    }

    pub const fn attr(name: &'static str, op: AttrOp) -> Self {
        Self {
            tag: None,
            class: None,
            attr: Some(AttrTest { name, op }),
        }
    }

    pub const fn with_attr(self, name: &'static str, op: AttrOp) -> Self {
        Self {
            attr: Some(AttrTest { name, op }),
            ..self
        }
    }

    pub fn to_css(&self) -> String {
        let mut css = String::new();
        if let Some(tag) = self.tag {
            css.push_str(tag);
        }
        if let Some(class) = self.class {
            let _ = write!(css, ".{class}");
        }
        if let Some(AttrTest { name, op }) = self.attr {
            let _ = match op {
                AttrOp::Exists => write!(css, "[{name}]"),
                AttrOp::Equals(value) => write!(css, "[{name}=\"{value}\"]"),
                AttrOp::Contains(value) => write!(css, "[{name}*=\"{value}\"]"),
            };
        }
        if css.is_empty() {
            css.push('*');
        }
        css
    }

    pub fn matches(&self, element: &impl ElementView) -> bool {
        if let Some(tag) = self.tag {
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(class) = self.class {
            let has_class = element
                .attr("class")
                .is_some_and(|list| list.split_whitespace().any(|c| c == class));
            if !has_class {
                return false;
            }
        }
        if let Some(AttrTest { name, op }) = self.attr {
            let Some(value) = element.attr(name) else {
                return false;
            };
            return match op {
                AttrOp::Exists => true,
                AttrOp::Equals(expected) => value == expected,
                AttrOp::Contains(needle) => value.contains(needle),
            };
        }
        true
    }
}

/// Renders a union of selectors as a CSS selector list.
pub fn group_to_css(group: &[Selector]) -> String {
    group
        .iter()
        .map(Selector::to_css)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn group_matches(group: &[Selector], element: &impl ElementView) -> bool {
    group.iter().any(|selector| selector.matches(element))
}
