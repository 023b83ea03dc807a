//! The document-tree seam.
//!
//! Everything the engine reads from or writes into the host page goes through
//! [`Page`]. Reads are infallible and return "nothing" when the structure is
//! absent; writes that can throw on the web report an [`Error`](crate::Error).

use crate::error::Result;
use crate::selector::Selector;

#[cfg(test)]
pub(crate) mod memory;

pub trait Page {
    type Node: Clone + PartialEq + std::fmt::Debug;

    /// Current page address.
    fn location(&self) -> String;

    /// The document element; every scan starts here unless scoped.
    fn root(&self) -> Self::Node;

    fn body(&self) -> Option<Self::Node>;

    /// Descendants of `scope` matching any selector of `group`, in document order.
    fn select_all(&self, scope: &Self::Node, group: &[Selector]) -> Vec<Self::Node>;

    fn select(&self, scope: &Self::Node, group: &[Selector]) -> Option<Self::Node> {
        self.select_all(scope, group).into_iter().next()
    }

    /// First hit of an ordered fallback chain: each selector is tried on its
    /// own, earlier selectors win regardless of document order.
    fn select_first_of(&self, scope: &Self::Node, chain: &[Selector]) -> Option<Self::Node> {
        chain
            .iter()
            .find_map(|selector| self.select(scope, std::slice::from_ref(selector)))
    }

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Text content of the node and its descendants.
    fn text(&self, node: &Self::Node) -> String;

    fn set_text(&self, node: &Self::Node, text: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    fn set_class(&self, node: &Self::Node, class: &str, enabled: bool);

    fn create(&self, tag: &str) -> Result<Self::Node>;

    fn append(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    fn prepend(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    fn remove(&self, node: &Self::Node);

    /// Whether the computed `position` is `static`.
    fn is_statically_positioned(&self, node: &Self::Node) -> bool;

    fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<()>;

    /// Value of a form control; empty for anything else.
    fn value(&self, node: &Self::Node) -> String;

    fn set_value(&self, node: &Self::Node, value: &str);

    fn has_focus(&self, node: &Self::Node) -> bool;

    // Injection itself mutates the tree and wakes the mutation observer, so
    // repeated passes must only write what actually differs.

    fn update_text(&self, node: &Self::Node, text: &str) {
        if self.text(node) != text {
            self.set_text(node, text);
        }
    }

    fn update_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()> {
        if self.attribute(node, name).as_deref() == Some(value) {
            return Ok(());
        }
        self.set_attribute(node, name, value)
    }

    fn update_class(&self, node: &Self::Node, class: &str, enabled: bool) {
        if self.has_class(node, class) != enabled {
            self.set_class(node, class, enabled);
        }
    }

    fn update_value(&self, node: &Self::Node, value: &str) {
        if self.value(node) != value {
            self.set_value(node, value);
        }
    }
}

/// Creates an element carrying the given class, and optionally an id.
pub(crate) fn create_with_class<P: Page>(
    page: &P,
    tag: &str,
    class: &str,
    id: Option<&str>,
) -> Result<P::Node> {
    let node = page.create(tag)?;
    page.set_attribute(&node, "class", class)?;
    if let Some(id) = id {
        page.set_attribute(&node, "id", id)?;
    }
    Ok(node)
}
