//! Arena-backed document used by the tests.

use std::cell::{Cell, RefCell};

use crate::error::Result;
use crate::page::Page;
use crate::selector::{group_matches, ElementView, Selector};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    value: String,
    style: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl ElementView for NodeData {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct MemoryPage {
    nodes: RefCell<Vec<NodeData>>,
    location: RefCell<String>,
    focused: Cell<Option<NodeId>>,
}

const ROOT: NodeId = NodeId(0);
const HEAD: NodeId = NodeId(1);
const BODY: NodeId = NodeId(2);

impl MemoryPage {
    pub fn new(location: &str) -> Self {
        let page = Self {
            nodes: RefCell::new(vec![NodeData {
                tag: "html".to_string(),
                ..NodeData::default()
            }]),
            location: RefCell::new(location.to_string()),
            focused: Cell::new(None),
        };
        page.add(ROOT, "head", &[]);
        page.add(ROOT, "body", &[]);
        page
    }

    pub fn head(&self) -> NodeId {
        HEAD
    }

    pub fn body_id(&self) -> NodeId {
        BODY
    }

    pub fn set_location(&self, location: &str) {
        *self.location.borrow_mut() = location.to_string();
    }

    /// Appends a new element with attributes under `parent`.
    pub fn add(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(NodeData {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            parent: Some(parent),
            ..NodeData::default()
        });
        nodes[parent.0].children.push(id);
        id
    }

    pub fn add_text(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
        let id = self.add(parent, tag, attrs);
        self.nodes.borrow_mut()[id.0].text = text.to_string();
        id
    }

    pub fn focus(&self, node: NodeId) {
        self.focused.set(Some(node));
    }

    pub fn blur(&self) {
        self.focused.set(None);
    }

    /// Attached elements matching `group`, anywhere in the document.
    pub fn count(&self, group: &[Selector]) -> usize {
        self.select_all(&ROOT, group).len()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.nodes.borrow()[node.0]
            .style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.clone())
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node;
        while let Some(parent) = nodes[current.0].parent {
            current = parent;
        }
        current == ROOT
    }

    fn walk(&self, scope: NodeId, out: &mut Vec<NodeId>) {
        let children = self.nodes.borrow()[scope.0].children.clone();
        for child in children {
            out.push(child);
            self.walk(child, out);
        }
    }

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|child| *child != node);
        }
    }
}

impl Page for MemoryPage {
    type Node = NodeId;

    fn location(&self) -> String {
        self.location.borrow().clone()
    }

    fn root(&self) -> NodeId {
        ROOT
    }

    fn body(&self) -> Option<NodeId> {
        Some(BODY)
    }

    fn select_all(&self, scope: &NodeId, group: &[Selector]) -> Vec<NodeId> {
        let mut descendants = Vec::new();
        self.walk(*scope, &mut descendants);
        let nodes = self.nodes.borrow();
        descendants
            .into_iter()
            .filter(|id| group_matches(group, &nodes[id.0]))
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut all = Vec::new();
        self.walk(ROOT, &mut all);
        let nodes = self.nodes.borrow();
        all.into_iter().find(|node| nodes[node.0].attr("id") == Some(id))
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0].attr(name).map(str::to_string)
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        let mut nodes = self.nodes.borrow_mut();
        let attrs = &mut nodes[node.0].attrs;
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn text(&self, node: &NodeId) -> String {
        let mut out = self.nodes.borrow()[node.0].text.clone();
        let mut descendants = Vec::new();
        self.walk(*node, &mut descendants);
        let nodes = self.nodes.borrow();
        for id in descendants {
            out.push_str(&nodes[id.0].text);
        }
        out
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let children = std::mem::take(&mut self.nodes.borrow_mut()[node.0].children);
        let mut nodes = self.nodes.borrow_mut();
        for child in children {
            nodes[child.0].parent = None;
        }
        nodes[node.0].text = text.to_string();
    }

    fn set_class(&self, node: &NodeId, class: &str, enabled: bool) {
        let current = self.attribute(node, "class").unwrap_or_default();
        let mut classes: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        if enabled {
            classes.push(class);
        }
        let _ = self.set_attribute(node, "class", &classes.join(" "));
    }

    fn create(&self, tag: &str) -> Result<NodeId> {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(NodeData {
            tag: tag.to_string(),
            ..NodeData::default()
        });
        Ok(id)
    }

    fn append(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        self.detach(*child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(*parent);
        nodes[parent.0].children.push(*child);
        Ok(())
    }

    fn prepend(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        self.detach(*child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(*parent);
        nodes[parent.0].children.insert(0, *child);
        Ok(())
    }

    fn remove(&self, node: &NodeId) {
        self.detach(*node);
        if self.focused.get() == Some(*node) {
            self.focused.set(None);
        }
    }

    fn is_statically_positioned(&self, node: &NodeId) -> bool {
        self.style(*node, "position")
            .map_or(true, |position| position == "static")
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) -> Result<()> {
        let mut nodes = self.nodes.borrow_mut();
        let style = &mut nodes[node.0].style;
        match style.iter_mut().find(|(key, _)| key == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => style.push((property.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn value(&self, node: &NodeId) -> String {
        self.nodes.borrow()[node.0].value.clone()
    }

    fn set_value(&self, node: &NodeId, value: &str) {
        self.nodes.borrow_mut()[node.0].value = value.to_string();
    }

    fn has_focus(&self, node: &NodeId) -> bool {
        self.focused.get() == Some(*node) && self.is_attached(*node)
    }
}
