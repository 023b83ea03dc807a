//! [`Page`] over the live DOM.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement, Window};

use super::describe;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::selector::{group_to_css, Selector};

pub struct WebPage {
    window: Window,
    document: Document,
    root: Element,
}

impl WebPage {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Page("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| Error::Page("no document".to_string()))?;
        let root = document
            .document_element()
            .ok_or_else(|| Error::Page("no document element".to_string()))?;
        Ok(Self { window, document, root })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

fn page_error(err: wasm_bindgen::JsValue) -> Error {
    Error::Page(describe(&err))
}

impl Page for WebPage {
    type Node = Element;

    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn root(&self) -> Element {
        self.root.clone()
    }

    fn body(&self) -> Option<Element> {
        self.document.body().map(Element::from)
    }

    fn select_all(&self, scope: &Element, group: &[Selector]) -> Vec<Element> {
        let Ok(list) = scope.query_selector_all(&group_to_css(group)) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn select(&self, scope: &Element, group: &[Selector]) -> Option<Element> {
        scope.query_selector(&group_to_css(group)).ok().flatten()
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<()> {
        node.set_attribute(name, value).map_err(page_error)
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn set_class(&self, node: &Element, class: &str, enabled: bool) {
        let _ = node.class_list().toggle_with_force(class, enabled);
    }

    fn create(&self, tag: &str) -> Result<Element> {
        self.document.create_element(tag).map_err(page_error)
    }

    fn append(&self, parent: &Element, child: &Element) -> Result<()> {
        parent.append_child(child).map(|_| ()).map_err(page_error)
    }

    fn prepend(&self, parent: &Element, child: &Element) -> Result<()> {
        parent.prepend_with_node_1(child).map_err(page_error)
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn is_statically_positioned(&self, node: &Element) -> bool {
        self.window
            .get_computed_style(node)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("position").ok())
            .map_or(true, |position| position.is_empty() || position == "static")
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) -> Result<()> {
        let Some(element) = node.dyn_ref::<HtmlElement>() else {
            return Ok(());
        };
        element.style().set_property(property, value).map_err(page_error)
    }

    fn value(&self, node: &Element) -> String {
        if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else {
            String::new()
        }
    }

    fn set_value(&self, node: &Element, value: &str) {
        if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        } else if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn has_focus(&self, node: &Element) -> bool {
        self.document.active_element().as_ref() == Some(node)
    }
}
