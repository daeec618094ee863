#![forbid(unsafe_code)]

//! In-memory element arena with native `<dialog>` behaviour.
//!
//! Just enough DOM to run the popup runtime: a tree of elements with
//! attributes, classes, inline styles and optional layout boxes. Dialog
//! elements track their `open` state; closing one queues a
//! [`PageEvent::DialogClosed`] the way a browser queues the `close` event.

use std::collections::{BTreeMap, VecDeque};

use popup_core::{Document, NodeId, PageEvent, ReadyState, Rect};

#[derive(Debug, Clone)]
struct SimElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    open: bool,
    rect: Option<Rect>,
}

impl SimElement {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            styles: BTreeMap::new(),
            parent,
            children: Vec::new(),
            open: false,
            rect: None,
        }
    }
}

/// A simulated document.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<SimElement>,
    root: NodeId,
    body: NodeId,
    ready_state: ReadyState,
    viewport_height: f64,
    /// Dialogs in the order they were shown; the last open one is topmost.
    open_order: Vec<NodeId>,
    pending: VecDeque<PageEvent>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// An empty `<html><body></body></html>` document, fully loaded.
    #[must_use]
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: vec![SimElement::new("html", None)],
            root: NodeId::new(0),
            body: NodeId::new(0),
            ready_state: ReadyState::Complete,
            viewport_height: 800.0,
            open_order: Vec::new(),
            pending: VecDeque::new(),
        };
        dom.body = dom.append(dom.root, "body").finish();
        dom
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    /// Append a `tag` element under `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> ElementBuilder<'_> {
        let node = NodeId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(SimElement::new(tag, Some(parent)));
        if let Some(parent) = self.element_mut(parent) {
            parent.children.push(node);
        }
        ElementBuilder { dom: self, node }
    }

    /// First element whose `id` attribute is `id`.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.preorder(self.root)
            .into_iter()
            .find(|&node| self.attribute(node, "id").as_deref() == Some(id))
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    #[must_use]
    pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|el| el.styles.get(name))
            .map(String::as_str)
    }

    /// Topmost open dialog.
    #[must_use]
    pub fn top_dialog(&self) -> Option<NodeId> {
        self.open_order.last().copied()
    }

    /// Events queued by native behaviour since the last call.
    pub fn take_pending(&mut self) -> Option<PageEvent> {
        self.pending.pop_front()
    }

    /// `node` and its descendants in document order.
    #[must_use]
    pub fn preorder(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(el) = self.element(current) else {
                continue;
            };
            out.push(current);
            stack.extend(el.children.iter().rev().copied());
        }
        out
    }

    fn element(&self, node: NodeId) -> Option<&SimElement> {
        self.nodes.get(node.raw() as usize)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut SimElement> {
        self.nodes.get_mut(node.raw() as usize)
    }
}

impl Document for Dom {
    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.preorder(self.root)
            .into_iter()
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    fn interactive_elements(&self) -> Vec<NodeId> {
        self.preorder(self.root)
            .into_iter()
            .filter(|&node| {
                self.element(node).is_some_and(|el| {
                    el.tag == "a"
                        || el.tag == "button"
                        || el.attributes.contains_key("data-popup-target")
                })
            })
            .collect()
    }

    fn forms_within(&self, node: NodeId) -> Vec<NodeId> {
        self.preorder(node)
            .into_iter()
            .filter(|&n| n != node && self.tag(n) == Some("form"))
            .collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|el| el.parent)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let el = self.element(node)?;
        if name == "class" {
            return (!el.classes.is_empty()).then(|| el.classes.join(" "));
        }
        el.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        if name == "class" {
            el.classes = value.split_whitespace().map(str::to_owned).collect();
        } else {
            el.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        if name == "class" {
            el.classes.clear();
        } else {
            el.attributes.remove(name);
        }
    }

    fn class_tokens(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(|el| el.classes.clone())
            .unwrap_or_default()
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_owned());
            }
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node) {
            el.classes.retain(|c| c != class);
        }
    }

    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.styles.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_style_property(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.styles.remove(name);
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.element(node).and_then(|el| el.rect)
    }

    fn viewport_height(&self) -> Option<f64> {
        Some(self.viewport_height)
    }

    fn is_dialog_open(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|el| el.open)
    }

    fn show_modal(&mut self, node: NodeId) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        if el.open {
            return;
        }
        el.open = true;
        el.attributes.insert("open".into(), String::new());
        self.open_order.push(node);
    }

    fn close_dialog(&mut self, node: NodeId) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        if !el.open {
            return;
        }
        el.open = false;
        el.attributes.remove("open");
        self.open_order.retain(|&n| n != node);
        self.pending.push_back(PageEvent::DialogClosed { dialog: node });
    }
}

/// Chained attribute setup for a freshly appended element.
pub struct ElementBuilder<'a> {
    dom: &'a mut Dom,
    node: NodeId,
}

impl ElementBuilder<'_> {
    #[must_use]
    pub fn attr(self, name: &str, value: &str) -> Self {
        self.dom.set_attribute(self.node, name, value);
        self
    }

    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.dom.add_class(self.node, class);
        self
    }

    /// Give the element a layout box.
    #[must_use]
    pub fn rect(self, rect: Rect) -> Self {
        if let Some(el) = self.dom.element_mut(self.node) {
            el.rect = Some(rect);
        }
        self
    }

    pub fn finish(self) -> NodeId {
        self.node
    }
}
