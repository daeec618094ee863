//! [`Host`] over the live DOM.
//!
//! Elements are addressed by [`NodeId`]s handed out on first sight and
//! remembered in a `WeakMap`, so the same element always maps to the same
//! id. Timers and toggled listeners call back into the shared [`App`]
//! through a weak handle.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Weak;
use std::time::Duration;

use js_sys::{Function, Object, Reflect, WeakMap};
use popup_core::{
    Clock, Document, Host, Key, KeyValueStore, ListenerKind, NodeId, PageEvent, PointerOut,
    ReadyState, Rect, SystemClock, TimerId,
};
use tracing::{trace, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, HtmlDialogElement, HtmlElement, KeyboardEvent, MouseEvent, Window};

use crate::app::{App, deliver};
use crate::events::{self, INTERACTIVE_SELECTOR};
use crate::store::LocalStore;

pub(crate) type Listener = Closure<dyn FnMut(Event)>;

// ---------------------------------------------------------------------------
// Element identity
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct NodeTable {
    elements: RefCell<Vec<Element>>,
    ids: WeakMap,
}

impl NodeTable {
    fn new() -> Self {
        Self {
            elements: RefCell::new(Vec::new()),
            ids: WeakMap::new(),
        }
    }

    fn id_of(&self, element: &Element) -> NodeId {
        let key: &Object = element.as_ref();
        if let Some(raw) = self.ids.get(key).as_f64() {
            return NodeId::new(raw as u32);
        }
        let mut elements = self.elements.borrow_mut();
        let id = NodeId::new(u32::try_from(elements.len()).unwrap_or(u32::MAX));
        self.ids.set(key, &JsValue::from(id.raw()));
        elements.push(element.clone());
        id
    }

    fn element(&self, node: NodeId) -> Option<Element> {
        self.elements.borrow().get(node.raw() as usize).cloned()
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The browser environment of one page view.
pub struct WebHost {
    window: Window,
    document: web_sys::Document,
    nodes: NodeTable,
    store: LocalStore,
    clock: SystemClock,
    app: Weak<RefCell<App>>,
    toggled: BTreeMap<ListenerKind, Listener>,
    /// Removed listeners. A listener can remove itself while running, so
    /// its closure must outlive the call.
    retired: Vec<Listener>,
}

impl WebHost {
    pub(crate) fn new(window: Window, document: web_sys::Document, app: Weak<RefCell<App>>) -> Self {
        let store = LocalStore::from_window(&window);
        Self {
            window,
            document,
            nodes: NodeTable::new(),
            store,
            clock: SystemClock,
            app,
            toggled: BTreeMap::new(),
            retired: Vec::new(),
        }
    }

    pub(crate) fn dom(&self) -> &web_sys::Document {
        &self.document
    }

    fn element(&self, node: NodeId) -> Option<Element> {
        self.nodes.element(node)
    }

    fn collect(&self, list: Option<web_sys::NodeList>) -> Vec<NodeId> {
        let Some(list) = list else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.nodes.id_of(&element))
            .collect()
    }

    fn target_node(&self, event: &Event) -> Option<NodeId> {
        let element = event.target()?.dyn_into::<Element>().ok()?;
        Some(self.nodes.id_of(&element))
    }

    fn as_node(&self, value: JsValue) -> Option<NodeId> {
        let element = value.dyn_into::<Element>().ok()?;
        Some(self.nodes.id_of(&element))
    }

    /// Translate a DOM event into the runtime's vocabulary.
    pub(crate) fn translate(&self, event: &Event) -> Option<PageEvent> {
        match event.type_().as_str() {
            "click" => Some(PageEvent::Click {
                target: self.target_node(event)?,
            }),
            "keydown" => {
                let key = event.dyn_ref::<KeyboardEvent>()?.key();
                Some(PageEvent::KeyDown {
                    key: Key::from_dom(&key),
                })
            }
            "submit" => Some(PageEvent::Submit {
                form: self.target_node(event)?,
            }),
            "cancel" => Some(PageEvent::Cancel {
                dialog: self.target_node(event)?,
            }),
            "close" => Some(PageEvent::DialogClosed {
                dialog: self.target_node(event)?,
            }),
            "mouseout" => {
                let mouse = event.dyn_ref::<MouseEvent>()?;
                let related_target = mouse
                    .related_target()
                    .and_then(|target| self.as_node(target.into()));
                let to_element = Reflect::get(mouse, &JsValue::from_str("toElement"))
                    .ok()
                    .and_then(|value| self.as_node(value));
                Some(PageEvent::PointerOut(PointerOut {
                    client_y: f64::from(mouse.client_y()),
                    related_target,
                    to_element,
                }))
            }
            "DOMContentLoaded" => Some(PageEvent::DomContentLoaded),
            other => {
                trace!(event = other, "untranslated event");
                None
            }
        }
    }

    /// A document listener that routes its events into the runtime.
    pub(crate) fn listener(&self) -> Listener {
        let app = self.app.clone();
        Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let outcome = deliver(&app, |host| host.translate(&event));
            if outcome.default_prevented {
                event.prevent_default();
            }
        })
    }
}

impl Document for WebHost {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_dom(&self.document.ready_state())
    }

    fn root(&self) -> NodeId {
        match self.document.document_element() {
            Some(root) => self.nodes.id_of(&root),
            None => NodeId::new(u32::MAX),
        }
    }

    fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        let collection = self.document.get_elements_by_class_name(class);
        (0..collection.length())
            .filter_map(|i| collection.item(i))
            .map(|element| self.nodes.id_of(&element))
            .collect()
    }

    fn interactive_elements(&self) -> Vec<NodeId> {
        self.collect(self.document.query_selector_all(INTERACTIVE_SELECTOR).ok())
    }

    fn forms_within(&self, node: NodeId) -> Vec<NodeId> {
        let Some(element) = self.element(node) else {
            return Vec::new();
        };
        self.collect(element.query_selector_all("form").ok())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.element(node)?.parent_element()?;
        Some(self.nodes.id_of(&parent))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.set_attribute(name, value) {
                warn!(node = %node, name, error = ?err, "set_attribute failed");
            }
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.remove_attribute(name) {
                warn!(node = %node, name, error = ?err, "remove_attribute failed");
            }
        }
    }

    fn class_tokens(&self, node: NodeId) -> Vec<String> {
        let Some(element) = self.element(node) else {
            return Vec::new();
        };
        let list = element.class_list();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.class_list().add_1(class) {
                warn!(node = %node, class, error = ?err, "add_class failed");
            }
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.class_list().remove_1(class) {
                warn!(node = %node, class, error = ?err, "remove_class failed");
            }
        }
    }

    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return;
        };
        if let Err(err) = html.style().set_property(name, value) {
            warn!(node = %node, name, error = ?err, "set_property failed");
        }
    }

    fn remove_style_property(&mut self, node: NodeId, name: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        if let Some(html) = element.dyn_ref::<HtmlElement>() {
            let _ = html.style().remove_property(name);
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        let rect = self.element(node)?.get_bounding_client_rect();
        Some(Rect::new(rect.x(), rect.y(), rect.width(), rect.height()))
    }

    fn viewport_height(&self) -> Option<f64> {
        self.window.inner_height().ok()?.as_f64()
    }

    fn is_dialog_open(&self, node: NodeId) -> bool {
        match self.element(node) {
            Some(element) => match element.dyn_ref::<HtmlDialogElement>() {
                Some(dialog) => dialog.open(),
                None => element.has_attribute("open"),
            },
            None => false,
        }
    }

    fn show_modal(&mut self, node: NodeId) {
        let Some(element) = self.element(node) else {
            return;
        };
        match element.dyn_ref::<HtmlDialogElement>() {
            Some(dialog) => {
                if let Err(err) = dialog.show_modal() {
                    warn!(node = %node, error = ?err, "showModal failed");
                }
            }
            None => warn!(node = %node, "popup element is not a <dialog>"),
        }
    }

    fn close_dialog(&mut self, node: NodeId) {
        if let Some(dialog) = self
            .element(node)
            .and_then(|element| element.dyn_into::<HtmlDialogElement>().ok())
        {
            dialog.close();
        }
    }
}

impl Host for WebHost {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn storage(&mut self) -> &mut dyn KeyValueStore {
        &mut self.store
    }

    fn set_timeout(&mut self, delay: Duration, timer: TimerId) {
        let app = self.app.clone();
        let callback = Closure::once_into_js(move || {
            deliver(&app, |_| Some(PageEvent::Timer(timer)));
        });
        let scheduled = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref::<Function>(),
                events::timeout_ms(delay),
            );
        if let Err(err) = scheduled {
            warn!(timer = timer.raw(), error = ?err, "setTimeout failed");
        }
    }

    fn set_listener(&mut self, kind: ListenerKind, enabled: bool) {
        let name = events::listener_event(kind);
        if enabled {
            if self.toggled.contains_key(&kind) {
                return;
            }
            let listener = self.listener();
            match self
                .document
                .add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                Ok(()) => {
                    trace!(event = name, "listener installed");
                    self.toggled.insert(kind, listener);
                }
                Err(err) => warn!(event = name, error = ?err, "addEventListener failed"),
            }
        } else if let Some(listener) = self.toggled.remove(&kind) {
            let _ = self
                .document
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
            trace!(event = name, "listener removed");
            self.retired.push(listener);
        }
    }
}
