#![forbid(unsafe_code)]

//! Host seams.
//!
//! [`Document`] is the slice of the DOM the runtime touches; [`Host`] adds
//! the process-level services (clock, storage, timers, global listeners).
//! The browser backend implements both over `web-sys`; the test harness
//! implements them over an in-memory element arena.
//!
//! All element queries return handles in document order.

use std::time::Duration;

use crate::event::{NodeId, ReadyState, Rect, TimerId};
use crate::storage::KeyValueStore;

/// Document-level listeners the runtime toggles at run time.
///
/// Click, key, submit and dialog notifications are always delivered; only
/// these two are installed and removed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// `mouseout` on the document, used for exit-intent detection.
    PointerOut,
    /// `DOMContentLoaded`, used when bootstrap starts before parsing ends.
    DomContentLoaded,
}

/// Read/write access to the rendered document.
pub trait Document {
    fn ready_state(&self) -> ReadyState;

    /// The document root (`<html>`), which carries the page-level marker.
    fn root(&self) -> NodeId;

    /// All elements carrying `class`.
    fn elements_with_class(&self, class: &str) -> Vec<NodeId>;

    /// All links, buttons and `[data-popup-target]` elements.
    fn interactive_elements(&self) -> Vec<NodeId>;

    /// All `<form>` descendants of `node`.
    fn forms_within(&self, node: NodeId) -> Vec<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn class_tokens(&self, node: NodeId) -> Vec<String>;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);

    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_style_property(&mut self, node: NodeId, name: &str);

    /// Viewport-relative box of `node`, if laid out.
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;
    fn viewport_height(&self) -> Option<f64>;

    /// Whether the dialog element is currently shown.
    fn is_dialog_open(&self, node: NodeId) -> bool;
    /// Show the dialog modally (`showModal()`).
    fn show_modal(&mut self, node: NodeId);
    /// Close the dialog (`close()`). The host reports completion with a
    /// [`PageEvent::DialogClosed`](crate::event::PageEvent::DialogClosed).
    fn close_dialog(&mut self, node: NodeId);

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_tokens(node).iter().any(|token| token == class)
    }

    /// Whether `node` is `ancestor` or lies inside it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}

/// A document plus the services around it.
pub trait Host: Document {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    fn storage(&mut self) -> &mut dyn KeyValueStore;

    /// Schedule `timer` to be delivered as
    /// [`PageEvent::Timer`](crate::event::PageEvent::Timer) after `delay`.
    fn set_timeout(&mut self, delay: Duration, timer: TimerId);

    /// Install (`enabled = true`) or remove a document-level listener.
    fn set_listener(&mut self, kind: ListenerKind, enabled: bool);
}
