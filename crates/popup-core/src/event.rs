#![forbid(unsafe_code)]

//! Host-agnostic page events.
//!
//! Backends translate their native events (DOM events in the browser,
//! scripted actions in the harness) into [`PageEvent`]s and feed them to the
//! runtime's single dispatch entry point.

use std::fmt;

/// Opaque handle to an element owned by the host.
///
/// The runtime never holds live element references; every read or mutation
/// goes back through the host with a `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle for a host-scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Document parsing progress, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Parse the DOM string form. Unknown values are treated as `Complete`
    /// so bootstrap never waits on an event that will not arrive.
    #[must_use]
    pub fn from_dom(value: &str) -> Self {
        match value {
            "loading" => Self::Loading,
            "interactive" => Self::Interactive,
            _ => Self::Complete,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Viewport-relative element geometry, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Keyboard key, reduced to what the runtime cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(String),
}

impl Key {
    /// Map a `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Self::Escape,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// A pointer leaving an element, as seen by a document-level `mouseout`
/// listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerOut {
    /// Vertical pointer position relative to the viewport.
    pub client_y: f64,
    /// Element the pointer moved onto, if any.
    pub related_target: Option<NodeId>,
    /// Legacy `toElement`; absent on most engines.
    pub to_element: Option<NodeId>,
}

impl PointerOut {
    /// Pointer left the document entirely at `client_y`.
    #[must_use]
    pub const fn leaving_window(client_y: f64) -> Self {
        Self {
            client_y,
            related_target: None,
            to_element: None,
        }
    }
}

/// Everything the runtime reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The document finished parsing.
    DomContentLoaded,
    /// A click (or keyboard activation) on `target`.
    Click { target: NodeId },
    /// A key pressed anywhere in the document.
    KeyDown { key: Key },
    /// Document-level `mouseout`.
    PointerOut(PointerOut),
    /// A form was submitted.
    Submit { form: NodeId },
    /// A dialog is about to close because of a close request (Escape).
    Cancel { dialog: NodeId },
    /// A dialog finished closing, by any path.
    DialogClosed { dialog: NodeId },
    /// A timer scheduled through [`Host::set_timeout`](crate::host::Host::set_timeout) fired.
    Timer(TimerId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_parsing() {
        assert_eq!(ReadyState::from_dom("loading"), ReadyState::Loading);
        assert_eq!(ReadyState::from_dom("interactive"), ReadyState::Interactive);
        assert_eq!(ReadyState::from_dom("complete"), ReadyState::Complete);
        assert_eq!(ReadyState::from_dom("bogus"), ReadyState::Complete);
        assert!(ReadyState::Loading.is_loading());
        assert!(!ReadyState::Complete.is_loading());
    }

    #[test]
    fn key_mapping() {
        assert_eq!(Key::from_dom("Escape"), Key::Escape);
        assert_eq!(Key::from_dom("Esc"), Key::Escape);
        assert_eq!(Key::from_dom("a"), Key::Other("a".into()));
    }

    #[test]
    fn rect_center() {
        let rect = Rect::new(10.0, 100.0, 50.0, 20.0);
        assert_eq!(rect.center_y(), 110.0);
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "#7");
    }
}
