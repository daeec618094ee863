#![forbid(unsafe_code)]

//! DOM event names and selectors the backend listens with.
//!
//! Kept free of `web-sys` so the mapping is testable off-browser.

use std::time::Duration;

use popup_core::ListenerKind;

/// Elements that can act as triggers or close affordances.
pub const INTERACTIVE_SELECTOR: &str = "a, button, [data-popup-target]";

/// Id of the optional `<script type="application/json">` element holding
/// runtime settings.
pub const SETTINGS_ELEMENT_ID: &str = "hm-popup-settings";

/// Events delegated at the document for the whole page view.
///
/// All are registered in the capture phase: `cancel` and `close` do not
/// bubble, and capturing also sees clicks whose propagation page script
/// stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delegated {
    Click,
    KeyDown,
    Submit,
    Cancel,
    Close,
}

impl Delegated {
    pub const ALL: [Self; 5] = [
        Self::Click,
        Self::KeyDown,
        Self::Submit,
        Self::Cancel,
        Self::Close,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::Close => "close",
        }
    }
}

/// DOM event behind a toggled listener.
#[must_use]
pub const fn listener_event(kind: ListenerKind) -> &'static str {
    match kind {
        ListenerKind::PointerOut => "mouseout",
        ListenerKind::DomContentLoaded => "DOMContentLoaded",
    }
}

/// `setTimeout` delay argument, clamped to what the browser accepts.
#[must_use]
pub fn timeout_ms(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}
