//! The page-wide runtime instance and event delivery into it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use popup_core::PageEvent;
use popup_runtime::{EventOutcome, PopupRuntime, RuntimeSettings, StartOutcome};
use tracing::{debug, trace};
use wasm_bindgen::{JsCast, JsValue};

use crate::events::Delegated;
use crate::host::{Listener, WebHost};

/// Runtime, host and the document listeners that feed them.
pub struct App {
    pub host: WebHost,
    pub runtime: PopupRuntime,
    delegated: Vec<Listener>,
}

pub type SharedApp = Rc<RefCell<App>>;

/// Build the app, delegate document events to it and start the runtime.
pub fn install(settings: RuntimeSettings) -> Result<SharedApp, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let app = Rc::new_cyclic(|weak: &Weak<RefCell<App>>| {
        RefCell::new(App {
            host: WebHost::new(window, document, weak.clone()),
            runtime: PopupRuntime::new(settings),
            delegated: Vec::new(),
        })
    });

    {
        let mut guard = app.borrow_mut();
        let App {
            host,
            runtime,
            delegated,
        } = &mut *guard;

        for kind in Delegated::ALL {
            let listener = host.listener();
            host.dom().add_event_listener_with_callback_and_bool(
                kind.name(),
                listener.as_ref().unchecked_ref(),
                true,
            )?;
            delegated.push(listener);
        }

        match runtime.start(host) {
            StartOutcome::Started(report) => debug!(
                popups = report.popups,
                triggers = report.triggers,
                listeners = delegated.len(),
                "popup runtime started"
            ),
            StartOutcome::Deferred => debug!("popup runtime waiting for DOMContentLoaded"),
            StartOutcome::AlreadyRunning => {}
        }
    }

    Ok(app)
}

/// Run one event through the runtime.
///
/// `build` sees the host before the runtime does, to resolve elements into
/// node ids. Events arriving while the app is already borrowed (a
/// synchronous event fired from inside a handler) are dropped.
pub fn deliver(
    app: &Weak<RefCell<App>>,
    build: impl FnOnce(&WebHost) -> Option<PageEvent>,
) -> EventOutcome {
    let Some(app) = app.upgrade() else {
        return EventOutcome::default();
    };
    let Ok(mut guard) = app.try_borrow_mut() else {
        trace!("re-entrant event dropped");
        return EventOutcome::default();
    };
    let App { host, runtime, .. } = &mut *guard;
    match build(host) {
        Some(event) => runtime.handle_event(host, &event),
        None => EventOutcome::default(),
    }
}
