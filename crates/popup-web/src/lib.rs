//! Browser backend for the popup runtime.
//!
//! On `wasm32` this crate implements [`popup_core::Host`] over `web-sys` and
//! exports a small JavaScript API:
//!
//! ```js
//! import init, { boot, openPopup, closePopup } from "./popup_web.js";
//! await init();
//! boot();
//! ```
//!
//! `boot` delegates `click`, `keydown`, `submit`, `cancel` and `close` at
//! the document (capture phase) and starts the runtime, deferring to
//! `DOMContentLoaded` when the script runs during parsing. With the
//! `settings-json` feature, settings are read from
//! `<script type="application/json" id="hm-popup-settings">`.
//!
//! On other targets only the platform-neutral [`events`] table is built.

pub mod events;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod store;

#[cfg(target_arch = "wasm32")]
pub use host::WebHost;
#[cfg(target_arch = "wasm32")]
pub use store::LocalStore;

#[cfg(target_arch = "wasm32")]
pub use entry::{boot, close_popup, is_popup_open, open_popup};

#[cfg(target_arch = "wasm32")]
mod entry {
    use std::cell::RefCell;

    use popup_runtime::{PopupState, RuntimeSettings};
    use wasm_bindgen::prelude::*;

    use crate::app::{self, App, SharedApp};

    thread_local! {
        static APP: RefCell<Option<SharedApp>> = const { RefCell::new(None) };
    }

    /// Start the popup runtime for this page. Later calls do nothing.
    #[wasm_bindgen]
    pub fn boot() -> Result<(), JsValue> {
        if APP.with(|slot| slot.borrow().is_some()) {
            return Ok(());
        }
        let shared = app::install(load_settings())?;
        APP.with(|slot| *slot.borrow_mut() = Some(shared));
        Ok(())
    }

    /// Open popup `id`. Returns `false` if unknown or already open.
    #[wasm_bindgen(js_name = openPopup)]
    pub fn open_popup(id: &str) -> bool {
        with_app(|app| {
            let App { host, runtime, .. } = app;
            runtime.open(host, id)
        })
        .unwrap_or(false)
    }

    /// Close popup `id`. Returns `false` if unknown or already closed.
    #[wasm_bindgen(js_name = closePopup)]
    pub fn close_popup(id: &str) -> bool {
        with_app(|app| {
            let App { host, runtime, .. } = app;
            runtime.close(host, id)
        })
        .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = isPopupOpen)]
    pub fn is_popup_open(id: &str) -> bool {
        with_app(|app| app.runtime.state(&app.host, id) == Some(PopupState::Open)).unwrap_or(false)
    }

    fn with_app<T>(f: impl FnOnce(&mut App) -> T) -> Option<T> {
        let shared = APP.with(|slot| slot.borrow().clone())?;
        let mut app = shared.try_borrow_mut().ok()?;
        Some(f(&mut app))
    }

    #[cfg(feature = "settings-json")]
    fn load_settings() -> RuntimeSettings {
        let json = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(crate::events::SETTINGS_ELEMENT_ID))
            .and_then(|element| element.text_content());
        let Some(json) = json else {
            return RuntimeSettings::default();
        };
        match RuntimeSettings::from_json_str(&json) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring popup settings");
                RuntimeSettings::default()
            }
        }
    }

    #[cfg(not(feature = "settings-json"))]
    fn load_settings() -> RuntimeSettings {
        RuntimeSettings::default()
    }
}
