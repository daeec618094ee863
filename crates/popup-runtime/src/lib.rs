#![forbid(unsafe_code)]

//! Trigger and dismissal runtime for popup block dialogs.
//!
//! The runtime discovers popup dialogs on a page, decides when each opens
//! (click, exit intent or page load, gated by an expiry window), and routes
//! every dismissal path (backdrop, Escape, close links, form submission)
//! through one close notification.
//!
//! It is host-driven and deterministic: a backend feeds
//! [`PageEvent`](popup_core::PageEvent)s into
//! [`PopupRuntime::handle_event`] and applies the returned
//! [`EventOutcome`]. Timers and document listeners are requested through
//! the [`Host`](popup_core::Host) trait.
//!
//! # Example
//!
//! ```ignore
//! let mut runtime = PopupRuntime::new(RuntimeSettings::default());
//! runtime.start(&mut host);
//!
//! // later, from the backend's click listener
//! let outcome = runtime.handle_event(&mut host, &PageEvent::Click { target });
//! if outcome.default_prevented {
//!     event.prevent_default();
//! }
//! ```

pub mod bootstrap;
pub mod controller;
pub mod modal_lock;
pub mod registry;
pub mod settings;
pub mod trigger;

pub use bootstrap::{BootstrapReport, EventOutcome, Lifecycle, PopupRuntime, StartOutcome};
pub use controller::{PopupController, PopupState, resolve_anchor_position};
pub use modal_lock::ModalLock;
pub use registry::{ClickAction, PopupRegistry, SkippedBinding, TriggerBinding};
pub use settings::{RuntimeSettings, SettingsError};
pub use trigger::{
    ExitIntentSlot, SuppressReason, TriggerDecision, TriggerEvaluator, is_exit_intent,
};
