#![forbid(unsafe_code)]

//! Core types for the popup block runtime.
//!
//! This crate holds everything the runtime needs that is independent of the
//! trigger/dismissal state machine itself:
//!
//! - [`config`]: the attribute wire contract rendered onto popup elements.
//! - [`event`]: host-agnostic page events and element handles.
//! - [`host`]: the [`Document`](host::Document) and [`Host`](host::Host)
//!   seams implemented by the browser backend and the test harness.
//! - [`storage`] / [`expiry`]: the best-effort key/value store and the
//!   expiry-window adapter layered on top of it.
//! - [`clock`]: wall-clock access.

pub mod clock;
pub mod config;
pub mod event;
pub mod expiry;
pub mod host;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AnchorConfig, AnchorPosition, ClosedBy, ElementSnapshot, PopupConfig, PopupId, TriggerMode,
};
pub use event::{Key, NodeId, PageEvent, PointerOut, ReadyState, Rect, TimerId};
pub use expiry::{ExpiryRecord, ExpiryStore, MS_PER_DAY};
pub use host::{Document, Host, ListenerKind};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
