#![forbid(unsafe_code)]

//! A scripted page view: simulated host plus runtime.
//!
//! [`SimHost`] implements [`Host`] over a [`Dom`], a [`MemoryStore`] and a
//! [`ManualClock`]. Timers are queued and only fire when the test advances
//! time; listeners are tracked so tests can see exactly what the runtime
//! installed. [`SimPage`] wires a host to a [`PopupRuntime`] and plays the
//! browser's part for user gestures: native Escape handling, link
//! navigation when a click is not prevented, and delivery of queued dialog
//! close notifications.

use std::collections::BTreeMap;
use std::time::Duration;

use popup_core::{
    ClosedBy, Clock, Document, ExpiryStore, Host, Key, KeyValueStore, ListenerKind, ManualClock, MemoryStore,
    NodeId, PageEvent, PointerOut, ReadyState, Rect, TimerId,
};
use popup_runtime::{EventOutcome, PopupRuntime, PopupState, RuntimeSettings, StartOutcome};
use tracing::trace;

use crate::dom::Dom;

/// Wall-clock start for simulated pages (2023-11-14T22:13:20Z).
pub const DEFAULT_NOW_MS: u64 = 1_700_000_000_000;

/// Simulated browser environment.
#[derive(Debug)]
pub struct SimHost {
    pub dom: Dom,
    pub store: MemoryStore,
    pub clock: ManualClock,
    timers: Vec<(u64, TimerId)>,
    listeners: BTreeMap<ListenerKind, usize>,
    peak_listeners: BTreeMap<ListenerKind, usize>,
    listener_log: Vec<(ListenerKind, bool)>,
}

impl SimHost {
    #[must_use]
    pub fn new(dom: Dom, store: MemoryStore, clock: ManualClock) -> Self {
        Self {
            dom,
            store,
            clock,
            timers: Vec::new(),
            listeners: BTreeMap::new(),
            peak_listeners: BTreeMap::new(),
            listener_log: Vec::new(),
        }
    }

    /// Installed listeners of `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: ListenerKind) -> usize {
        self.listeners.get(&kind).copied().unwrap_or(0)
    }

    /// Most listeners of `kind` ever installed at the same time.
    #[must_use]
    pub fn peak_listener_count(&self, kind: ListenerKind) -> usize {
        self.peak_listeners.get(&kind).copied().unwrap_or(0)
    }

    /// Every install (`true`) and removal (`false`), in order.
    #[must_use]
    pub fn listener_log(&self) -> &[(ListenerKind, bool)] {
        &self.listener_log
    }

    /// Scheduled timers as `(due_ms, id)`, earliest first.
    #[must_use]
    pub fn pending_timers(&self) -> Vec<(u64, TimerId)> {
        let mut timers = self.timers.clone();
        timers.sort_unstable();
        timers
    }

    fn take_due_timer(&mut self, until_ms: u64) -> Option<(u64, TimerId)> {
        let (position, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (due, _))| *due <= until_ms)
            .min_by_key(|(_, entry)| **entry)?;
        Some(self.timers.remove(position))
    }
}

impl Document for SimHost {
    fn ready_state(&self) -> ReadyState {
        self.dom.ready_state()
    }

    fn root(&self) -> NodeId {
        self.dom.root()
    }

    fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.dom.elements_with_class(class)
    }

    fn interactive_elements(&self) -> Vec<NodeId> {
        self.dom.interactive_elements()
    }

    fn forms_within(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.forms_within(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attribute(node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.dom.set_attribute(node, name, value);
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.dom.remove_attribute(node, name);
    }

    fn class_tokens(&self, node: NodeId) -> Vec<String> {
        self.dom.class_tokens(node)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        self.dom.add_class(node, class);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        self.dom.remove_class(node, class);
    }

    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
        self.dom.set_style_property(node, name, value);
    }

    fn remove_style_property(&mut self, node: NodeId, name: &str) {
        self.dom.remove_style_property(node, name);
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.dom.bounding_rect(node)
    }

    fn viewport_height(&self) -> Option<f64> {
        self.dom.viewport_height()
    }

    fn is_dialog_open(&self, node: NodeId) -> bool {
        self.dom.is_dialog_open(node)
    }

    fn show_modal(&mut self, node: NodeId) {
        self.dom.show_modal(node);
    }

    fn close_dialog(&mut self, node: NodeId) {
        self.dom.close_dialog(node);
    }
}

impl Host for SimHost {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn storage(&mut self) -> &mut dyn KeyValueStore {
        &mut self.store
    }

    fn set_timeout(&mut self, delay: Duration, timer: TimerId) {
        let due = self
            .clock
            .now_ms()
            .saturating_add(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self.timers.push((due, timer));
    }

    fn set_listener(&mut self, kind: ListenerKind, enabled: bool) {
        self.listener_log.push((kind, enabled));
        let count = self.listeners.entry(kind).or_insert(0);
        if enabled {
            *count += 1;
        } else {
            *count = count.saturating_sub(1);
        }
        let current = *count;
        let peak = self.peak_listeners.entry(kind).or_insert(0);
        *peak = (*peak).max(current);
    }
}

/// One page view: fixture, host and runtime.
#[derive(Debug)]
pub struct SimPage {
    pub host: SimHost,
    pub runtime: PopupRuntime,
    fixture: Dom,
    settings: RuntimeSettings,
    navigations: Vec<String>,
    submissions: Vec<NodeId>,
}

impl SimPage {
    /// A page over `dom` with empty storage and the clock at
    /// [`DEFAULT_NOW_MS`].
    #[must_use]
    pub fn new(dom: Dom) -> Self {
        Self::with_parts(
            dom,
            RuntimeSettings::default(),
            MemoryStore::new(),
            ManualClock::new(DEFAULT_NOW_MS),
        )
    }

    #[must_use]
    pub fn with_parts(
        dom: Dom,
        settings: RuntimeSettings,
        store: MemoryStore,
        clock: ManualClock,
    ) -> Self {
        Self {
            host: SimHost::new(dom.clone(), store, clock),
            runtime: PopupRuntime::new(settings.clone()),
            fixture: dom,
            settings,
            navigations: Vec::new(),
            submissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_settings(self, settings: RuntimeSettings) -> Self {
        Self::with_parts(self.fixture, settings, self.host.store, self.host.clock)
    }

    #[must_use]
    pub fn with_store(self, store: MemoryStore) -> Self {
        Self::with_parts(self.fixture, self.settings, store, self.host.clock)
    }

    /// Start the runtime, as the page's script entry point would.
    pub fn boot(&mut self) -> StartOutcome {
        let outcome = self.runtime.start(&mut self.host);
        self.flush();
        outcome
    }

    /// A fresh page view of the same markup sharing storage and clock.
    #[must_use]
    pub fn reload(&self) -> Self {
        Self::with_parts(
            self.fixture.clone(),
            self.settings.clone(),
            self.host.store.clone(),
            self.host.clock.clone(),
        )
    }

    /// Finish parsing: flip the ready state and fire `DOMContentLoaded`
    /// if anyone listens for it.
    pub fn finish_loading(&mut self) -> EventOutcome {
        self.host.dom.set_ready_state(ReadyState::Interactive);
        if self.host.listener_count(ListenerKind::DomContentLoaded) == 0 {
            return EventOutcome::default();
        }
        self.dispatch(&PageEvent::DomContentLoaded)
    }

    /// Deliver `event`, then any notifications it caused.
    pub fn dispatch(&mut self, event: &PageEvent) -> EventOutcome {
        let outcome = self.runtime.handle_event(&mut self.host, event);
        self.flush();
        outcome
    }

    /// Click `target`. An unprevented click on a link navigates.
    pub fn click(&mut self, target: NodeId) -> EventOutcome {
        let outcome = self.dispatch(&PageEvent::Click { target });
        if !outcome.default_prevented {
            if let Some(href) = self.link_href(target) {
                self.navigations.push(href);
            }
        }
        outcome
    }

    /// Press Escape with the topmost dialog focused.
    ///
    /// Mirrors the browser: the key event is delivered, then a dialog whose
    /// `closedby` permits close requests receives `cancel`, and closes
    /// unless that is prevented.
    pub fn press_escape(&mut self) -> EventOutcome {
        let outcome = self.dispatch(&PageEvent::KeyDown { key: Key::Escape });
        if outcome.default_prevented {
            return outcome;
        }
        let Some(dialog) = self.host.dom.top_dialog() else {
            return outcome;
        };
        let closed_by = self
            .host
            .attribute(dialog, "closedby")
            .and_then(|raw| raw.parse::<ClosedBy>().ok())
            .unwrap_or(ClosedBy::Any);
        if !closed_by.allows_escape() {
            return outcome;
        }
        let cancel = self.dispatch(&PageEvent::Cancel { dialog });
        if !cancel.default_prevented {
            self.host.close_dialog(dialog);
            self.flush();
        }
        cancel
    }

    /// Submit `form`. The submission always goes through.
    pub fn submit(&mut self, form: NodeId) -> EventOutcome {
        let outcome = self.dispatch(&PageEvent::Submit { form });
        self.submissions.push(form);
        outcome
    }

    /// Move the pointer out of the document. Delivered only while a
    /// pointer-out listener is installed.
    pub fn pointer_out(&mut self, signal: PointerOut) -> EventOutcome {
        if self.host.listener_count(ListenerKind::PointerOut) == 0 {
            return EventOutcome::default();
        }
        self.dispatch(&PageEvent::PointerOut(signal))
    }

    /// Leave the window through the top edge at `client_y`.
    pub fn leave_top(&mut self, client_y: f64) -> EventOutcome {
        self.pointer_out(PointerOut::leaving_window(client_y))
    }

    /// Advance the clock by `delta`, firing due timers in order.
    pub fn advance(&mut self, delta: Duration) {
        let target = self
            .host
            .clock
            .now_ms()
            .saturating_add(u64::try_from(delta.as_millis()).unwrap_or(u64::MAX));
        while let Some((due, timer)) = self.host.take_due_timer(target) {
            self.host.clock.set(due.max(self.host.clock.now_ms()));
            trace!(timer = ?timer, due_ms = due, "simulated timer fired");
            self.dispatch(&PageEvent::Timer(timer));
        }
        self.host.clock.set(target);
    }

    /// Open popup `id` through the runtime's programmatic API.
    pub fn open(&mut self, id: &str) -> bool {
        let opened = self.runtime.open(&mut self.host, id);
        self.flush();
        opened
    }

    /// Close popup `id` through the runtime's programmatic API.
    pub fn close(&mut self, id: &str) -> bool {
        let closed = self.runtime.close(&mut self.host, id);
        self.flush();
        closed
    }

    /// Close a dialog the way page script would (`dialog.close()`).
    pub fn close_natively(&mut self, dialog: NodeId) {
        self.host.close_dialog(dialog);
        self.flush();
    }

    // --- Queries ---

    /// Element with `id`, panicking if the fixture has none.
    #[must_use]
    pub fn node(&self, id: &str) -> NodeId {
        match self.host.dom.by_id(id) {
            Some(node) => node,
            None => panic!("no element with id {id:?}"),
        }
    }

    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.runtime.state(&self.host, id) == Some(PopupState::Open)
    }

    /// Number of registered popups currently open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.runtime
            .registry()
            .controllers()
            .filter(|c| self.host.is_dialog_open(c.node()))
            .count()
    }

    /// Whether the page-level modal marker is on the root element.
    #[must_use]
    pub fn has_modal_marker(&self) -> bool {
        self.host
            .has_class(self.host.root(), &self.settings.modal_open_class)
    }

    #[must_use]
    pub fn stored(&self, key: &str) -> Option<String> {
        self.host.store.get_item(key).ok().flatten()
    }

    /// Drop the expiry record under `key`, as a visitor clearing site data
    /// would.
    pub fn clear_record(&mut self, key: &str) {
        ExpiryStore::new(&mut self.host.store).clear(key);
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.host.clock.now_ms()
    }

    /// Links followed because the runtime left the click alone.
    #[must_use]
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    #[must_use]
    pub fn submissions(&self) -> &[NodeId] {
        &self.submissions
    }

    fn flush(&mut self) {
        while let Some(event) = self.host.dom.take_pending() {
            trace!(?event, "delivering native notification");
            self.runtime.handle_event(&mut self.host, &event);
        }
    }

    fn link_href(&self, target: NodeId) -> Option<String> {
        let mut cursor = Some(target);
        while let Some(current) = cursor {
            if self.host.dom.tag(current) == Some("a") {
                return self.host.attribute(current, "href");
            }
            cursor = self.host.parent(current);
        }
        None
    }
}
