#![forbid(unsafe_code)]

//! Page-level orchestration.
//!
//! [`PopupRuntime`] runs bootstrap once per page view and then serves as the
//! single dispatch entry point for every [`PageEvent`].
//!
//! # Bootstrap order
//!
//! 1. Discover popup elements.
//! 2. Attach a controller to each (close permission, submit-dismiss forms)
//!    and evaluate its automatic trigger: `load` popups may open here, and
//!    the first eligible `exit` popup reserves the exit-intent slot.
//! 3. Bind click triggers.
//! 4. Bind close affordances.
//!
//! Steps 3 and 4 run only after every controller exists, so no binding can
//! reach a half-initialised popup.
//!
//! # Failure Modes
//!
//! Nothing here fails. Missing popups, unmatched triggers and unusable
//! storage all degrade to "do nothing" for the affected popup only.

use popup_core::{
    ExpiryStore, Host, Key, ListenerKind, NodeId, PageEvent, PointerOut, PopupId, TimerId,
};
use tracing::{debug, debug_span, trace};

use crate::controller::{PopupController, PopupState};
use crate::modal_lock::ModalLock;
use crate::registry::{ClickAction, PopupRegistry};
use crate::settings::RuntimeSettings;
use crate::trigger::{ExitIntentSlot, SuppressReason, TriggerDecision, TriggerEvaluator};

/// Where the runtime is in the page lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// `start` not called yet.
    Idle,
    /// Waiting for `DOMContentLoaded`.
    WaitingForReady,
    /// Bootstrap done; dispatching events.
    Running,
}

/// Result of [`PopupRuntime::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(BootstrapReport),
    /// Document still loading; bootstrap runs on `DomContentLoaded`.
    Deferred,
    AlreadyRunning,
}

/// What bootstrap found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub popups: usize,
    pub triggers: usize,
    pub closers: usize,
    /// Popups opened by their `load` trigger.
    pub opened: Vec<PopupId>,
    /// Popup holding the exit-intent slot.
    pub exit_reserved: Option<PopupId>,
    /// Automatic triggers that did not fire, and why.
    pub suppressed: Vec<(PopupId, SuppressReason)>,
}

/// How an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// The runtime acted on the event.
    pub handled: bool,
    /// The host must suppress the event's default action.
    pub default_prevented: bool,
}

impl EventOutcome {
    const IGNORED: Self = Self {
        handled: false,
        default_prevented: false,
    };

    const HANDLED: Self = Self {
        handled: true,
        default_prevented: false,
    };

    const PREVENTED: Self = Self {
        handled: true,
        default_prevented: true,
    };
}

/// The popup runtime for one page view.
#[derive(Debug)]
pub struct PopupRuntime {
    settings: RuntimeSettings,
    lifecycle: Lifecycle,
    registry: PopupRegistry,
    lock: ModalLock,
    exit_slot: ExitIntentSlot,
    next_timer: u64,
    report: Option<BootstrapReport>,
}

impl Default for PopupRuntime {
    fn default() -> Self {
        Self::new(RuntimeSettings::default())
    }
}

impl PopupRuntime {
    #[must_use]
    pub fn new(settings: RuntimeSettings) -> Self {
        let lock = ModalLock::new(settings.modal_open_class.clone());
        Self {
            settings,
            lifecycle: Lifecycle::Idle,
            registry: PopupRegistry::new(),
            lock,
            exit_slot: ExitIntentSlot::Vacant,
            next_timer: 1,
            report: None,
        }
    }

    /// Bootstrap now if the document is interactive, otherwise wait for
    /// `DomContentLoaded`.
    pub fn start<H: Host + ?Sized>(&mut self, host: &mut H) -> StartOutcome {
        match self.lifecycle {
            Lifecycle::Running => StartOutcome::AlreadyRunning,
            Lifecycle::WaitingForReady => StartOutcome::Deferred,
            Lifecycle::Idle if host.ready_state().is_loading() => {
                debug!("document loading; deferring popup bootstrap");
                self.lifecycle = Lifecycle::WaitingForReady;
                host.set_listener(ListenerKind::DomContentLoaded, true);
                StartOutcome::Deferred
            }
            Lifecycle::Idle => StartOutcome::Started(self.bootstrap(host)),
        }
    }

    /// Dispatch one page event.
    pub fn handle_event<H: Host + ?Sized>(&mut self, host: &mut H, event: &PageEvent) -> EventOutcome {
        if let PageEvent::DomContentLoaded = event {
            return self.on_ready(host);
        }
        if self.lifecycle != Lifecycle::Running {
            trace!(?event, "event before bootstrap ignored");
            return EventOutcome::IGNORED;
        }

        match event {
            PageEvent::DomContentLoaded => EventOutcome::IGNORED,
            PageEvent::Click { target } => self.on_click(host, *target),
            PageEvent::KeyDown { key } => self.on_key(key),
            PageEvent::PointerOut(signal) => self.on_pointer_out(host, signal),
            PageEvent::Submit { form } => self.on_submit(host, *form),
            PageEvent::Cancel { dialog } => self.on_cancel(*dialog),
            PageEvent::DialogClosed { dialog } => self.on_dialog_closed(host, *dialog),
            PageEvent::Timer(timer) => self.on_timer(host, *timer),
        }
    }

    /// Open the popup identified by `id` programmatically.
    ///
    /// Returns `false` if there is no such popup or it is already open.
    pub fn open<H: Host + ?Sized>(&mut self, host: &mut H, id: &str) -> bool {
        match self.registry.index_of(id) {
            Some(index) => self.open_index(host, index, None),
            None => false,
        }
    }

    /// Close the popup identified by `id` programmatically.
    ///
    /// Returns `false` if there is no such popup or it is already closed.
    pub fn close<H: Host + ?Sized>(&mut self, host: &mut H, id: &str) -> bool {
        match self.registry.index_of(id).and_then(|i| self.registry.get(i)) {
            Some(controller) => controller.close(host),
            None => false,
        }
    }

    /// State of the popup identified by `id`.
    #[must_use]
    pub fn state<H: Host + ?Sized>(&self, host: &H, id: &str) -> Option<PopupState> {
        self.registry
            .index_of(id)
            .and_then(|i| self.registry.get(i))
            .map(|controller| controller.state(host))
    }

    // --- State queries ---

    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn registry(&self) -> &PopupRegistry {
        &self.registry
    }

    #[must_use]
    pub fn modal_lock(&self) -> &ModalLock {
        &self.lock
    }

    #[must_use]
    pub fn exit_slot(&self) -> ExitIntentSlot {
        self.exit_slot
    }

    /// Report of the bootstrap run, once it has happened.
    #[must_use]
    pub fn report(&self) -> Option<&BootstrapReport> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    // --- Bootstrap ---

    fn bootstrap<H: Host + ?Sized>(&mut self, host: &mut H) -> BootstrapReport {
        let _span = debug_span!("popup_bootstrap").entered();
        self.lifecycle = Lifecycle::Running;

        let mut report = BootstrapReport::default();
        let now_ms = host.now_ms();

        for node in host.elements_with_class(&self.settings.popup_class) {
            let controller = PopupController::attach(host, node, &self.settings);
            let index = self.registry.insert(&*host, controller);
            report.popups += 1;
            self.evaluate(host, index, now_ms, &mut report);
        }

        self.registry.bind_interactions(&*host, &self.settings);
        report.triggers = self.registry.trigger_bindings().len();
        report.closers = self.registry.closer_count();

        debug!(
            popups = report.popups,
            triggers = report.triggers,
            closers = report.closers,
            opened = report.opened.len(),
            exit_reserved = report.exit_reserved.is_some(),
            "popup bootstrap complete"
        );
        self.report = Some(report.clone());
        report
    }

    fn evaluate<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        index: usize,
        now_ms: u64,
        report: &mut BootstrapReport,
    ) {
        let Some(controller) = self.registry.get(index) else {
            return;
        };
        let id = controller.id().clone();
        let config = controller.config().clone();

        let decision = {
            let expiry = ExpiryStore::new(host.storage());
            TriggerEvaluator::new(&self.settings).evaluate(
                &config,
                &id,
                &expiry,
                now_ms,
                &self.exit_slot,
            )
        };

        match decision {
            TriggerDecision::Manual => {}
            TriggerDecision::OpenNow { record_key } => {
                if self.open_index(host, index, None) {
                    ExpiryStore::new(host.storage()).write(&record_key, now_ms);
                    report.opened.push(id);
                }
            }
            TriggerDecision::ArmExitIntent { delay } => {
                let timer = self.allocate_timer();
                if self.exit_slot.reserve(index, timer) {
                    debug!(popup = %id, delay_ms = delay.as_millis() as u64, "exit intent reserved");
                    host.set_timeout(delay, timer);
                    report.exit_reserved = Some(id);
                }
            }
            TriggerDecision::Suppressed(reason) => {
                debug!(popup = %id, ?reason, "automatic trigger suppressed");
                report.suppressed.push((id, reason));
            }
        }
    }

    fn allocate_timer(&mut self) -> TimerId {
        let timer = TimerId::new(self.next_timer);
        self.next_timer += 1;
        timer
    }

    fn open_index<H: Host + ?Sized>(&mut self, host: &mut H, index: usize, via: Option<NodeId>) -> bool {
        match self.registry.get_mut(index) {
            Some(controller) => controller.open(host, &mut self.lock, via, &self.settings),
            None => false,
        }
    }

    // --- Event handlers ---

    fn on_ready<H: Host + ?Sized>(&mut self, host: &mut H) -> EventOutcome {
        if self.lifecycle != Lifecycle::WaitingForReady {
            return EventOutcome::IGNORED;
        }
        host.set_listener(ListenerKind::DomContentLoaded, false);
        self.bootstrap(host);
        EventOutcome::HANDLED
    }

    fn on_click<H: Host + ?Sized>(&mut self, host: &mut H, target: NodeId) -> EventOutcome {
        match self.registry.resolve_click(&*host, target) {
            Some(ClickAction::Open { popup, trigger }) => {
                self.open_index(host, popup, Some(trigger));
                EventOutcome::PREVENTED
            }
            Some(ClickAction::Close { popup }) => {
                if let Some(controller) = self.registry.get(popup) {
                    controller.close(host);
                }
                EventOutcome::PREVENTED
            }
            Some(ClickAction::Backdrop { popup }) => match self.registry.get(popup) {
                Some(controller) if controller.is_backdrop_dismiss(target) => {
                    controller.close(host);
                    EventOutcome::HANDLED
                }
                _ => EventOutcome::IGNORED,
            },
            None => EventOutcome::IGNORED,
        }
    }

    fn on_key(&mut self, key: &Key) -> EventOutcome {
        // Escape is left to the dialog's native close request handling,
        // which honours `closedby`; refusal happens in `on_cancel`.
        if *key == Key::Escape {
            trace!("escape delegated to native dialog");
        }
        EventOutcome::IGNORED
    }

    fn on_cancel(&mut self, dialog: NodeId) -> EventOutcome {
        match self
            .registry
            .index_of_node(dialog)
            .and_then(|index| self.registry.get(index))
        {
            Some(controller) if controller.refuses_close_request() => {
                trace!(popup = %controller.id(), "close request refused");
                EventOutcome::PREVENTED
            }
            _ => EventOutcome::IGNORED,
        }
    }

    fn on_submit<H: Host + ?Sized>(&mut self, host: &mut H, form: NodeId) -> EventOutcome {
        match self
            .registry
            .submit_target(form)
            .and_then(|index| self.registry.get(index))
        {
            Some(controller) => {
                controller.close(host);
                EventOutcome::HANDLED
            }
            None => EventOutcome::IGNORED,
        }
    }

    fn on_dialog_closed<H: Host + ?Sized>(&mut self, host: &mut H, dialog: NodeId) -> EventOutcome {
        let Some(index) = self.registry.index_of_node(dialog) else {
            return EventOutcome::IGNORED;
        };
        match self.registry.get_mut(index) {
            Some(controller) => {
                controller.on_closed(host, &mut self.lock);
                EventOutcome::HANDLED
            }
            None => EventOutcome::IGNORED,
        }
    }

    fn on_timer<H: Host + ?Sized>(&mut self, host: &mut H, timer: TimerId) -> EventOutcome {
        let Some(index) = self.exit_slot.settle(timer) else {
            return EventOutcome::IGNORED;
        };

        // Another tab may have shown the exit popup while we were settling.
        let expiry_days = self
            .registry
            .get(index)
            .map_or(self.settings.default_expiry_days, |c| c.config().expiry_days);
        let now_ms = host.now_ms();
        let recent = ExpiryStore::new(host.storage()).is_within_expiry(
            &self.settings.exit_storage_key,
            expiry_days,
            now_ms,
        );
        if recent {
            debug!("exit intent shown elsewhere during settle; not arming");
            self.exit_slot.abandon();
            return EventOutcome::HANDLED;
        }

        if let Some(controller) = self.registry.get(index) {
            debug!(popup = %controller.id(), "exit intent armed");
        }
        host.set_listener(ListenerKind::PointerOut, true);
        EventOutcome::HANDLED
    }

    fn on_pointer_out<H: Host + ?Sized>(&mut self, host: &mut H, signal: &PointerOut) -> EventOutcome {
        if !self.exit_slot.is_armed() {
            return EventOutcome::IGNORED;
        }
        if !TriggerEvaluator::new(&self.settings).is_exit_intent(signal) {
            return EventOutcome::IGNORED;
        }
        let Some(index) = self.exit_slot.fire() else {
            return EventOutcome::IGNORED;
        };

        host.set_listener(ListenerKind::PointerOut, false);
        self.open_index(host, index, None);
        let now_ms = host.now_ms();
        ExpiryStore::new(host.storage()).write(&self.settings.exit_storage_key, now_ms);
        if let Some(controller) = self.registry.get(index) {
            debug!(popup = %controller.id(), "exit intent fired");
        }
        EventOutcome::HANDLED
    }
}
