#![forbid(unsafe_code)]

//! Automatic trigger evaluation.
//!
//! Click popups are opened by their trigger bindings; this module decides
//! what happens to `load` and `exit` popups at bootstrap and owns the
//! page-wide exit-intent slot.
//!
//! # Exit-intent slot
//!
//! There is one pointer and one exit gesture per page view, so at most one
//! popup can be the exit-intent target. The slot moves through:
//!
//! ```text
//! Vacant ──reserve──▶ Pending ──settle timer──▶ Armed ──exit signal──▶ Spent
//!                        │                                              ▲
//!                        └──────────── expired meanwhile ───────────────┘
//! ```
//!
//! `Spent` is terminal for the page view; the listener is never re-armed.

use std::time::Duration;

use popup_core::{ExpiryStore, PointerOut, PopupConfig, PopupId, TimerId, TriggerMode};

use crate::settings::RuntimeSettings;

/// Why an automatic trigger did not fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// A record under `key` is still inside the expiry window.
    WithinExpiry { key: String },
    /// Another popup already holds the exit-intent slot.
    ExitSlotTaken,
}

/// Outcome of evaluating one popup at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Opened only through click bindings.
    Manual,
    /// Open now and record the showing under `record_key`.
    OpenNow { record_key: String },
    /// Reserve the exit slot and arm the listener after `delay`.
    ArmExitIntent { delay: Duration },
    Suppressed(SuppressReason),
}

/// Stateless evaluator over the runtime settings.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEvaluator<'s> {
    settings: &'s RuntimeSettings,
}

impl<'s> TriggerEvaluator<'s> {
    #[must_use]
    pub fn new(settings: &'s RuntimeSettings) -> Self {
        Self { settings }
    }

    /// Decide how `popup` opens, given the store and the exit slot.
    #[must_use]
    pub fn evaluate(
        &self,
        config: &PopupConfig,
        popup: &PopupId,
        expiry: &ExpiryStore<'_>,
        now_ms: u64,
        exit_slot: &ExitIntentSlot,
    ) -> TriggerDecision {
        match config.trigger {
            TriggerMode::Click => TriggerDecision::Manual,
            TriggerMode::Load => {
                let key = self.settings.load_storage_key(popup);
                if expiry.is_within_expiry(&key, config.expiry_days, now_ms) {
                    TriggerDecision::Suppressed(SuppressReason::WithinExpiry { key })
                } else {
                    TriggerDecision::OpenNow { record_key: key }
                }
            }
            TriggerMode::Exit => {
                if !exit_slot.is_vacant() {
                    return TriggerDecision::Suppressed(SuppressReason::ExitSlotTaken);
                }
                let key = &self.settings.exit_storage_key;
                if expiry.is_within_expiry(key, config.expiry_days, now_ms) {
                    TriggerDecision::Suppressed(SuppressReason::WithinExpiry { key: key.clone() })
                } else {
                    TriggerDecision::ArmExitIntent {
                        delay: self.settings.exit_settle_delay(),
                    }
                }
            }
        }
    }

    /// Whether `signal` is the pointer leaving through the top of the
    /// viewport.
    #[must_use]
    pub fn is_exit_intent(&self, signal: &PointerOut) -> bool {
        is_exit_intent(signal, self.settings.exit_threshold_px)
    }
}

/// Exit-intent heuristic: the pointer left the document (no element to
/// move onto) near the top edge.
#[must_use]
pub fn is_exit_intent(signal: &PointerOut, threshold_px: f64) -> bool {
    signal.to_element.is_none() && signal.related_target.is_none() && signal.client_y < threshold_px
}

/// The page's single exit-intent listener, as an owned resource.
///
/// Popups are referred to by their index in the runtime registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitIntentSlot {
    #[default]
    Vacant,
    /// Reserved by `popup`; waiting for the settle timer.
    Pending { popup: usize, timer: TimerId },
    /// Listener installed for `popup`.
    Armed { popup: usize },
    /// Fired or abandoned. Terminal.
    Spent,
}

impl ExitIntentSlot {
    #[inline]
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        matches!(self, Self::Vacant)
    }

    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    /// Popup currently holding the slot, pending or armed.
    #[must_use]
    pub fn holder(&self) -> Option<usize> {
        match *self {
            Self::Pending { popup, .. } | Self::Armed { popup } => Some(popup),
            Self::Vacant | Self::Spent => None,
        }
    }

    /// Claim a vacant slot. Returns `false` if it was not vacant.
    pub fn reserve(&mut self, popup: usize, timer: TimerId) -> bool {
        if !self.is_vacant() {
            return false;
        }
        *self = Self::Pending { popup, timer };
        true
    }

    /// Settle timer `timer` fired. Returns the popup to arm for, if the
    /// timer is the one this slot is waiting on.
    pub fn settle(&mut self, timer: TimerId) -> Option<usize> {
        match *self {
            Self::Pending {
                popup,
                timer: pending,
            } if pending == timer => {
                *self = Self::Armed { popup };
                Some(popup)
            }
            _ => None,
        }
    }

    /// Consume an armed slot. Returns the popup to open.
    pub fn fire(&mut self) -> Option<usize> {
        match *self {
            Self::Armed { popup } => {
                *self = Self::Spent;
                Some(popup)
            }
            _ => None,
        }
    }

    /// Give the slot up without firing.
    pub fn abandon(&mut self) {
        *self = Self::Spent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use popup_core::{KeyValueStore, MemoryStore, NodeId, MS_PER_DAY};

    const NOW: u64 = 1_700_000_000_000;

    fn config(trigger: TriggerMode) -> PopupConfig {
        PopupConfig {
            trigger,
            ..PopupConfig::default()
        }
    }

    fn id(raw: &str) -> PopupId {
        PopupId::resolve(Some(raw), "open-popup")
    }

    #[test]
    fn click_is_manual() {
        let settings = RuntimeSettings::default();
        let mut store = MemoryStore::new();
        let expiry = ExpiryStore::new(&mut store);
        let decision = TriggerEvaluator::new(&settings).evaluate(
            &config(TriggerMode::Click),
            &id("a"),
            &expiry,
            NOW,
            &ExitIntentSlot::Vacant,
        );
        assert_eq!(decision, TriggerDecision::Manual);
    }

    #[test]
    fn load_respects_per_popup_record() {
        let settings = RuntimeSettings::default();
        let mut store = MemoryStore::new();
        store
            .set_item("popupShown-a", &(NOW - MS_PER_DAY).to_string())
            .unwrap();
        let expiry = ExpiryStore::new(&mut store);
        let evaluator = TriggerEvaluator::new(&settings);

        assert_eq!(
            evaluator.evaluate(&config(TriggerMode::Load), &id("a"), &expiry, NOW, &ExitIntentSlot::Vacant),
            TriggerDecision::Suppressed(SuppressReason::WithinExpiry {
                key: "popupShown-a".into()
            })
        );
        assert_eq!(
            evaluator.evaluate(&config(TriggerMode::Load), &id("b"), &expiry, NOW, &ExitIntentSlot::Vacant),
            TriggerDecision::OpenNow {
                record_key: "popupShown-b".into()
            }
        );
    }

    #[test]
    fn exit_arms_after_settle_delay() {
        let settings = RuntimeSettings::default();
        let mut store = MemoryStore::new();
        let expiry = ExpiryStore::new(&mut store);
        assert_eq!(
            TriggerEvaluator::new(&settings).evaluate(
                &config(TriggerMode::Exit),
                &id("a"),
                &expiry,
                NOW,
                &ExitIntentSlot::Vacant
            ),
            TriggerDecision::ArmExitIntent {
                delay: Duration::from_millis(3_000)
            }
        );
    }

    #[test]
    fn exit_skipped_when_slot_taken_or_recent() {
        let settings = RuntimeSettings::default();
        let mut store = MemoryStore::new();
        let evaluator = TriggerEvaluator::new(&settings);
        let taken = ExitIntentSlot::Pending {
            popup: 0,
            timer: TimerId::new(1),
        };
        {
            let expiry = ExpiryStore::new(&mut store);
            assert_eq!(
                evaluator.evaluate(&config(TriggerMode::Exit), &id("b"), &expiry, NOW, &taken),
                TriggerDecision::Suppressed(SuppressReason::ExitSlotTaken)
            );
        }

        store.set_item("exitIntentShown", &NOW.to_string()).unwrap();
        let expiry = ExpiryStore::new(&mut store);
        assert_eq!(
            evaluator.evaluate(&config(TriggerMode::Exit), &id("b"), &expiry, NOW, &ExitIntentSlot::Vacant),
            TriggerDecision::Suppressed(SuppressReason::WithinExpiry {
                key: "exitIntentShown".into()
            })
        );
    }

    #[test]
    fn exit_intent_heuristic() {
        assert!(is_exit_intent(&PointerOut::leaving_window(0.0), 10.0));
        assert!(is_exit_intent(&PointerOut::leaving_window(9.5), 10.0));
        assert!(!is_exit_intent(&PointerOut::leaving_window(10.0), 10.0));
        assert!(!is_exit_intent(&PointerOut::leaving_window(400.0), 10.0));

        let onto_element = PointerOut {
            client_y: 0.0,
            related_target: Some(NodeId::new(3)),
            to_element: None,
        };
        assert!(!is_exit_intent(&onto_element, 10.0));

        let legacy = PointerOut {
            client_y: 0.0,
            related_target: None,
            to_element: Some(NodeId::new(3)),
        };
        assert!(!is_exit_intent(&legacy, 10.0));
    }

    #[test]
    fn slot_lifecycle() {
        let mut slot = ExitIntentSlot::default();
        assert!(slot.reserve(2, TimerId::new(7)));
        assert!(!slot.reserve(3, TimerId::new(8)));
        assert_eq!(slot.holder(), Some(2));
        assert_eq!(slot.fire(), None, "not armed yet");

        assert_eq!(slot.settle(TimerId::new(99)), None, "foreign timer");
        assert_eq!(slot.settle(TimerId::new(7)), Some(2));
        assert!(slot.is_armed());

        assert_eq!(slot.fire(), Some(2));
        assert_eq!(slot, ExitIntentSlot::Spent);
        assert_eq!(slot.fire(), None);
        assert!(!slot.reserve(4, TimerId::new(9)), "spent is terminal");
    }
}
