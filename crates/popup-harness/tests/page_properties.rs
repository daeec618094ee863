#![forbid(unsafe_code)]

//! Integration tests: end-to-end page behaviour of the popup runtime.

use std::time::Duration;

use popup_core::{KeyValueStore, ListenerKind, MS_PER_DAY, NodeId, PageEvent, PointerOut};
use popup_harness::{DEFAULT_NOW_MS, Dom, PopupSpec, SimPage, init_test_logging};
use popup_runtime::{StartOutcome, SuppressReason};
use pretty_assertions::assert_eq;

const SETTLE: Duration = Duration::from_millis(3_000);

fn started(outcome: StartOutcome) -> popup_runtime::BootstrapReport {
    match outcome {
        StartOutcome::Started(report) => report,
        other => panic!("expected bootstrap to run, got {other:?}"),
    }
}

// ============================================================================
// Trigger correlation
// ============================================================================

#[test]
fn link_opens_its_popup_and_no_other() {
    init_test_logging();
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("foo"));
    dom.add_popup(&PopupSpec::new("bar"));
    let link = dom.add_link("#foo");

    let mut page = SimPage::new(dom);
    let report = started(page.boot());
    assert_eq!(report.popups, 2);
    assert_eq!(report.triggers, 1);

    let outcome = page.click(link);
    assert!(outcome.default_prevented);
    assert!(page.is_open("foo"));
    assert!(!page.is_open("bar"));
    assert_eq!(page.open_count(), 1);
    assert!(page.navigations().is_empty());
}

#[test]
fn absolute_link_with_fragment_is_a_trigger() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("foo"));
    let link = dom.add_link("https://example.com/landing#foo");
    let button = dom.add_target_button("#foo");

    let mut page = SimPage::new(dom);
    page.boot();
    page.click(link);
    assert!(page.is_open("foo"));

    page.close("foo");
    page.click(button);
    assert!(page.is_open("foo"));
}

#[test]
fn link_to_unknown_fragment_navigates() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("foo"));
    let link = dom.add_link("#elsewhere");

    let mut page = SimPage::new(dom);
    page.boot();
    let outcome = page.click(link);
    assert!(!outcome.handled);
    assert!(!page.is_open("foo"));
    assert_eq!(page.navigations(), ["#elsewhere".to_owned()]);
}

#[test]
fn popup_without_id_answers_to_default_reference() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::anonymous());
    let link = dom.add_link("#open-popup");

    let mut page = SimPage::new(dom);
    page.boot();
    page.click(link);
    assert!(page.is_open("open-popup"));
}

// ============================================================================
// Close idempotence
// ============================================================================

#[test]
fn closing_twice_equals_closing_once() {
    let mut dom = Dom::new();
    let nodes = dom.add_popup(&PopupSpec::new("foo"));
    let link = dom.add_link("#foo");

    let mut page = SimPage::new(dom);
    page.boot();
    page.click(link);
    assert!(page.has_modal_marker());

    assert!(page.close("foo"));
    let after_once = (
        page.is_open("foo"),
        page.has_modal_marker(),
        page.runtime.modal_lock().depth(),
    );
    assert!(!page.close("foo"));
    let after_twice = (
        page.is_open("foo"),
        page.has_modal_marker(),
        page.runtime.modal_lock().depth(),
    );

    assert_eq!(after_once, (false, false, 0));
    assert_eq!(after_once, after_twice);

    // A stray close notification changes nothing either.
    page.dispatch(&PageEvent::DialogClosed {
        dialog: nodes.dialog,
    });
    assert!(!page.has_modal_marker());
}

#[test]
fn every_close_path_clears_the_marker() {
    let mut dom = Dom::new();
    let nodes = dom.add_popup(&PopupSpec::new("foo").with_close_link());
    let link = dom.add_link("#foo");

    let mut page = SimPage::new(dom);
    page.boot();

    page.click(link);
    page.press_escape();
    assert!(!page.is_open("foo"));
    assert!(!page.has_modal_marker());

    page.click(link);
    page.click(nodes.dialog);
    assert!(!page.is_open("foo"));
    assert!(!page.has_modal_marker());

    page.click(link);
    page.click(nodes.close_link.unwrap());
    assert!(!page.has_modal_marker());

    page.click(link);
    page.close_natively(nodes.dialog);
    assert!(!page.has_modal_marker());
}

// ============================================================================
// Dismiss on submit
// ============================================================================

#[test]
fn submit_closes_when_configured() {
    let mut dom = Dom::new();
    let nodes = dom.add_popup(&PopupSpec::new("signup").dismiss_on_submit());
    let link = dom.add_link("#signup");

    let mut page = SimPage::new(dom);
    page.boot();
    page.click(link);

    let form = nodes.form.unwrap();
    let outcome = page.submit(form);
    assert!(outcome.handled);
    assert!(!outcome.default_prevented, "submission must go through");
    assert!(!page.is_open("signup"));
    assert!(!page.has_modal_marker());
    assert_eq!(page.submissions(), [form]);
}

#[test]
fn submit_leaves_popup_open_otherwise() {
    let mut dom = Dom::new();
    let nodes = dom.add_popup(&PopupSpec::new("signup").with_form());
    let link = dom.add_link("#signup");

    let mut page = SimPage::new(dom);
    page.boot();
    page.click(link);

    let outcome = page.submit(nodes.form.unwrap());
    assert!(!outcome.handled);
    assert!(page.is_open("signup"));
}

// ============================================================================
// Load trigger and expiry
// ============================================================================

#[test]
fn load_popup_opens_once_per_expiry_window() {
    init_test_logging();
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("promo").trigger("load").expiry("7"));

    let mut first = SimPage::new(dom);
    let report = started(first.boot());
    assert_eq!(report.opened, vec![popup_core::PopupId::new("promo")]);
    assert!(first.is_open("promo"));
    assert!(first.has_modal_marker());
    assert_eq!(
        first.stored("popupShown-promo"),
        Some(DEFAULT_NOW_MS.to_string())
    );

    let mut second = first.reload();
    second.host.clock.advance(Duration::from_millis(6 * MS_PER_DAY));
    let report = started(second.boot());
    assert!(!second.is_open("promo"));
    assert!(!second.has_modal_marker());
    assert_eq!(
        report.suppressed,
        vec![(
            popup_core::PopupId::new("promo"),
            SuppressReason::WithinExpiry {
                key: "popupShown-promo".into()
            }
        )]
    );

    let mut third = second.reload();
    third.host.clock.advance(Duration::from_millis(MS_PER_DAY));
    third.boot();
    assert!(third.is_open("promo"), "window elapsed");
}

#[test]
fn zero_expiry_never_suppresses() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("promo").trigger("load").expiry("0"));

    let mut page = SimPage::new(dom);
    page.boot();
    assert!(page.is_open("promo"));

    let mut again = page.reload();
    again.boot();
    assert!(again.is_open("promo"));
}

#[test]
fn cleared_record_lets_load_popup_show_again() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("promo").trigger("load").expiry("7"));

    let mut page = SimPage::new(dom);
    page.boot();
    assert!(page.is_open("promo"));

    let mut suppressed = page.reload();
    suppressed.boot();
    assert!(!suppressed.is_open("promo"));

    suppressed.clear_record("popupShown-promo");
    assert_eq!(suppressed.stored("popupShown-promo"), None);

    let mut fresh = suppressed.reload();
    fresh.boot();
    assert!(fresh.is_open("promo"));
}

#[test]
fn load_records_are_per_popup() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("a").trigger("load"));
    dom.add_popup(&PopupSpec::new("b").trigger("load"));

    let mut store = popup_core::MemoryStore::new();
    store
        .set_item("popupShown-a", &DEFAULT_NOW_MS.to_string())
        .unwrap();

    let mut page = SimPage::new(dom).with_store(store);
    page.boot();
    assert!(!page.is_open("a"));
    assert!(page.is_open("b"));
}

#[test]
fn garbage_record_counts_as_never_shown() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("promo").trigger("load"));

    let mut store = popup_core::MemoryStore::new();
    store.set_item("popupShown-promo", "yesterday").unwrap();

    let mut page = SimPage::new(dom).with_store(store);
    page.boot();
    assert!(page.is_open("promo"));
    assert_eq!(
        page.stored("popupShown-promo"),
        Some(DEFAULT_NOW_MS.to_string())
    );
}

// ============================================================================
// Exit intent
// ============================================================================

#[test]
fn exit_intent_fires_once_after_settle_delay() {
    init_test_logging();
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("stay").trigger("exit").expiry("7"));

    let mut page = SimPage::new(dom);
    let report = started(page.boot());
    assert_eq!(report.exit_reserved, Some(popup_core::PopupId::new("stay")));
    assert_eq!(page.host.listener_count(ListenerKind::PointerOut), 0);

    // Too early: nothing is listening yet.
    page.leave_top(0.0);
    assert!(!page.is_open("stay"));

    page.advance(SETTLE);
    assert_eq!(page.host.listener_count(ListenerKind::PointerOut), 1);

    let outcome = page.leave_top(0.0);
    assert!(outcome.handled);
    assert!(page.is_open("stay"));
    assert_eq!(page.host.listener_count(ListenerKind::PointerOut), 0);
    let fired_at = DEFAULT_NOW_MS + 3_000;
    assert_eq!(page.stored("exitIntentShown"), Some(fired_at.to_string()));

    page.press_escape();
    assert!(!page.is_open("stay"));

    // Second gesture: the listener is gone, and the runtime ignores a
    // stray delivery too.
    page.leave_top(0.0);
    let stray = page.dispatch(&PageEvent::PointerOut(PointerOut::leaving_window(0.0)));
    assert!(!stray.handled);
    assert!(!page.is_open("stay"));

    let pointer_log: Vec<_> = page
        .host
        .listener_log()
        .iter()
        .filter(|(kind, _)| *kind == ListenerKind::PointerOut)
        .copied()
        .collect();
    assert_eq!(
        pointer_log,
        vec![
            (ListenerKind::PointerOut, true),
            (ListenerKind::PointerOut, false)
        ]
    );
}

#[test]
fn exit_intent_ignores_ordinary_pointer_movement() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("stay").trigger("exit"));
    let body = dom.body();

    let mut page = SimPage::new(dom);
    page.boot();
    page.advance(SETTLE);

    page.leave_top(50.0);
    page.pointer_out(PointerOut {
        client_y: 0.0,
        related_target: Some(body),
        to_element: None,
    });
    page.pointer_out(PointerOut {
        client_y: 2.0,
        related_target: None,
        to_element: Some(NodeId::new(0)),
    });
    assert!(!page.is_open("stay"));
    assert_eq!(page.host.listener_count(ListenerKind::PointerOut), 1);

    page.leave_top(3.0);
    assert!(page.is_open("stay"));
}

#[test]
fn exit_intent_respects_page_global_record() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("stay").trigger("exit"));

    let mut page = SimPage::new(dom);
    page.boot();
    page.advance(SETTLE);
    page.leave_top(0.0);

    let mut next = page.reload();
    let report = started(next.boot());
    assert_eq!(report.exit_reserved, None);
    assert!(next.host.pending_timers().is_empty());
    next.advance(SETTLE);
    assert_eq!(next.host.peak_listener_count(ListenerKind::PointerOut), 0);
}

#[test]
fn only_first_exit_popup_holds_the_slot() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("first").trigger("exit"));
    dom.add_popup(&PopupSpec::new("second").trigger("exit"));
    dom.add_popup(&PopupSpec::new("third").trigger("exit"));

    let mut page = SimPage::new(dom);
    let report = started(page.boot());
    assert_eq!(report.exit_reserved, Some(popup_core::PopupId::new("first")));
    assert_eq!(
        report.suppressed,
        vec![
            (
                popup_core::PopupId::new("second"),
                SuppressReason::ExitSlotTaken
            ),
            (
                popup_core::PopupId::new("third"),
                SuppressReason::ExitSlotTaken
            ),
        ]
    );
    assert_eq!(page.host.pending_timers().len(), 1);

    page.advance(SETTLE);
    page.leave_top(0.0);
    assert!(page.is_open("first"));
    assert!(!page.is_open("second"));
    assert!(!page.is_open("third"));
    assert_eq!(page.host.peak_listener_count(ListenerKind::PointerOut), 1);
}

#[test]
fn exit_shown_elsewhere_during_settle_is_not_armed() {
    let mut dom = Dom::new();
    dom.add_popup(&PopupSpec::new("stay").trigger("exit"));

    let mut page = SimPage::new(dom);
    page.boot();
    page.host.clock.advance(Duration::from_millis(1_000));
    let now = page.now_ms();
    page.host
        .store
        .set_item("exitIntentShown", &now.to_string())
        .unwrap();

    page.advance(SETTLE);
    assert_eq!(page.host.peak_listener_count(ListenerKind::PointerOut), 0);
    assert_eq!(
        page.runtime.exit_slot(),
        popup_runtime::ExitIntentSlot::Spent
    );
}

// ============================================================================
// Non-dismissible popups
// ============================================================================

#[test]
fn non_dismissible_popup_refuses_escape_and_backdrop() {
    let mut dom = Dom::new();
    let nodes = dom.add_popup(
        &PopupSpec::new("locked")
            .legacy_dismissible("false")
            .with_close_button(),
    );
    let link = dom.add_link("#locked");

    let mut page = SimPage::new(dom);
    page.boot();
    assert_eq!(
        popup_core::Document::attribute(&page.host, nodes.dialog, "closedby").as_deref(),
        Some("none")
    );

    page.click(link);
    page.press_escape();
    assert!(page.is_open("locked"));

    let cancel = page.dispatch(&PageEvent::Cancel {
        dialog: nodes.dialog,
    });
    assert!(cancel.default_prevented);

    let backdrop = page.click(nodes.dialog);
    assert!(!backdrop.handled);
    assert!(page.is_open("locked"));
    assert!(page.has_modal_marker());

    // The explicit close affordance still works.
    page.click(nodes.close_button.unwrap());
    assert!(!page.is_open("locked"));
    assert!(!page.has_modal_marker());
}
