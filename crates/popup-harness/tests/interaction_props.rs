#![forbid(unsafe_code)]

//! Property tests: invariants that hold under arbitrary interaction
//! sequences.

use std::time::Duration;

use popup_core::{ListenerKind, NodeId, PointerOut};
use popup_harness::{Dom, PopupSpec, SimPage};
use proptest::prelude::*;

const IDS: [&str; 6] = ["exit-a", "exit-b", "welcome", "signup", "locked", "plain"];

#[derive(Debug, Clone)]
enum Action {
    ClickLink(usize),
    ClickBackdrop(usize),
    ClickCloser(usize),
    Escape,
    Submit(usize),
    Open(usize),
    Close(usize),
    Advance(u64),
    Pointer { client_y: f64, onto_element: bool },
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..IDS.len()).prop_map(Action::ClickLink),
        (0..IDS.len()).prop_map(Action::ClickBackdrop),
        (0..IDS.len()).prop_map(Action::ClickCloser),
        Just(Action::Escape),
        (0..IDS.len()).prop_map(Action::Submit),
        (0..IDS.len()).prop_map(Action::Open),
        (0..IDS.len()).prop_map(Action::Close),
        (0u64..5_000).prop_map(Action::Advance),
        (0.0f64..40.0, any::<bool>())
            .prop_map(|(client_y, onto_element)| Action::Pointer { client_y, onto_element }),
    ]
}

struct Fixture {
    page: SimPage,
    links: Vec<NodeId>,
    dialogs: Vec<NodeId>,
    closers: Vec<NodeId>,
    forms: Vec<NodeId>,
}

fn fixture() -> Fixture {
    let mut dom = Dom::new();
    let specs = [
        PopupSpec::new(IDS[0]).trigger("exit").with_close_link(),
        PopupSpec::new(IDS[1]).trigger("exit").with_close_button(),
        PopupSpec::new(IDS[2])
            .trigger("load")
            .expiry("0")
            .with_close_link(),
        PopupSpec::new(IDS[3]).dismiss_on_submit().with_close_link(),
        PopupSpec::new(IDS[4])
            .legacy_dismissible("false")
            .with_form()
            .with_close_button(),
        PopupSpec::new(IDS[5]).with_form().with_close_button(),
    ];

    let mut dialogs = Vec::new();
    let mut closers = Vec::new();
    let mut forms = Vec::new();
    for spec in &specs {
        let nodes = dom.add_popup(spec);
        dialogs.push(nodes.dialog);
        closers.push(
            nodes
                .close_link
                .or(nodes.close_button)
                .unwrap_or(nodes.content),
        );
        forms.push(nodes.form.unwrap_or(nodes.content));
    }
    let links = IDS.iter().map(|id| dom.add_link(&format!("#{id}"))).collect();

    let mut page = SimPage::new(dom);
    page.boot();
    Fixture {
        page,
        links,
        dialogs,
        closers,
        forms,
    }
}

fn apply(fx: &mut Fixture, action: &Action) {
    let page = &mut fx.page;
    match *action {
        Action::ClickLink(i) => {
            page.click(fx.links[i]);
        }
        Action::ClickBackdrop(i) => {
            page.click(fx.dialogs[i]);
        }
        Action::ClickCloser(i) => {
            page.click(fx.closers[i]);
        }
        Action::Escape => {
            page.press_escape();
        }
        Action::Submit(i) => {
            page.submit(fx.forms[i]);
        }
        Action::Open(i) => {
            page.open(IDS[i]);
        }
        Action::Close(i) => {
            page.close(IDS[i]);
        }
        Action::Advance(ms) => page.advance(Duration::from_millis(ms)),
        Action::Pointer {
            client_y,
            onto_element,
        } => {
            let related_target = onto_element.then(|| fx.dialogs[0]);
            page.pointer_out(PointerOut {
                client_y,
                related_target,
                to_element: None,
            });
        }
    }
}

proptest! {
    #[test]
    fn modal_marker_tracks_open_popups(actions in prop::collection::vec(action(), 1..40)) {
        let mut fx = fixture();
        for action in &actions {
            apply(&mut fx, action);
            let open = fx.page.open_count();
            prop_assert_eq!(fx.page.runtime.modal_lock().depth(), open);
            prop_assert_eq!(fx.page.has_modal_marker(), open > 0);
        }
    }

    #[test]
    fn at_most_one_exit_listener_ever(actions in prop::collection::vec(action(), 1..40)) {
        let mut fx = fixture();
        for action in &actions {
            apply(&mut fx, action);
            prop_assert!(fx.page.host.peak_listener_count(ListenerKind::PointerOut) <= 1);
        }

        let installs = fx
            .page
            .host
            .listener_log()
            .iter()
            .filter(|&&(kind, enabled)| kind == ListenerKind::PointerOut && enabled)
            .count();
        prop_assert!(installs <= 1, "listener re-armed");
    }

    #[test]
    fn second_close_changes_nothing(
        actions in prop::collection::vec(action(), 0..20),
        target in 0..IDS.len(),
    ) {
        let mut fx = fixture();
        for action in &actions {
            apply(&mut fx, action);
        }

        fx.page.close(IDS[target]);
        let once: Vec<bool> = IDS.iter().map(|id| fx.page.is_open(id)).collect();
        let marker_once = fx.page.has_modal_marker();

        prop_assert!(!fx.page.close(IDS[target]));
        let twice: Vec<bool> = IDS.iter().map(|id| fx.page.is_open(id)).collect();
        prop_assert_eq!(once, twice);
        prop_assert_eq!(marker_once, fx.page.has_modal_marker());
        prop_assert!(!fx.page.is_open(IDS[target]));
    }
}
