#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use popup_core::{ListenerKind, NodeId, PointerOut};
use popup_harness::{Dom, PopupSpec, SimPage};

const TRIGGERS: [&str; 4] = ["click", "exit", "load", "bogus"];
const CLOSED_BY: [&str; 4] = ["any", "closerequest", "none", ""];

#[derive(Debug, Arbitrary)]
struct PopupInput {
    trigger: u8,
    closed_by: u8,
    expiry: u8,
    dismiss_on_submit: bool,
    anchored: bool,
}

#[derive(Debug, Arbitrary)]
enum Step {
    ClickLink(u8),
    ClickDialog(u8),
    ClickCloser(u8),
    Escape,
    Submit(u8),
    Open(u8),
    Close(u8),
    Advance(u16),
    Pointer { client_y: u8, onto_element: bool },
}

#[derive(Debug, Arbitrary)]
struct Input {
    popups: Vec<PopupInput>,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let popups = &input.popups[..input.popups.len().min(6)];
    if popups.is_empty() {
        return;
    }

    let mut dom = Dom::new();
    let mut ids = Vec::new();
    let mut dialogs = Vec::new();
    let mut closers = Vec::new();
    let mut forms = Vec::new();
    for (index, popup) in popups.iter().enumerate() {
        let id = format!("p{index}");
        let mut spec = PopupSpec::new(&id)
            .trigger(TRIGGERS[usize::from(popup.trigger) % TRIGGERS.len()])
            .expiry(&popup.expiry.to_string())
            .with_close_link()
            .with_form();
        let closed_by = CLOSED_BY[usize::from(popup.closed_by) % CLOSED_BY.len()];
        if !closed_by.is_empty() {
            spec = spec.closed_by(closed_by);
        }
        if popup.dismiss_on_submit {
            spec = spec.dismiss_on_submit();
        }
        if popup.anchored {
            spec = spec.class("has-anchor-position-auto");
        }
        let nodes = dom.add_popup(&spec);
        dialogs.push(nodes.dialog);
        closers.push(nodes.close_link.unwrap_or(nodes.content));
        forms.push(nodes.form.unwrap_or(nodes.content));
        ids.push(id);
    }
    let links: Vec<NodeId> = ids.iter().map(|id| dom.add_link(&format!("#{id}"))).collect();

    let mut page = SimPage::new(dom);
    page.boot();

    let pick = |i: u8| usize::from(i) % ids.len();
    for step in input.steps.iter().take(64) {
        match *step {
            Step::ClickLink(i) => {
                page.click(links[pick(i)]);
            }
            Step::ClickDialog(i) => {
                page.click(dialogs[pick(i)]);
            }
            Step::ClickCloser(i) => {
                page.click(closers[pick(i)]);
            }
            Step::Escape => {
                page.press_escape();
            }
            Step::Submit(i) => {
                page.submit(forms[pick(i)]);
            }
            Step::Open(i) => {
                page.open(&ids[pick(i)]);
            }
            Step::Close(i) => {
                page.close(&ids[pick(i)]);
            }
            Step::Advance(ms) => page.advance(Duration::from_millis(u64::from(ms))),
            Step::Pointer {
                client_y,
                onto_element,
            } => {
                page.pointer_out(PointerOut {
                    client_y: f64::from(client_y),
                    related_target: onto_element.then(|| dialogs[0]),
                    to_element: None,
                });
            }
        }

        let open = page.open_count();
        assert_eq!(page.runtime.modal_lock().depth(), open);
        assert_eq!(page.has_modal_marker(), open > 0);
        assert!(page.host.peak_listener_count(ListenerKind::PointerOut) <= 1);
    }
});
