//! Browser smoke tests. Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use popup_core::KeyValueStore;
use popup_web::LocalStore;
use pretty_assertions::assert_eq;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, HtmlDialogElement, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn append(parent: &Element, tag: &str, attrs: &[(&str, &str)]) -> Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let element = document.create_element(tag).unwrap();
    for (name, value) in attrs {
        element.set_attribute(name, value).unwrap();
    }
    parent.append_child(&element).unwrap();
    element
}

#[wasm_bindgen_test]
fn trigger_link_opens_and_close_link_closes() {
    let document = web_sys::window().unwrap().document().unwrap();
    let body: Element = document.body().unwrap().into();

    let dialog = append(
        &body,
        "dialog",
        &[("id", "smoke"), ("class", "wp-block-hm-popup")],
    );
    let close = append(&dialog, "a", &[("href", "#close")]);
    let trigger = append(&body, "a", &[("href", "#smoke")]);

    popup_web::boot().unwrap();
    assert_eq!(
        dialog.get_attribute("closedby").as_deref(),
        Some("any"),
        "close permission written at attach"
    );

    trigger.unchecked_ref::<HtmlElement>().click();
    assert!(dialog.unchecked_ref::<HtmlDialogElement>().open());
    assert!(popup_web::is_popup_open("smoke"));
    let root = document.document_element().unwrap();
    assert!(root.class_list().contains("has-modal-open"));

    close.unchecked_ref::<HtmlElement>().click();
    assert!(!dialog.unchecked_ref::<HtmlDialogElement>().open());
    assert!(!popup_web::open_popup("missing"));
}

#[wasm_bindgen_test]
fn local_store_round_trip() {
    let window = web_sys::window().unwrap();
    let mut store = LocalStore::from_window(&window);
    assert!(store.is_available());

    store.set_item("popup-web-test", "1700000000000").unwrap();
    assert_eq!(
        store.get_item("popup-web-test").unwrap().as_deref(),
        Some("1700000000000")
    );
    store.remove_item("popup-web-test").unwrap();
    assert_eq!(store.get_item("popup-web-test").unwrap(), None);
}
