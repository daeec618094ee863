#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use popup_core::config::fragment_of;
use popup_core::expiry::{parse_timestamp, within_expiry};
use popup_core::{ClosedBy, ElementSnapshot, PopupConfig};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    trigger: Option<&'a str>,
    expiry: Option<&'a str>,
    closed_by: Option<&'a str>,
    dismissible: Option<&'a str>,
    dismiss_on_submit: Option<&'a str>,
    classes: Vec<&'a str>,
    stored: &'a str,
    reference: &'a str,
    default_days: u8,
    now_ms: u64,
}

fuzz_target!(|input: Input<'_>| {
    let mut snapshot = ElementSnapshot::new();
    let attributes = [
        ("data-trigger", input.trigger),
        ("data-expiry", input.expiry),
        ("closedby", input.closed_by),
        ("data-dismissible", input.dismissible),
        ("data-dismiss-on-submit", input.dismiss_on_submit),
    ];
    for (name, value) in attributes {
        if let Some(value) = value {
            snapshot = snapshot.with_attribute(name, value);
        }
    }
    for class in &input.classes {
        snapshot = snapshot.with_class(class);
    }

    let config = PopupConfig::from_snapshot(&snapshot, u32::from(input.default_days));

    let native = input.closed_by.and_then(|raw| raw.parse::<ClosedBy>().ok());
    assert_eq!(config.closed_by_native, native.is_some());
    if let Some(native) = native {
        assert_eq!(config.closed_by, native);
    }
    if input.expiry.is_none() {
        assert_eq!(config.expiry_days, u32::from(input.default_days));
    }

    let stored = parse_timestamp(input.stored);
    let first = within_expiry(stored, config.expiry_days, input.now_ms);
    assert_eq!(first, within_expiry(stored, config.expiry_days, input.now_ms));
    if config.expiry_days == 0 || stored.is_none() {
        assert!(!first);
    }

    if let Some(fragment) = fragment_of(input.reference) {
        assert!(!fragment.is_empty());
        assert!(!fragment.contains('#'));
    }
});
