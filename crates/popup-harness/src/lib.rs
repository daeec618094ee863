#![forbid(unsafe_code)]

//! Deterministic test harness for the popup runtime.
//!
//! Builds pages in memory, drives the runtime through scripted gestures and
//! exposes everything a test needs to assert on: dialog state, the modal
//! marker, storage contents, installed listeners and pending timers.
//!
//! # Example
//!
//! ```
//! use popup_harness::{Dom, PopupSpec, SimPage};
//!
//! let mut dom = Dom::new();
//! dom.add_popup(&PopupSpec::new("promo").with_close_link());
//! let link = dom.add_link("#promo");
//!
//! let mut page = SimPage::new(dom);
//! page.boot();
//! page.click(link);
//! assert!(page.is_open("promo"));
//! assert!(page.has_modal_marker());
//! ```

pub mod dom;
pub mod fixtures;
pub mod page;

pub use dom::{Dom, ElementBuilder};
pub use fixtures::{PopupNodes, PopupSpec};
pub use page::{DEFAULT_NOW_MS, SimHost, SimPage};

use tracing_subscriber::EnvFilter;

/// Route runtime logs to the test output.
///
/// Honours `RUST_LOG`; defaults to `popup_runtime=debug`. Safe to call from
/// every test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("popup_runtime=debug,popup_core=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
