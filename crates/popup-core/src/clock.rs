#![forbid(unsafe_code)]

//! Wall-clock access in milliseconds since the Unix epoch.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Real clock. Uses `web_time` so the same code works natively and on
/// `wasm32-unknown-unknown` (where it reads `Date.now()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same underlying time, so a page and the test driving it
/// can hold separate handles.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Create a clock starting at `start_ms`.
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta_ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.now.set(self.now.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
