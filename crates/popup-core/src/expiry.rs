#![forbid(unsafe_code)]

//! Expiry-window persistence over a [`KeyValueStore`].
//!
//! A record is a millisecond timestamp stored as decimal text. A popup whose
//! record is younger than its expiry window is suppressed; anything else
//! (missing, zero, unparsable, unreadable store) leaves it eligible to show.
//!
//! # Invariants
//!
//! - `is_within_expiry` is a pure read: two calls with no intervening
//!   `write` return the same answer for the same `now_ms`.
//! - `expiration_days == 0` never suppresses.
//! - Store failures never escape this module.

use tracing::{trace, warn};

use crate::storage::KeyValueStore;

/// Milliseconds in one expiry day.
pub const MS_PER_DAY: u64 = 86_400_000;

/// A persisted "last shown" timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryRecord {
    pub key: String,
    pub timestamp_ms: u64,
}

/// Whether a stored timestamp still suppresses at `now_ms`.
///
/// `None` and `Some(0)` both mean "never shown". A timestamp in the future
/// (clock moved backwards) counts as within expiry.
#[must_use]
pub fn within_expiry(stored: Option<u64>, expiration_days: u32, now_ms: u64) -> bool {
    match stored {
        None | Some(0) => false,
        Some(_) if expiration_days == 0 => false,
        Some(timestamp) => {
            let window = u64::from(expiration_days).saturating_mul(MS_PER_DAY);
            now_ms.saturating_sub(timestamp) < window
        }
    }
}

/// Parse a stored timestamp the lenient way: leading decimal digits after
/// optional whitespace, anything after them ignored.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let digits = trimmed
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    trimmed[..digits].parse().ok()
}

/// The persistence adapter: expiry semantics over a borrowed store.
pub struct ExpiryStore<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> ExpiryStore<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Stored timestamp for `key`, or `None` if absent, unparsable or
    /// unreadable.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<u64> {
        match self.store.get_item(key) {
            Ok(Some(raw)) => {
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() {
                    trace!(key, raw = %raw, "ignoring unparsable expiry record");
                }
                parsed
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "expiry record unreadable");
                None
            }
        }
    }

    /// Full record for `key`, if one is readable.
    #[must_use]
    pub fn record(&self, key: &str) -> Option<ExpiryRecord> {
        self.read(key).map(|timestamp_ms| ExpiryRecord {
            key: key.to_owned(),
            timestamp_ms,
        })
    }

    /// Store `timestamp_ms` under `key`. Failures are logged and dropped.
    pub fn write(&mut self, key: &str, timestamp_ms: u64) {
        if let Err(err) = self.store.set_item(key, &timestamp_ms.to_string()) {
            warn!(key, error = %err, "expiry record not persisted");
        }
    }

    /// Forget `key`. Failures are logged and dropped.
    pub fn clear(&mut self, key: &str) {
        if let Err(err) = self.store.remove_item(key) {
            warn!(key, error = %err, "expiry record not cleared");
        }
    }

    /// True iff a record exists for `key` and is younger than
    /// `expiration_days` at `now_ms`.
    #[must_use]
    pub fn is_within_expiry(&self, key: &str, expiration_days: u32, now_ms: u64) -> bool {
        within_expiry(self.read(key), expiration_days, now_ms)
    }
}
