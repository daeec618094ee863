#![forbid(unsafe_code)]

//! Best-effort string key/value storage.
//!
//! In the browser this is `window.localStorage`; in tests it is a
//! [`MemoryStore`]. Every operation is fallible because the backing store
//! may be missing (privacy mode, sandboxed iframes) or full. Callers are
//! expected to degrade rather than propagate; see
//! [`ExpiryStore`](crate::expiry::ExpiryStore).

use std::collections::BTreeMap;
use std::fmt;

/// Failure reported by a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No store is available in this environment.
    Unavailable,
    /// The store refused the write for lack of space.
    QuotaExceeded { key: String },
    /// Any other backend failure, with its message.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage unavailable"),
            Self::QuotaExceeded { key } => write!(f, "storage quota exceeded writing {key:?}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// String key/value store with `localStorage` semantics.
pub trait KeyValueStore {
    /// Read `key`. `Ok(None)` when it was never written.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// A store slot that may not exist at all.
impl<S: KeyValueStore> KeyValueStore for Option<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Some(store) => store.get_item(key),
            None => Err(StorageError::Unavailable),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Some(store) => store.set_item(key, value),
            None => Err(StorageError::Unavailable),
        }
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        match self {
            Some(store) => store.remove_item(key),
            None => Err(StorageError::Unavailable),
        }
    }
}

/// In-memory store.
///
/// Can be switched into a failing mode to exercise the degrade paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    failing: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with [`StorageError::Unavailable`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            entries: BTreeMap::new(),
            failing: true,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Raw view of the stored entries, ignoring the failing flag.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, like `localStorage.clear()`.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable);
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable);
        }
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable);
        }
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_item("a"), Ok(None));
        store.set_item("a", "1").unwrap();
        assert_eq!(store.get_item("a"), Ok(Some("1".into())));
        store.set_item("a", "2").unwrap();
        assert_eq!(store.get_item("a"), Ok(Some("2".into())));
        store.remove_item("a").unwrap();
        assert_eq!(store.get_item("a"), Ok(None));
        assert!(store.is_empty());
    }

    #[test]
    fn failing_store_reports_unavailable() {
        let mut store = MemoryStore::unavailable();
        assert_eq!(store.get_item("a"), Err(StorageError::Unavailable));
        assert_eq!(store.set_item("a", "1"), Err(StorageError::Unavailable));
        assert_eq!(store.remove_item("a"), Err(StorageError::Unavailable));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn missing_store_slot() {
        let mut slot: Option<MemoryStore> = None;
        assert_eq!(slot.get_item("k"), Err(StorageError::Unavailable));
        assert_eq!(slot.set_item("k", "v"), Err(StorageError::Unavailable));

        let mut slot = Some(MemoryStore::new());
        slot.set_item("k", "v").unwrap();
        assert_eq!(slot.get_item("k"), Ok(Some("v".into())));
    }

    #[test]
    fn error_display() {
        assert_eq!(StorageError::Unavailable.to_string(), "storage unavailable");
        assert_eq!(
            StorageError::QuotaExceeded { key: "x".into() }.to_string(),
            "storage quota exceeded writing \"x\""
        );
    }
}
