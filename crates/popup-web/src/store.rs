#![forbid(unsafe_code)]

//! `localStorage` as a [`KeyValueStore`].

use popup_core::{KeyValueStore, StorageError};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, Storage, Window};

/// The window's `localStorage`, if the browser grants it.
///
/// Access can be refused outright (privacy modes, sandboxed frames); the
/// store then answers every call with [`StorageError::Unavailable`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    storage: Option<Storage>,
}

impl LocalStore {
    #[must_use]
    pub fn from_window(window: &Window) -> Self {
        let storage = match window.local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                warn!(error = ?err, "localStorage refused");
                None
            }
        };
        Self { storage }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    fn storage(&self) -> Result<&Storage, StorageError> {
        self.storage.as_ref().ok_or(StorageError::Unavailable)
    }
}

impl KeyValueStore for LocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|err| storage_error(key, &err))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| storage_error(key, &err))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage()?
            .remove_item(key)
            .map_err(|err| storage_error(key, &err))
    }
}

fn storage_error(key: &str, err: &JsValue) -> StorageError {
    match err.dyn_ref::<DomException>() {
        Some(exception) if exception.name() == "QuotaExceededError" => {
            StorageError::QuotaExceeded {
                key: key.to_owned(),
            }
        }
        Some(exception) => StorageError::Backend(exception.message()),
        None => StorageError::Backend(format!("{err:?}")),
    }
}
