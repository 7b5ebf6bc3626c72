//! Browser LocalStorage store (wasm32)

use super::Store;
use crate::error::StorageError;

/// Handle to `window.localStorage`
pub struct LocalStore {
    storage: web_sys::Storage,
}

impl LocalStore {
    /// Fails when storage is disabled (private mode, sandboxed iframe)
    pub fn open() -> Result<Self, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .map(|storage| Self { storage })
            .ok_or_else(|| StorageError::Unavailable("localStorage not accessible".to_string()))
    }
}

impl Store for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}
