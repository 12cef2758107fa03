//! Local durable key/value storage.
//!
//! Mirrors browser local storage: string keys, string values, synchronous
//! access. Callers serialize structured values themselves.

mod file;
mod override_flag;

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

pub use file::FileStorage;
pub use override_flag::LocalAdminOverride;

/// Key holding the JSON-serialized cart.
pub const CART_KEY: &str = "digitrestau-cart";

/// Key holding the sticky local administrator flag (`"true"` when set).
pub const ADMIN_FLAG_KEY: &str = "digitrestau_is_admin";

/// Key holding the local administrator's avatar reference.
pub const LOCAL_AVATAR_KEY: &str = "digitrestau_local_avatar";

/// Errors from local storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage contents are corrupt: {0}")]
    Corrupt(String),
}

/// String key/value storage surviving process restarts.
pub trait LocalStorage: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().remove(key);
        Ok(())
    }
}
