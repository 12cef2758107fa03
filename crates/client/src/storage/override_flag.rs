//! The sticky local administrator override.
//!
//! Set by admin elevation (or an administrator login), cleared only by an
//! explicit logout. A remote sign-out event leaves it alone.

use std::sync::Arc;

use tracing::warn;

use super::{ADMIN_FLAG_KEY, LOCAL_AVATAR_KEY, LocalStorage, StorageError};

/// Persisted override flag and local avatar.
#[derive(Clone)]
pub struct LocalAdminOverride {
    storage: Arc<dyn LocalStorage>,
}

impl LocalAdminOverride {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Whether the override is set. Unreadable storage counts as unset.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        match self.storage.get_item(ADMIN_FLAG_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read admin override flag");
                false
            }
        }
    }

    /// Set the override.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be written.
    pub fn grant(&self) -> Result<(), StorageError> {
        self.storage.set_item(ADMIN_FLAG_KEY, "true")
    }

    /// Clear the override.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be removed.
    pub fn revoke(&self) -> Result<(), StorageError> {
        self.storage.remove_item(ADMIN_FLAG_KEY)
    }

    /// Avatar reference used by the local administrator identity.
    #[must_use]
    pub fn avatar(&self) -> Option<String> {
        match self.storage.get_item(LOCAL_AVATAR_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read local avatar");
                None
            }
        }
    }

    /// Store the local administrator's avatar reference.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the avatar cannot be written.
    pub fn set_avatar(&self, avatar_url: &str) -> Result<(), StorageError> {
        self.storage.set_item(LOCAL_AVATAR_KEY, avatar_url)
    }
}

impl std::fmt::Debug for LocalAdminOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAdminOverride")
            .field("granted", &self.is_granted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn override_flag() -> (Arc<MemoryStorage>, LocalAdminOverride) {
        let storage = Arc::new(MemoryStorage::new());
        let flag = LocalAdminOverride::new(storage.clone());
        (storage, flag)
    }

    #[test]
    fn test_grant_and_revoke() {
        let (storage, flag) = override_flag();
        assert!(!flag.is_granted());

        flag.grant().unwrap();
        assert!(flag.is_granted());
        assert_eq!(
            storage.get_item(ADMIN_FLAG_KEY).unwrap().as_deref(),
            Some("true")
        );

        flag.revoke().unwrap();
        assert!(!flag.is_granted());
    }

    #[test]
    fn test_only_literal_true_counts() {
        let (storage, flag) = override_flag();
        storage.set_item(ADMIN_FLAG_KEY, "false").unwrap();
        assert!(!flag.is_granted());
        storage.set_item(ADMIN_FLAG_KEY, "yes").unwrap();
        assert!(!flag.is_granted());
    }

    #[test]
    fn test_avatar_survives_revoke() {
        let (_storage, flag) = override_flag();
        flag.set_avatar("data:image/png;base64,AAAA").unwrap();
        flag.grant().unwrap();
        flag.revoke().unwrap();
        assert_eq!(flag.avatar().as_deref(), Some("data:image/png;base64,AAAA"));
    }
}
