//! Integration tests for DigitRestau.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p digitrestau-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - Cart merging and persistence across restarts
//! - `identity` - Login, elevation and identity precedence
//! - `catalog` - Loading, optimistic saves and order placement
//! - `realtime` - Pushed auth and order changes
//! - `notifications` - Notification lifetimes
//!
//! Every scenario drives an [`AppController`] against the in-memory backend,
//! so no network or database is required.

use std::sync::Arc;
use std::time::Duration;

use digitrestau_client::test_support::InMemoryBackend;
use digitrestau_client::{
    AlertError, AlertPlayer, AlertSound, AppController, ClientConfig, Collaborators,
    LocalStorage, MemoryStorage,
};
use digitrestau_core::Dish;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Records every alert it is asked to play; optionally fails each one.
#[derive(Debug, Default)]
pub struct RecordingAlerts {
    played: Mutex<Vec<AlertSound>>,
    broken: bool,
}

impl RecordingAlerts {
    /// A player whose every call fails after recording the sound.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    #[must_use]
    pub fn played(&self) -> Vec<AlertSound> {
        self.played.lock().clone()
    }
}

impl AlertPlayer for RecordingAlerts {
    fn play(&self, sound: AlertSound) -> Result<(), AlertError> {
        self.played.lock().push(sound);
        if self.broken {
            return Err(AlertError("speaker unplugged".to_owned()));
        }
        Ok(())
    }
}

/// A controller wired to in-memory collaborators.
pub struct TestApp {
    pub controller: AppController,
    pub backend: Option<Arc<InMemoryBackend>>,
    pub storage: Arc<dyn LocalStorage>,
    pub alerts: Arc<RecordingAlerts>,
}

impl TestApp {
    /// Online app over `backend` with fresh storage. Not started.
    #[must_use]
    pub fn online(backend: Arc<InMemoryBackend>) -> Self {
        Self::build(Some(backend), Arc::new(MemoryStorage::new()), RecordingAlerts::default())
    }

    /// Offline app over `storage`. Not started.
    #[must_use]
    pub fn offline(storage: Arc<dyn LocalStorage>) -> Self {
        Self::build(None, storage, RecordingAlerts::default())
    }

    #[must_use]
    pub fn build(
        backend: Option<Arc<InMemoryBackend>>,
        storage: Arc<dyn LocalStorage>,
        alerts: RecordingAlerts,
    ) -> Self {
        let alerts = Arc::new(alerts);
        let mut collaborators = Collaborators::offline(storage.clone()).with_alerts(alerts.clone());
        if let Some(backend) = &backend {
            collaborators = collaborators.with_remote(backend.clone());
        }
        Self {
            controller: AppController::new(collaborators, &ClientConfig::default()),
            backend,
            storage,
            alerts,
        }
    }

    /// The backend of an online app.
    ///
    /// # Panics
    ///
    /// Panics when the app is offline.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn backend(&self) -> &InMemoryBackend {
        self.backend.as_deref().expect("app is offline")
    }

    /// Messages of the visible notifications, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.controller
            .notifications()
            .snapshot()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }
}

/// A dish priced at `cents` hundredths.
#[must_use]
pub fn dish(id: &str, name: &str, cents: i64) -> Dish {
    Dish::new(id, name, Decimal::new(cents, 2))
}

/// Wait until `condition` holds, yielding to background tasks in between.
///
/// # Panics
///
/// Panics if the condition does not hold within one second.
#[allow(clippy::expect_used)]
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within one second");
}

/// Give spawned listeners a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
