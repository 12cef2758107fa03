//! Remote data service seams.
//!
//! The engine never talks to a concrete backend. It receives an
//! `Arc<dyn RemoteBackend>` at construction, which keeps the reconciliation
//! logic testable against the in-memory backend and lets the application
//! run with no backend at all (degraded local mode).
//!
//! # Contracts
//!
//! - [`CatalogService`] - CRUD accessors for dishes, orders, boxes, settings
//! - [`AuthService`] - password sign-in, sign-out, current user, metadata update
//! - [`RealtimeSource`] - push channels for auth and order-table changes

mod events;
mod user;

use async_trait::async_trait;
use digitrestau_core::{Dish, MealBox, Order, Settings};
use thiserror::Error;
use tokio::sync::broadcast;

pub use events::{AuthEvent, AuthEventKind, ChangeKind, TableChange};
pub use user::{RemoteUser, UserMetadata, UserMetadataPatch};

/// Errors that can occur when talking to the remote data service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service rejected the request.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication was refused; the message comes from the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The operation requires a signed-in session.
    #[error("no active session")]
    NotSignedIn,

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Message suitable for showing to the user, when the service supplied one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Auth(message) | Self::Api { message, .. } if !message.is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Catalog persistence.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_dishes(&self) -> Result<Vec<Dish>, RemoteError>;

    /// Upsert the given dishes. Dishes not in `dishes` are left untouched.
    async fn save_dishes(&self, dishes: &[Dish]) -> Result<(), RemoteError>;

    async fn get_orders(&self) -> Result<Vec<Order>, RemoteError>;

    /// Upsert the given orders.
    async fn save_orders(&self, orders: &[Order]) -> Result<(), RemoteError>;

    async fn create_order(&self, order: &Order) -> Result<(), RemoteError>;

    async fn get_boxes(&self) -> Result<Vec<MealBox>, RemoteError>;

    async fn save_boxes(&self, boxes: &[MealBox]) -> Result<(), RemoteError>;

    async fn get_settings(&self) -> Result<Settings, RemoteError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), RemoteError>;
}

/// Authentication.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Sign in with an email (or phone) and password.
    async fn sign_in(&self, identifier: &str, credential: &str) -> Result<RemoteUser, RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;

    /// The user of the current session, if any.
    async fn get_user(&self) -> Result<Option<RemoteUser>, RemoteError>;

    /// Merge `patch` into the signed-in user's metadata.
    async fn update_user(&self, patch: &UserMetadataPatch) -> Result<RemoteUser, RemoteError>;

    /// Exchange the refresh token for a new session.
    async fn refresh_session(&self) -> Result<Option<RemoteUser>, RemoteError>;
}

/// Push channels.
///
/// Each call returns a fresh receiver; events published before the call are
/// not replayed.
pub trait RealtimeSource: Send + Sync {
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    fn order_changes(&self) -> broadcast::Receiver<TableChange>;
}

/// Everything the engine needs from a backend.
pub trait RemoteBackend: CatalogService + AuthService + RealtimeSource {}

impl<T: CatalogService + AuthService + RealtimeSource> RemoteBackend for T {}
