//! DigitRestau Client - Session and state reconciliation engine.
//!
//! The engine behind every DigitRestau front end. It decides who the
//! current user is, keeps the catalog in sync with the remote data service,
//! owns the shopping cart and surfaces the outcome of every operation as a
//! short-lived notification.
//!
//! # Architecture
//!
//! [`AppController`] is the single entry point. It owns:
//!
//! - [`IdentityResolver`] - merges the remote session with the sticky local
//!   administrator override
//! - [`CatalogSync`] - dishes, orders, boxes and settings with optimistic saves
//! - [`CartStore`] - the cart, mirrored to local storage after every change
//! - [`NotificationQueue`] - self-expiring user notifications
//! - [`RealtimeBridge`] - listeners for pushed auth and order changes
//!
//! The remote service sits behind the [`remote::RemoteBackend`] trait.
//! [`supabase::SupabaseClient`] implements it over HTTP and websockets; with
//! no backend configured the client runs in degraded local mode.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod alerts;
pub mod bridge;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod ids;
pub mod navigation;
pub mod notifications;
pub mod remote;
pub mod storage;
pub mod supabase;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use alerts::{AlertError, AlertPlayer, AlertSound, SilentAlerts};
pub use bridge::RealtimeBridge;
pub use cart::CartStore;
pub use catalog::CatalogSync;
pub use config::{AdminConfig, ClientConfig, ConfigError, SupabaseConfig};
pub use controller::{AppController, AppSnapshot, CheckoutDetails, Collaborators};
pub use error::ClientError;
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use navigation::{Navigator, View};
pub use notifications::{Notification, NotificationQueue, Severity};
pub use storage::{FileStorage, LocalAdminOverride, LocalStorage, MemoryStorage, StorageError};
