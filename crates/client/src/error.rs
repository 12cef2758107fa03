//! Unified error handling with Sentry integration.
//!
//! Core operations never hand errors to the view layer: they terminate them
//! at the notification boundary. This module provides the typed umbrella
//! error used by fallible setup code, plus the Sentry helpers the boundary
//! uses to record what was swallowed.

use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote data service failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Report a swallowed failure to Sentry and the log.
///
/// `operation` names the core operation whose notification boundary
/// absorbed the error.
pub fn capture_failure(operation: &str, error: &(dyn std::error::Error + 'static)) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        operation,
        error = %error,
        sentry_event_id = %event_id,
        "Operation failed"
    );
}

/// Set the Sentry user context.
///
/// Call this after the identity resolver settles on a user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout or remote sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added dish", Some(&[("dish_id", "d12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
