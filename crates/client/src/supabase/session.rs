//! `GoTrue` session handling.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::SESSION_KEY;
use crate::remote::RemoteUser;
use crate::storage::{LocalStorage, StorageError};

/// Body of a successful `/token` grant.
#[derive(Deserialize)]
pub(super) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    pub(super) user: RemoteUser,
}

/// The active session.
pub(super) struct Session {
    pub(super) access_token: SecretString,
    pub(super) refresh_token: SecretString,
    /// Unknown until fetched when the session was restored from storage.
    pub(super) user: Option<RemoteUser>,
}

impl Session {
    pub(super) fn from_tokens(tokens: StoredTokens) -> Self {
        Self {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: SecretString::from(tokens.refresh_token),
            user: None,
        }
    }

    pub(super) fn tokens(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token.expose_secret().to_owned(),
            refresh_token: self.refresh_token.expose_secret().to_owned(),
        }
    }
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: SecretString::from(token.refresh_token),
            user: Some(token.user),
        }
    }
}

/// Tokens as persisted between runs.
#[derive(Serialize, Deserialize)]
pub(super) struct StoredTokens {
    access_token: String,
    refresh_token: String,
}

impl StoredTokens {
    pub(super) fn load(store: &dyn LocalStorage) -> Option<Self> {
        let raw = match store.get_item(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
        }
    }

    pub(super) fn save(&self, store: &dyn LocalStorage) -> Result<(), StorageError> {
        let json = serde_json::to_string(self).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        store.set_item(SESSION_KEY, &json)
    }

    pub(super) fn clear(store: &dyn LocalStorage) -> Result<(), StorageError> {
        store.remove_item(SESSION_KEY)
    }
}

/// Extract the human-readable message from a `GoTrue` or `PostgREST` error body.
pub(super) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.chars().take(200).collect();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map_or_else(|| body.chars().take(200).collect(), str::to_owned)
}
