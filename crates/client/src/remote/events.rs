//! Push events delivered by a [`RealtimeSource`](super::RealtimeSource).

use serde::{Deserialize, Serialize};

use super::RemoteUser;

/// Kind of authentication state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
}

impl AuthEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::UserUpdated => "USER_UPDATED",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
        }
    }
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication state change and the session user after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// `None` after sign-out.
    pub user: Option<RemoteUser>,
}

impl AuthEvent {
    #[must_use]
    pub const fn signed_in(user: RemoteUser) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            user: Some(user),
        }
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            user: None,
        }
    }

    #[must_use]
    pub const fn user_updated(user: RemoteUser) -> Self {
        Self {
            kind: AuthEventKind::UserUpdated,
            user: Some(user),
        }
    }

    #[must_use]
    pub const fn token_refreshed(user: RemoteUser) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            user: Some(user),
        }
    }
}

/// Row-level change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change to a watched table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableChange {
    pub event_type: ChangeKind,
    pub table: String,
}

impl TableChange {
    pub fn new(event_type: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            event_type,
            table: table.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_wire_names() {
        let change: TableChange =
            serde_json::from_str(r#"{"eventType":"INSERT","table":"orders"}"#).unwrap();
        assert_eq!(change, TableChange::new(ChangeKind::Insert, "orders"));
    }

    #[test]
    fn test_auth_event_kind_display() {
        assert_eq!(AuthEventKind::SignedOut.to_string(), "SIGNED_OUT");
        assert_eq!(AuthEvent::signed_out().user, None);
    }
}
