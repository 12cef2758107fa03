//! Remote user profile types.
//!
//! The remote service attaches an arbitrary metadata bag to each user. Only
//! the fields below are read; each has an explicit fallback so a malformed
//! bag never yields a partially built user.

use digitrestau_core::{Email, UserId};
use serde::{Deserialize, Deserializer, Serialize};

/// A user as returned by the remote auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: UserId,
    /// Absent for phone-only accounts or unparseable addresses.
    #[serde(default, deserialize_with = "lenient_email")]
    pub email: Option<Email>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
}

impl RemoteUser {
    /// Build a user with empty metadata.
    pub fn new(id: impl Into<UserId>, email: Option<Email>) -> Self {
        Self {
            id: id.into(),
            email,
            metadata: UserMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: UserMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Typed view of the user metadata bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserMetadata {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    /// Only a literal JSON `true` grants administrator status.
    #[serde(deserialize_with = "strict_true")]
    pub is_admin: bool,
    #[serde(deserialize_with = "lenient_points")]
    pub points: Option<u32>,
}

/// Partial metadata update; unset fields are left unchanged remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl UserMetadataPatch {
    /// Patch that marks the user as a permanent administrator.
    #[must_use]
    pub fn grant_admin() -> Self {
        Self {
            is_admin: Some(true),
            ..Self::default()
        }
    }

    /// Merge the set fields into `metadata`, as the service does.
    pub fn apply_to(&self, metadata: &mut UserMetadata) {
        if let Some(name) = &self.name {
            metadata.name = Some(name.clone());
        }
        if let Some(phone) = &self.phone {
            metadata.phone = Some(phone.clone());
        }
        if let Some(avatar_url) = &self.avatar_url {
            metadata.avatar_url = Some(avatar_url.clone());
        }
        if let Some(is_admin) = self.is_admin {
            metadata.is_admin = is_admin;
        }
    }
}

fn lenient_email<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Email>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| Email::parse(&s).ok()))
}

fn strict_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value == serde_json::Value::Bool(true))
}

fn lenient_points<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().and_then(|n| u32::try_from(n).ok()))
}
