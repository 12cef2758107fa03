//! The canonical current-user view.

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// Identifier of the synthetic offline administrator.
pub const LOCAL_ADMIN_ID: &str = "admin-local";

/// Display name of the synthetic offline administrator.
pub const LOCAL_ADMIN_NAME: &str = "Lawson Laure";

/// Phone placeholder of the synthetic offline administrator.
pub const LOCAL_ADMIN_PHONE: &str = "00000000";

/// Loyalty points shown for the offline administrator ("unlimited").
pub const LOCAL_ADMIN_POINTS: u32 = 9999;

/// The user the client currently acts for.
///
/// Every field has a defined value; absent remote data falls back to an
/// empty string or `None`, never to a partially built user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Option<Email>,
    pub phone: String,
    pub points: u32,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
}

impl CurrentUser {
    /// The fixed offline administrator identity.
    #[must_use]
    pub fn local_admin(email: Option<Email>, avatar_url: Option<String>) -> Self {
        Self {
            id: UserId::new(LOCAL_ADMIN_ID),
            name: LOCAL_ADMIN_NAME.to_owned(),
            email,
            phone: LOCAL_ADMIN_PHONE.to_owned(),
            points: LOCAL_ADMIN_POINTS,
            avatar_url,
            is_admin: true,
        }
    }

    /// Whether this is the synthetic offline administrator.
    #[must_use]
    pub fn is_local_admin(&self) -> bool {
        self.id.as_str() == LOCAL_ADMIN_ID
    }
}
