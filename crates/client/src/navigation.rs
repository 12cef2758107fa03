//! Current page tracking.
//!
//! Layout and rendering live in the view layer; the engine only records
//! which page should be shown, because login, logout and elevation move the
//! user between the storefront and the back office.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A page of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    Home,
    Menu,
    Cart,
    Traiteur,
    Boxs,
    Commande,
    Compte,
    Contact,
    AdminDashboard,
    AdminPlats,
    AdminPanier,
    AdminTraiteur,
    AdminBoxs,
    AdminCommandes,
    AdminCompte,
    AdminContact,
    AdminParametres,
    AdminMarketing,
    AdminAi,
}

impl View {
    pub const ALL: [Self; 19] = [
        Self::Home,
        Self::Menu,
        Self::Cart,
        Self::Traiteur,
        Self::Boxs,
        Self::Commande,
        Self::Compte,
        Self::Contact,
        Self::AdminDashboard,
        Self::AdminPlats,
        Self::AdminPanier,
        Self::AdminTraiteur,
        Self::AdminBoxs,
        Self::AdminCommandes,
        Self::AdminCompte,
        Self::AdminContact,
        Self::AdminParametres,
        Self::AdminMarketing,
        Self::AdminAi,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Menu => "menu",
            Self::Cart => "cart",
            Self::Traiteur => "traiteur",
            Self::Boxs => "boxs",
            Self::Commande => "commande",
            Self::Compte => "compte",
            Self::Contact => "contact",
            Self::AdminDashboard => "admin-dashboard",
            Self::AdminPlats => "admin-plats",
            Self::AdminPanier => "admin-panier",
            Self::AdminTraiteur => "admin-traiteur",
            Self::AdminBoxs => "admin-boxs",
            Self::AdminCommandes => "admin-commandes",
            Self::AdminCompte => "admin-compte",
            Self::AdminContact => "admin-contact",
            Self::AdminParametres => "admin-parametres",
            Self::AdminMarketing => "admin-marketing",
            Self::AdminAi => "admin-ai",
        }
    }

    /// Whether the page belongs to the back office.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Self::AdminDashboard
                | Self::AdminPlats
                | Self::AdminPanier
                | Self::AdminTraiteur
                | Self::AdminBoxs
                | Self::AdminCommandes
                | Self::AdminCompte
                | Self::AdminContact
                | Self::AdminParametres
                | Self::AdminMarketing
                | Self::AdminAi
        )
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown page: {0}")]
pub struct UnknownView(String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_owned()))
    }
}

/// Shared handle to the current page.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Arc<Mutex<View>>,
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigate(&self, view: View) {
        let mut current = self.current.lock();
        if *current != view {
            debug!(from = %*current, to = %view, "Navigate");
            *current = view;
        }
    }

    #[must_use]
    pub fn current(&self) -> View {
        *self.current.lock()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_names_round_trip() {
        for view in View::ALL {
            assert_eq!(view.as_str().parse::<View>().unwrap(), view);
        }
        assert!("admin-unknown".parse::<View>().is_err());
    }

    #[test]
    fn test_admin_pages() {
        assert!(View::AdminDashboard.is_admin());
        assert!(View::AdminAi.is_admin());
        assert!(!View::Compte.is_admin());
    }

    #[test]
    fn test_navigator_is_shared() {
        let navigator = Navigator::new();
        let other = navigator.clone();
        assert_eq!(navigator.current(), View::Home);
        other.navigate(View::Menu);
        assert_eq!(navigator.current(), View::Menu);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&View::AdminParametres).unwrap(),
            "\"admin-parametres\""
        );
    }
}
