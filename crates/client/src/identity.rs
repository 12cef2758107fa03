//! Identity resolution.
//!
//! Three inputs decide who the current user is and whether they administer
//! the restaurant:
//!
//! 1. the remote session user, when signed in
//! 2. the sticky local override flag
//! 3. the locally stored avatar (only used without a remote session)
//!
//! [`resolve`] is the pure precedence rule. [`IdentityResolver`] owns the
//! resolved state and the operations that change its inputs.

use std::sync::Arc;

use digitrestau_core::{CurrentUser, Email, UserId};
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};

use crate::config::AdminConfig;
use crate::error::{add_breadcrumb, capture_failure, clear_sentry_user, set_sentry_user};
use crate::navigation::{Navigator, View};
use crate::notifications::NotificationQueue;
use crate::remote::{AuthEvent, AuthEventKind, RemoteBackend, RemoteUser, UserMetadataPatch};
use crate::storage::LocalAdminOverride;

/// Display name used when the profile has neither a name nor an email.
pub const FALLBACK_NAME: &str = "Utilisateur";

/// Loyalty points shown when the profile carries none.
pub const DEFAULT_POINTS: u32 = 120;

/// Loyalty points of an offline, non-administrator user.
pub const LOCAL_GUEST_POINTS: u32 = 50;

/// Display name of an offline, non-administrator user.
pub const LOCAL_GUEST_NAME: &str = "Client Local";

/// Outcome of identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: Option<CurrentUser>,
    pub is_admin: bool,
}

/// Resolve the current identity from its inputs.
///
/// Precedence: remote session, then local override, then anonymous.
#[must_use]
pub fn resolve(
    session: Option<&RemoteUser>,
    override_granted: bool,
    local_avatar: Option<&str>,
    admin: &AdminConfig,
) -> ResolvedIdentity {
    if let Some(remote) = session {
        let metadata = &remote.metadata;
        let is_admin = remote
            .email
            .as_ref()
            .is_some_and(|email| email.matches(&admin.reserved_email))
            || override_granted
            || metadata.is_admin;

        let name = metadata
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                remote
                    .email
                    .as_ref()
                    .map(|email| email.local_part().to_owned())
            })
            .unwrap_or_else(|| FALLBACK_NAME.to_owned());

        let user = CurrentUser {
            id: remote.id.clone(),
            name,
            email: remote.email.clone(),
            phone: metadata.phone.clone().unwrap_or_default(),
            points: metadata.points.unwrap_or(DEFAULT_POINTS),
            avatar_url: metadata.avatar_url.clone().filter(|url| !url.is_empty()),
            is_admin,
        };
        return ResolvedIdentity {
            user: Some(user),
            is_admin,
        };
    }

    if override_granted {
        return ResolvedIdentity {
            user: Some(local_admin(admin, local_avatar.map(str::to_owned))),
            is_admin: true,
        };
    }

    ResolvedIdentity::default()
}

fn local_admin(admin: &AdminConfig, avatar_url: Option<String>) -> CurrentUser {
    CurrentUser::local_admin(Email::parse(&admin.reserved_email).ok(), avatar_url)
}

/// Owner of the resolved identity.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct IdentityResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    state: Mutex<ResolvedIdentity>,
    local_override: LocalAdminOverride,
    remote: Option<Arc<dyn RemoteBackend>>,
    admin: AdminConfig,
    notifications: NotificationQueue,
    navigator: Navigator,
}

impl IdentityResolver {
    /// Create a resolver with no user. Call [`Self::initialize`] to resolve.
    pub fn new(
        local_override: LocalAdminOverride,
        remote: Option<Arc<dyn RemoteBackend>>,
        admin: AdminConfig,
        notifications: NotificationQueue,
        navigator: Navigator,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                state: Mutex::new(ResolvedIdentity::default()),
                local_override,
                remote,
                admin,
                notifications,
                navigator,
            }),
        }
    }

    /// The current user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.state.lock().user.clone()
    }

    /// The resolved administrator flag.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.state.lock().is_admin
    }

    #[must_use]
    pub fn identity(&self) -> ResolvedIdentity {
        self.inner.state.lock().clone()
    }

    /// Resolve from `session` and the stored override.
    pub fn initialize(&self, session: Option<&RemoteUser>) {
        let resolved = self.resolve_with(session);
        self.apply(resolved);
    }

    /// Fetch the session user and resolve. A failed fetch resolves as
    /// signed out so a sticky local administrator still appears.
    #[instrument(skip(self))]
    pub async fn refresh_from_remote(&self) {
        let session = match &self.inner.remote {
            Some(remote) => match remote.get_user().await {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch session user");
                    None
                }
            },
            None => None,
        };
        self.initialize(session.as_ref());
    }

    /// Sign in.
    ///
    /// Without a remote backend only the configured administrator pair is
    /// recognized; any other identifier signs in a temporary guest.
    #[instrument(skip(self, credential))]
    pub async fn login(&self, identifier: &str, credential: &str) {
        add_breadcrumb("auth", "Login attempt", None);

        let Some(remote) = self.inner.remote.clone() else {
            self.login_offline(identifier, credential);
            return;
        };

        match remote.sign_in(identifier, credential).await {
            Ok(user) => {
                let resolved = self.resolve_with(Some(&user));
                if resolved.is_admin {
                    self.grant_override();
                }
                let is_admin = resolved.is_admin;
                self.apply(resolved);
                self.inner.navigator.navigate(if is_admin {
                    View::AdminDashboard
                } else {
                    View::Home
                });
                info!(user_id = %user.id, is_admin, "Login succeeded");
                self.inner.notifications.success("Connexion réussie.");
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                let message = e
                    .user_message()
                    .map_or_else(|| "Identifiants incorrects.".to_owned(), str::to_owned);
                self.inner.notifications.error(message);
            }
        }
    }

    fn login_offline(&self, identifier: &str, credential: &str) {
        let admin = &self.inner.admin;
        if identifier == admin.local_identifier && credential == admin.local_password.expose_secret()
        {
            self.grant_override();
            let user = local_admin(admin, self.inner.local_override.avatar());
            self.apply(ResolvedIdentity {
                user: Some(user),
                is_admin: true,
            });
            self.inner.navigator.navigate(View::AdminDashboard);
            info!("Offline administrator login");
            self.inner.notifications.success("Mode Admin (Local) activé.");
            return;
        }

        let is_admin = self.inner.local_override.is_granted();
        let guest = CurrentUser {
            id: UserId::new(format!("u_{identifier}")),
            name: LOCAL_GUEST_NAME.to_owned(),
            email: None,
            phone: identifier.to_owned(),
            points: LOCAL_GUEST_POINTS,
            avatar_url: None,
            is_admin,
        };
        self.apply(ResolvedIdentity {
            user: Some(guest),
            is_admin,
        });
        self.inner.navigator.navigate(View::Home);
        info!("Offline guest login");
        self.inner.notifications.success("Bienvenue !");
    }

    /// Sign out everywhere. Always succeeds locally.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(remote) = &self.inner.remote
            && let Err(e) = remote.sign_out().await
        {
            warn!(error = %e, "Remote sign-out failed");
        }

        if let Err(e) = self.inner.local_override.revoke() {
            capture_failure("identity.revoke_override", &e);
        }
        self.apply(ResolvedIdentity::default());
        self.inner.navigator.navigate(View::Home);
        info!("Logged out");
        self.inner.notifications.info("Vous avez été déconnecté.");
    }

    /// Grant administrator status.
    ///
    /// Local state changes before any remote call and is never rolled back.
    /// A signed-in remote user is additionally marked administrator on the
    /// service, best effort.
    #[instrument(skip(self))]
    pub async fn elevate_to_admin(&self) {
        self.grant_override();
        let local_avatar = self.inner.local_override.avatar();
        let user = {
            let mut state = self.inner.state.lock();
            let user = match state.user.take() {
                None => local_admin(&self.inner.admin, local_avatar),
                Some(mut user) => {
                    if user.name.trim().is_empty() {
                        digitrestau_core::LOCAL_ADMIN_NAME.clone_into(&mut user.name);
                    }
                    if user.avatar_url.is_none() {
                        user.avatar_url = local_avatar;
                    }
                    user.is_admin = true;
                    user
                }
            };
            state.user = Some(user.clone());
            state.is_admin = true;
            user
        };
        self.inner.navigator.navigate(View::AdminDashboard);
        info!(user_id = %user.id, "Administrator access granted");
        self.inner.notifications.success("Accès Administrateur accordé !");

        if user.is_local_admin() {
            return;
        }
        let Some(remote) = self.inner.remote.clone() else {
            return;
        };

        let persisted = async {
            remote.update_user(&UserMetadataPatch::grant_admin()).await?;
            remote.refresh_session().await
        };
        match persisted.await {
            Ok(_) => {
                info!(user_id = %user.id, "Administrator status saved remotely");
                self.inner
                    .notifications
                    .success("Votre compte est maintenant Administrateur permanent sur le Cloud.");
            }
            Err(e) => {
                capture_failure("identity.elevate_remote", &e);
                self.inner
                    .notifications
                    .error("Impossible de sauvegarder le statut admin sur le cloud.");
            }
        }
    }

    /// Apply a remote authentication event.
    ///
    /// A sign-out clears the user but keeps the local override. A profile
    /// update can raise the administrator flag, never lower it.
    pub fn handle_auth_event(&self, event: &AuthEvent) {
        debug!(event = %event.kind, "Auth event");
        match (event.kind, event.user.as_ref()) {
            (AuthEventKind::SignedIn, Some(user)) => {
                let resolved = self.resolve_with(Some(user));
                self.apply(resolved);
            }
            (AuthEventKind::SignedOut, _) => {
                self.apply(ResolvedIdentity::default());
                self.inner.navigator.navigate(View::Home);
            }
            (AuthEventKind::UserUpdated, Some(user)) => {
                let mut resolved = self.resolve_with(Some(user));
                let is_admin = self.is_admin() || resolved.is_admin;
                resolved.is_admin = is_admin;
                if let Some(user) = resolved.user.as_mut() {
                    user.is_admin = is_admin;
                }
                self.apply(resolved);
            }
            (AuthEventKind::TokenRefreshed, _)
            | (AuthEventKind::SignedIn | AuthEventKind::UserUpdated, None) => {}
        }
    }

    /// Store the local administrator's avatar and show it right away when
    /// the local administrator is the current user.
    pub fn set_local_avatar(&self, avatar_url: &str) {
        if let Err(e) = self.inner.local_override.set_avatar(avatar_url) {
            capture_failure("identity.set_avatar", &e);
            return;
        }
        let mut state = self.inner.state.lock();
        if let Some(user) = state.user.as_mut().filter(|u| u.is_local_admin()) {
            user.avatar_url = Some(avatar_url.to_owned());
        }
    }

    fn resolve_with(&self, session: Option<&RemoteUser>) -> ResolvedIdentity {
        let local_override = &self.inner.local_override;
        resolve(
            session,
            local_override.is_granted(),
            local_override.avatar().as_deref(),
            &self.inner.admin,
        )
    }

    fn grant_override(&self) {
        if let Err(e) = self.inner.local_override.grant() {
            capture_failure("identity.grant_override", &e);
        }
    }

    fn apply(&self, resolved: ResolvedIdentity) {
        match &resolved.user {
            Some(user) => set_sentry_user(&user.id, user.email.as_ref().map(Email::as_str)),
            None => clear_sentry_user(),
        }
        *self.inner.state.lock() = resolved;
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("IdentityResolver")
            .field("user", &state.user.as_ref().map(|u| u.id.as_str()))
            .field("is_admin", &state.is_admin)
            .field("online", &self.inner.remote.is_some())
            .finish_non_exhaustive()
    }
}
