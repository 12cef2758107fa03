//! Supabase implementation of the remote backend.
//!
//! # APIs
//!
//! ## `PostgREST` (`/rest/v1`)
//! - Tables `dishes`, `orders`, `boxes` hold one row per entity, columns
//!   named after the camelCase entity fields
//! - Table `settings` holds a single row with `id = 1`
//! - Saves are upserts (`Prefer: resolution=merge-duplicates`)
//!
//! ## `GoTrue` (`/auth/v1`)
//! - Password and refresh-token grants on `/token`
//! - `/user` for reading and updating the signed-in user
//! - `/logout` to revoke the session
//!
//! ## Realtime (`/realtime/v1/websocket`)
//! - See [`RealtimeChannel`]
//!
//! Every successful auth call publishes an [`AuthEvent`] the way the browser
//! SDK does, so the engine observes its own sign-ins through the same
//! channel as sign-ins from elsewhere.

mod realtime;
mod session;

use std::sync::Arc;

use async_trait::async_trait;
use digitrestau_core::{Dish, MealBox, Order, Settings};
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

pub use realtime::{RealtimeChannel, RealtimeError};

use crate::config::SupabaseConfig;
use crate::remote::{
    AuthEvent, AuthService, CatalogService, RealtimeSource, RemoteError, RemoteUser, TableChange,
    UserMetadataPatch,
};
use crate::storage::LocalStorage;
use session::{Session, StoredTokens, TokenResponse, error_message};

/// Key under which the session tokens are persisted between runs.
pub const SESSION_KEY: &str = "digitrestau-auth-token";

const SETTINGS_ROW_ID: i64 = 1;
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// SupabaseClient
// =============================================================================

/// Client for a Supabase project.
///
/// Cheap to clone; clones share the session and the event channels.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
    session_store: Option<Arc<dyn LocalStorage>>,
    auth_tx: broadcast::Sender<AuthEvent>,
    order_tx: broadcast::Sender<TableChange>,
}

impl SupabaseClient {
    /// Create a client with an in-memory session only.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a client that persists its session tokens in `store`.
    ///
    /// Tokens found in the store are restored; the user behind them is
    /// fetched lazily by [`AuthService::get_user`].
    #[must_use]
    pub fn with_session_store(config: &SupabaseConfig, store: Arc<dyn LocalStorage>) -> Self {
        Self::build(config, Some(store))
    }

    fn build(config: &SupabaseConfig, session_store: Option<Arc<dyn LocalStorage>>) -> Self {
        let (auth_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (order_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let session = session_store
            .as_deref()
            .and_then(StoredTokens::load)
            .map(Session::from_tokens);

        Self {
            inner: Arc::new(SupabaseClientInner {
                http: reqwest::Client::new(),
                base_url: config.url.as_str().trim_end_matches('/').to_owned(),
                anon_key: config.anon_key.clone(),
                session: RwLock::new(session),
                session_store,
                auth_tx,
                order_tx,
            }),
        }
    }

    /// Open the realtime channel for the `orders` table.
    ///
    /// Changes are republished on [`RealtimeSource::order_changes`]. The
    /// channel closes when the returned handle is dropped.
    #[must_use]
    pub fn subscribe_orders(&self) -> RealtimeChannel {
        RealtimeChannel::spawn(
            &self.inner.base_url,
            self.inner.anon_key.clone(),
            self.inner.order_tx.clone(),
        )
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.inner.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    /// Headers for a request: the anon key, and the session token when signed in.
    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let anon_key = self.inner.anon_key.expose_secret();
        let bearer = self
            .inner
            .session
            .read()
            .as_ref()
            .map_or_else(|| anon_key.to_owned(), |s| s.access_token.expose_secret().to_owned());

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {bearer}"))?);
        Ok(headers)
    }

    /// Turn a non-success response into a `RemoteError`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Supabase returned non-success status"
        );
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, RemoteError> {
        let response = self
            .inner
            .http
            .get(self.rest_url(table))
            .headers(self.headers()?)
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await?;
        let text = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn upsert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<(), RemoteError> {
        let response = self
            .inner
            .http
            .post(self.rest_url(table))
            .headers(self.headers()?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Run a token grant and install the resulting session.
    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<RemoteUser, RemoteError> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .header("apikey", self.inner.anon_key.expose_secret())
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = error_message(&text);
            warn!(status = %status, message = %message, grant_type, "Token grant refused");
            return Err(if status.is_client_error() {
                RemoteError::Auth(message)
            } else {
                RemoteError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        let user = token.user.clone();
        self.install_session(Some(Session::from(token)));
        Ok(user)
    }

    fn install_session(&self, session: Option<Session>) {
        if let Some(store) = &self.inner.session_store {
            let result = match &session {
                Some(session) => session.tokens().save(store.as_ref()),
                None => StoredTokens::clear(store.as_ref()),
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist auth session");
            }
        }
        *self.inner.session.write() = session;
    }

    fn publish(&self, event: AuthEvent) {
        debug!(event = %event.kind, "Publishing auth event");
        // No receivers is fine
        let _ = self.inner.auth_tx.send(event);
    }

    fn access_token(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .as_ref()
            .map(|s| s.access_token.expose_secret().to_owned())
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url)
            .field("signed_in", &self.inner.session.read().is_some())
            .finish_non_exhaustive()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, RemoteError> {
    HeaderValue::from_str(value).map_err(|e| RemoteError::Api {
        status: 0,
        message: format!("invalid header value: {e}"),
    })
}

// =============================================================================
// CatalogService
// =============================================================================

#[async_trait]
impl CatalogService for SupabaseClient {
    #[instrument(skip(self))]
    async fn get_dishes(&self) -> Result<Vec<Dish>, RemoteError> {
        self.select("dishes", &[]).await
    }

    #[instrument(skip(self, dishes), fields(count = dishes.len()))]
    async fn save_dishes(&self, dishes: &[Dish]) -> Result<(), RemoteError> {
        self.upsert("dishes", dishes).await
    }

    #[instrument(skip(self))]
    async fn get_orders(&self) -> Result<Vec<Order>, RemoteError> {
        self.select("orders", &[("order", "date.desc")]).await
    }

    #[instrument(skip(self, orders), fields(count = orders.len()))]
    async fn save_orders(&self, orders: &[Order]) -> Result<(), RemoteError> {
        self.upsert("orders", orders).await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_order(&self, order: &Order) -> Result<(), RemoteError> {
        let response = self
            .inner
            .http
            .post(self.rest_url("orders"))
            .headers(self.headers()?)
            .header("Prefer", "return=minimal")
            .json(order)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_boxes(&self) -> Result<Vec<MealBox>, RemoteError> {
        self.select("boxes", &[]).await
    }

    #[instrument(skip(self, boxes), fields(count = boxes.len()))]
    async fn save_boxes(&self, boxes: &[MealBox]) -> Result<(), RemoteError> {
        self.upsert("boxes", boxes).await
    }

    #[instrument(skip(self))]
    async fn get_settings(&self) -> Result<Settings, RemoteError> {
        let row_id = format!("eq.{SETTINGS_ROW_ID}");
        let rows: Vec<Settings> = self.select("settings", &[("id", row_id.as_str())]).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    #[instrument(skip(self, settings))]
    async fn save_settings(&self, settings: &Settings) -> Result<(), RemoteError> {
        let mut row = serde_json::to_value(settings)?;
        if let Some(fields) = row.as_object_mut() {
            fields.insert("id".to_owned(), SETTINGS_ROW_ID.into());
        }
        self.upsert("settings", &row).await
    }
}

// =============================================================================
// AuthService
// =============================================================================

#[async_trait]
impl AuthService for SupabaseClient {
    #[instrument(skip(self, credential))]
    async fn sign_in(&self, identifier: &str, credential: &str) -> Result<RemoteUser, RemoteError> {
        let field = if identifier.contains('@') { "email" } else { "phone" };
        let body = serde_json::json!({ field: identifier.trim(), "password": credential });
        let user = self.grant("password", body).await?;
        tracing::info!(user_id = %user.id, "Signed in");
        self.publish(AuthEvent::signed_in(user.clone()));
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), RemoteError> {
        let token = self.access_token();
        // The local session ends even if revocation fails.
        self.install_session(None);
        self.publish(AuthEvent::signed_out());

        let Some(token) = token else {
            return Ok(());
        };
        let response = self
            .inner
            .http
            .post(self.auth_url("logout"))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self) -> Result<Option<RemoteUser>, RemoteError> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };

        let response = self
            .inner
            .http
            .get(self.auth_url("user"))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("Access token rejected, trying refresh");
            return self.refresh_session().await;
        }

        let user: RemoteUser = Self::check(response).await?.json().await?;
        if let Some(session) = self.inner.session.write().as_mut() {
            session.user = Some(user.clone());
        }
        Ok(Some(user))
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, patch: &UserMetadataPatch) -> Result<RemoteUser, RemoteError> {
        let token = self.access_token().ok_or(RemoteError::NotSignedIn)?;
        let response = self
            .inner
            .http
            .put(self.auth_url("user"))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
            .json(&serde_json::json!({ "data": patch }))
            .send()
            .await?;

        let user: RemoteUser = Self::check(response).await?.json().await?;
        if let Some(session) = self.inner.session.write().as_mut() {
            session.user = Some(user.clone());
        }
        self.publish(AuthEvent::user_updated(user.clone()));
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<Option<RemoteUser>, RemoteError> {
        let refresh_token = self
            .inner
            .session
            .read()
            .as_ref()
            .map(|s| s.refresh_token.expose_secret().to_owned());
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        match self
            .grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(user) => {
                self.publish(AuthEvent::token_refreshed(user.clone()));
                Ok(Some(user))
            }
            Err(RemoteError::Auth(message)) => {
                // Refresh token revoked or expired: the session is gone.
                warn!(message = %message, "Session refresh refused");
                self.install_session(None);
                self.publish(AuthEvent::signed_out());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// RealtimeSource
// =============================================================================

impl RealtimeSource for SupabaseClient {
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth_tx.subscribe()
    }

    fn order_changes(&self) -> broadcast::Receiver<TableChange> {
        self.inner.order_tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::storage::MemoryStorage;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co/").unwrap(),
            anon_key: SecretString::from("anon-key"),
        }
    }

    #[test]
    fn test_urls() {
        let client = SupabaseClient::new(&config());
        assert_eq!(client.rest_url("dishes"), "https://abcd.supabase.co/rest/v1/dishes");
        assert_eq!(client.auth_url("token"), "https://abcd.supabase.co/auth/v1/token");
    }

    #[test]
    fn test_anonymous_headers_use_anon_key() {
        let client = SupabaseClient::new(&config());
        let headers = client.headers().unwrap();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon-key");
    }

    #[test]
    fn test_restores_persisted_tokens() {
        let store = Arc::new(MemoryStorage::new());
        store
            .set_item(
                SESSION_KEY,
                r#"{"access_token":"at-1","refresh_token":"rt-1"}"#,
            )
            .unwrap();

        let client = SupabaseClient::with_session_store(&config(), store);
        assert_eq!(client.access_token().as_deref(), Some("at-1"));
        let headers = client.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer at-1");
    }

    #[test]
    fn test_clearing_session_clears_store() {
        let store = Arc::new(MemoryStorage::new());
        store
            .set_item(SESSION_KEY, r#"{"access_token":"a","refresh_token":"r"}"#)
            .unwrap();
        let client = SupabaseClient::with_session_store(&config(), store.clone());

        client.install_session(None);
        assert!(client.access_token().is_none());
        assert_eq!(store.get_item(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_signed_out_client_has_no_user() {
        let client = SupabaseClient::new(&config());
        assert!(client.get_user().await.unwrap().is_none());
        assert!(client.refresh_session().await.unwrap().is_none());
        assert!(matches!(
            client.update_user(&UserMetadataPatch::grant_admin()).await,
            Err(RemoteError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_publishes_event() {
        let client = SupabaseClient::new(&config());
        let mut events = client.auth_events();
        client.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), AuthEvent::signed_out());
    }
}
