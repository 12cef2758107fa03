//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Remote backend (optional)
//! - `SUPABASE_URL` - Project URL (e.g., `https://abcd.supabase.co`). When
//!   unset the client runs in degraded local mode with no remote backend.
//! - `SUPABASE_ANON_KEY` - Public anon key (required when `SUPABASE_URL` is set)
//!
//! ## Optional
//! - `DIGITRESTAU_STORAGE_PATH` - Local storage file (default: `digitrestau-storage.json`)
//! - `DIGITRESTAU_ADMIN_EMAIL` - Reserved administrator address (default: `admin@digitrestau.com`)
//! - `DIGITRESTAU_LOCAL_ADMIN_PASSWORD` - Offline administrator credential (default: `admin123`)
//! - `DIGITRESTAU_NOTIFICATION_TTL_MS` - Notification lifetime (default: 4000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use digitrestau_core::Email;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default reserved administrator address.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@digitrestau.com";

/// Default offline administrator credential.
pub const DEFAULT_LOCAL_ADMIN_PASSWORD: &str = "admin123";

/// Default notification time-to-live.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(4000);

const DEFAULT_STORAGE_PATH: &str = "digitrestau-storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote backend; `None` means degraded local mode.
    pub supabase: Option<SupabaseConfig>,
    /// Path of the local durable storage file
    pub storage_path: PathBuf,
    /// Administrator identity and offline credential
    pub admin: AdminConfig,
    /// Lifetime of each user notification
    pub notification_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the anon key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL
    pub url: Url,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Administrator identity settings.
#[derive(Clone)]
pub struct AdminConfig {
    /// Signing in with this address always grants administrator status.
    /// Validated as an email when loaded from the environment.
    pub reserved_email: String,
    /// Identifier accepted by the offline login (the reserved address).
    pub local_identifier: String,
    /// Credential accepted by the offline login.
    pub local_password: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("reserved_email", &self.reserved_email)
            .field("local_identifier", &self.local_identifier)
            .field("local_password", &"[REDACTED]")
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            reserved_email: DEFAULT_ADMIN_EMAIL.to_owned(),
            local_identifier: DEFAULT_ADMIN_EMAIL.to_owned(),
            local_password: SecretString::from(DEFAULT_LOCAL_ADMIN_PASSWORD),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            admin: AdminConfig::default(),
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if
    /// `SUPABASE_URL` is set without `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let supabase = SupabaseConfig::from_env()?;
        let storage_path =
            PathBuf::from(get_env_or_default("DIGITRESTAU_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let admin = AdminConfig::from_env()?;
        let notification_ttl = match get_optional_env("DIGITRESTAU_NOTIFICATION_TTL_MS") {
            Some(raw) => Duration::from_millis(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "DIGITRESTAU_NOTIFICATION_TTL_MS".to_string(),
                    e.to_string(),
                )
            })?),
            None => DEFAULT_NOTIFICATION_TTL,
        };

        Ok(Self {
            supabase,
            storage_path,
            admin,
            notification_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = get_optional_env("SUPABASE_URL") else {
            return Ok(None);
        };
        let url = parse_project_url(&raw_url)?;
        let anon_key = SecretString::from(get_required_env("SUPABASE_ANON_KEY")?);
        Ok(Some(Self { url, anon_key }))
    }
}

impl AdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_email = get_env_or_default("DIGITRESTAU_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL);
        let reserved_email = Email::parse(&raw_email)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("DIGITRESTAU_ADMIN_EMAIL".to_string(), e.to_string())
            })?
            .as_str()
            .to_owned();
        let local_password = SecretString::from(get_env_or_default(
            "DIGITRESTAU_LOCAL_ADMIN_PASSWORD",
            DEFAULT_LOCAL_ADMIN_PASSWORD,
        ));
        Ok(Self {
            local_identifier: reserved_email.clone(),
            reserved_email,
            local_password,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and normalize the Supabase project URL.
fn parse_project_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SUPABASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "SUPABASE_URL".to_string(),
            "URL must have a host".to_string(),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_project_url() {
        let url = parse_project_url("https://abcd.supabase.co").unwrap();
        assert_eq!(url.host_str(), Some("abcd.supabase.co"));
    }

    #[test]
    fn test_parse_project_url_rejects_other_schemes() {
        let err = parse_project_url("ftp://abcd.supabase.co").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_project_url_rejects_garbage() {
        assert!(parse_project_url("not a url").is_err());
    }

    #[test]
    fn test_default_config_is_offline() {
        let config = ClientConfig::default();
        assert!(config.supabase.is_none());
        assert_eq!(config.notification_ttl, Duration::from_millis(4000));
        assert_eq!(config.admin.reserved_email, "admin@digitrestau.com");
        assert_eq!(config.admin.local_password.expose_secret(), "admin123");
    }

    #[test]
    fn test_supabase_config_debug_redacts_key() {
        let config = SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: SecretString::from("super-secret-anon-key"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("abcd.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-anon-key"));
    }

    #[test]
    fn test_admin_config_debug_redacts_password() {
        let debug_output = format!("{:?}", AdminConfig::default());
        assert!(!debug_output.contains("admin123"));
    }
}
