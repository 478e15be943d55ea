//! Application settings for the appforge framework.
//!
//! [`Settings`] holds everything the security layer needs to run: the signing
//! secret, the configured authentication type, the email-protection switch for
//! password resets, and per-backend configuration blocks (LDAP, OpenID,
//! OAuth). Settings can be built in code or loaded from a TOML file.
//!
//! [`LazySettings`] provides a process-wide, configure-once access point,
//! backed by `std::sync::OnceLock`.

use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::ForgeError;

/// The authentication strategy the application is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Username/password against the user store.
    Db,
    /// Username/password bound against an LDAP directory.
    Ldap,
    /// OpenID identity URL, matched by email.
    Oid,
    /// OAuth provider login with signed state round-trip.
    Oauth,
    /// Reverse-proxy supplied `REMOTE_USER` identity.
    RemoteUser,
}

/// Configuration for an LDAP directory connection.
#[derive(Debug, Clone, Deserialize)]
pub struct LdapSettings {
    /// The directory server URI (e.g. `ldap://ldap.example.com`).
    pub server: String,
    /// Template used to build the bind DN from a username,
    /// with `{username}` as the placeholder.
    pub bind_dn_template: String,
    /// Search base for user lookups.
    #[serde(default)]
    pub search_base: String,
}

/// Configuration for a single OAuth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProviderSettings {
    /// The provider name used in URLs (e.g. "github").
    pub name: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// The provider's authorize endpoint.
    pub authorize_url: String,
    /// The provider's token endpoint.
    pub token_url: String,
    /// Email patterns (regexes) allowed to log in through this provider.
    /// Empty means no allow-list is enforced.
    #[serde(default)]
    pub email_allow_list: Vec<String>,
}

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Secret key used for signing OAuth state tokens.
    pub secret_key: String,
    /// Debug mode switches logging to a pretty human format.
    #[serde(default)]
    pub debug: bool,
    /// Log filter directive (e.g. "info", "appforge=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// The configured authentication strategy.
    #[serde(default = "default_auth_type")]
    pub auth_type: AuthType,
    /// Whether password resets require the emailed confirmation round-trip.
    #[serde(default = "default_true")]
    pub email_protection: bool,
    /// Lifetime of a password-reset hash in seconds.
    #[serde(default = "default_reset_lifetime")]
    pub reset_hash_lifetime_secs: u64,
    /// Whether unknown users are auto-registered on first LDAP/OAuth/remote
    /// login.
    #[serde(default)]
    pub auth_user_registration: bool,
    /// Role assigned to auto-registered users.
    #[serde(default = "default_registration_role")]
    pub auth_user_registration_role: String,
    /// URL of the application index page.
    #[serde(default = "default_index_url")]
    pub index_url: String,
    /// URL of the login page.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Hosts that `next` redirect targets may point at. Relative targets are
    /// always allowed; absolute ones must match a listed host.
    #[serde(default)]
    pub allowed_redirect_hosts: Vec<String>,
    /// LDAP configuration, required when `auth_type` is `ldap`.
    #[serde(default)]
    pub ldap: Option<LdapSettings>,
    /// Known OpenID providers, shown on the OID login form.
    #[serde(default)]
    pub openid_providers: Vec<String>,
    /// OAuth provider configurations.
    #[serde(default)]
    pub oauth_providers: Vec<OAuthProviderSettings>,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_auth_type() -> AuthType {
    AuthType::Db
}

const fn default_true() -> bool {
    true
}

const fn default_reset_lifetime() -> u64 {
    86_400 // 24 hours
}

fn default_registration_role() -> String {
    "Public".to_string()
}

fn default_index_url() -> String {
    "/".to_string()
}

fn default_login_url() -> String {
    "/login/".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            debug: false,
            log_level: default_log_level(),
            auth_type: default_auth_type(),
            email_protection: true,
            reset_hash_lifetime_secs: default_reset_lifetime(),
            auth_user_registration: false,
            auth_user_registration_role: default_registration_role(),
            index_url: default_index_url(),
            login_url: default_login_url(),
            allowed_redirect_hosts: Vec::new(),
            ldap: None,
            openid_providers: Vec::new(),
            oauth_providers: Vec::new(),
        }
    }
}

impl Settings {
    /// Creates settings with the given secret key and defaults elsewhere.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    /// Parses settings from a TOML string.
    pub fn from_toml(input: &str) -> Result<Self, ForgeError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<Self, ForgeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::ImproperlyConfigured(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.secret_key.is_empty() {
            return Err(ForgeError::ImproperlyConfigured(
                "secret_key must not be empty".to_string(),
            ));
        }
        if self.auth_type == AuthType::Ldap && self.ldap.is_none() {
            return Err(ForgeError::ImproperlyConfigured(
                "auth_type is ldap but no [ldap] section is configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the OAuth provider settings for a provider name, if configured.
    pub fn oauth_provider(&self, name: &str) -> Option<&OAuthProviderSettings> {
        self.oauth_providers.iter().find(|p| p.name == name)
    }
}

/// A configure-once global settings holder.
///
/// ```
/// use appforge_core::settings::{LazySettings, Settings};
///
/// static SETTINGS: LazySettings = LazySettings::new();
/// SETTINGS.configure(Settings::new("s3cret"));
/// assert!(SETTINGS.is_configured());
/// ```
#[derive(Debug)]
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl LazySettings {
    /// Creates an unconfigured settings holder.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Installs the settings. Later calls are ignored.
    pub fn configure(&self, settings: Settings) {
        let _ = self.inner.set(settings);
    }

    /// Returns the installed settings.
    ///
    /// # Panics
    ///
    /// Panics if `configure` has not been called.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings accessed before configure()")
    }

    /// Returns whether settings have been installed.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}
