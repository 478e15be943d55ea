//! The security manager.
//!
//! [`SecurityManager`] owns every authentication decision in the framework:
//! the five auth strategies (database, LDAP, OpenID, OAuth, reverse-proxy
//! remote user), the password-reset lifecycle, and self-registration for the
//! external strategies. Views never decide outcomes themselves; they call
//! into the manager and translate its results.
//!
//! ## Login counters
//!
//! Every successful authentication bumps `login_count`, clears
//! `fail_login_count`, and stamps `last_login`. A failed database or LDAP
//! attempt against a known user bumps `fail_login_count`.
//!
//! ## Password resets
//!
//! A reset is a random hash emailed to the user as a link. Following the
//! link acknowledges the record; only an acknowledged, unexpired record lets
//! the reset form through. Completing the reset deletes the record, so the
//! link is single use.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use tracing::{info, warn};

use appforge_core::error::{ForgeError, ForgeResult};
use appforge_core::settings::Settings;

use crate::hashers::{check_password, make_password, unusable_password};
use crate::ldap::{bind_dn, LdapConnector};
use crate::models::{Role, User, UserResetPassword};
use crate::oauth::{email_allowed, OAuthRemote, OAuthUserInfo};
use crate::openid::OidResolver;
use crate::store::SecurityStore;

/// Outgoing mail seam.
///
/// The reset workflow emails a link; deployments plug in a real mailer here.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends one message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> ForgeResult<()>;
}

/// Default [`EmailSender`] that writes messages to the log.
#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> ForgeResult<()> {
        info!(to, subject, body, "outgoing email");
        Ok(())
    }
}

/// Central authority for authentication and the reset lifecycle.
pub struct SecurityManager {
    settings: Settings,
    store: Arc<dyn SecurityStore>,
    ldap: Option<Arc<dyn LdapConnector>>,
    oid: Option<Arc<dyn OidResolver>>,
    oauth_remotes: HashMap<String, Arc<dyn OAuthRemote>>,
    email_sender: Arc<dyn EmailSender>,
}

impl SecurityManager {
    /// Creates a manager over a store, with no external connectors wired.
    pub fn new(settings: Settings, store: Arc<dyn SecurityStore>) -> Self {
        Self {
            settings,
            store,
            ldap: None,
            oid: None,
            oauth_remotes: HashMap::new(),
            email_sender: Arc::new(LogEmailSender),
        }
    }

    /// Wires an LDAP connector.
    #[must_use]
    pub fn with_ldap(mut self, connector: Arc<dyn LdapConnector>) -> Self {
        self.ldap = Some(connector);
        self
    }

    /// Wires an OpenID resolver.
    #[must_use]
    pub fn with_oid(mut self, resolver: Arc<dyn OidResolver>) -> Self {
        self.oid = Some(resolver);
        self
    }

    /// Registers an OAuth provider client under its configured name.
    #[must_use]
    pub fn with_oauth_remote(mut self, name: impl Into<String>, remote: Arc<dyn OAuthRemote>) -> Self {
        self.oauth_remotes.insert(name.into(), remote);
        self
    }

    /// Replaces the email sender.
    #[must_use]
    pub fn with_email_sender(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = sender;
        self
    }

    /// The settings this manager was built with.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The store backing this manager.
    pub fn store(&self) -> Arc<dyn SecurityStore> {
        Arc::clone(&self.store)
    }

    /// Looks up a configured OAuth remote by provider name.
    pub fn oauth_remote(&self, name: &str) -> Option<Arc<dyn OAuthRemote>> {
        self.oauth_remotes.get(name).map(Arc::clone)
    }

    // ── authentication strategies ────────────────────────────────────

    /// Authenticates against the user database.
    ///
    /// Accepts the username or the email in the username field. Returns the
    /// user on success, `None` on unknown user, inactive user, or a wrong
    /// password.
    pub async fn auth_user_db(&self, username: &str, password: &str) -> ForgeResult<Option<User>> {
        let user = match self.find_by_username_or_email(username).await? {
            Some(user) => user,
            None => {
                warn!(username, "login attempt for unknown user");
                return Ok(None);
            }
        };
        if !user.active {
            warn!(username, "login attempt for inactive user");
            return Ok(None);
        }
        if check_password(password, &user.password).await? {
            Ok(Some(self.update_auth_stat(user, true).await?))
        } else {
            self.update_auth_stat(user, false).await?;
            Ok(None)
        }
    }

    /// Authenticates against the LDAP directory.
    ///
    /// Binds with the configured DN template. When the bind succeeds and no
    /// local user exists, the user is auto-registered from the directory
    /// entry if `auth_user_registration` is enabled.
    pub async fn auth_user_ldap(&self, username: &str, password: &str) -> ForgeResult<Option<User>> {
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }
        let connector = self.ldap.as_ref().ok_or_else(|| {
            ForgeError::ImproperlyConfigured("LDAP connector is not wired".to_string())
        })?;
        let ldap_settings = self.settings.ldap.as_ref().ok_or_else(|| {
            ForgeError::ImproperlyConfigured("ldap settings are missing".to_string())
        })?;

        let dn = bind_dn(&ldap_settings.bind_dn_template, username);
        if !connector.bind(&dn, password).await? {
            if let Some(user) = self.store.find_user_by_username(username).await? {
                self.update_auth_stat(user, false).await?;
            }
            return Ok(None);
        }

        match self.store.find_user_by_username(username).await? {
            Some(user) if user.active => Ok(Some(self.update_auth_stat(user, true).await?)),
            Some(_) => Ok(None),
            None => {
                if !self.settings.auth_user_registration {
                    return Ok(None);
                }
                let entry = connector.search(username).await?.unwrap_or_default();
                let mut user = User::new(username);
                user.first_name = entry.first_name;
                user.last_name = entry.last_name;
                user.email = entry.email;
                let user = self.register_external_user(user).await?;
                Ok(Some(self.update_auth_stat(user, true).await?))
            }
        }
    }

    /// Authenticates an OpenID identity URL.
    ///
    /// Resolves the identity to an email through the wired resolver, then
    /// matches it against a local user.
    pub async fn auth_user_oid_identity(&self, identity_url: &str) -> ForgeResult<Option<User>> {
        let resolver = self.oid.as_ref().ok_or_else(|| {
            ForgeError::ImproperlyConfigured("OpenID resolver is not wired".to_string())
        })?;
        match resolver.resolve_email(identity_url).await? {
            Some(email) => self.auth_user_oid(&email).await,
            None => Ok(None),
        }
    }

    /// Authenticates the email asserted by an OpenID provider.
    pub async fn auth_user_oid(&self, email: &str) -> ForgeResult<Option<User>> {
        match self.store.find_user_by_email(email).await? {
            Some(user) if user.active => Ok(Some(self.update_auth_stat(user, true).await?)),
            Some(_) => Ok(None),
            None => {
                warn!(email, "OpenID login for unknown email");
                Ok(None)
            }
        }
    }

    /// Authenticates the identity asserted by an OAuth provider.
    ///
    /// Matches by provider username first, then by email. Unknown identities
    /// are self-registered when `auth_user_registration` is enabled.
    pub async fn auth_user_oauth(&self, userinfo: &OAuthUserInfo) -> ForgeResult<Option<User>> {
        let existing = if userinfo.username.is_empty() {
            None
        } else {
            self.store.find_user_by_username(&userinfo.username).await?
        };
        let existing = match existing {
            Some(user) => Some(user),
            None if !userinfo.email.is_empty() => {
                self.store.find_user_by_email(&userinfo.email).await?
            }
            None => None,
        };

        match existing {
            Some(user) if user.active => Ok(Some(self.update_auth_stat(user, true).await?)),
            Some(_) => Ok(None),
            None => {
                if !self.settings.auth_user_registration {
                    warn!(username = %userinfo.username, "OAuth login for unknown user");
                    return Ok(None);
                }
                let mut user = User::new(if userinfo.username.is_empty() {
                    &userinfo.email
                } else {
                    &userinfo.username
                });
                user.first_name = userinfo.first_name.clone();
                user.last_name = userinfo.last_name.clone();
                user.email = userinfo.email.clone();
                let user = self.register_external_user(user).await?;
                Ok(Some(self.update_auth_stat(user, true).await?))
            }
        }
    }

    /// Authenticates a username asserted by the reverse proxy.
    pub async fn auth_user_remote_user(&self, username: &str) -> ForgeResult<Option<User>> {
        match self.store.find_user_by_username(username).await? {
            Some(user) if user.active => Ok(Some(self.update_auth_stat(user, true).await?)),
            Some(_) => Ok(None),
            None => {
                if !self.settings.auth_user_registration {
                    return Ok(None);
                }
                let user = self.register_external_user(User::new(username)).await?;
                Ok(Some(self.update_auth_stat(user, true).await?))
            }
        }
    }

    /// Checks an email against a provider's allow-list.
    pub fn oauth_email_allowed(&self, provider: &str, email: &str) -> bool {
        self.settings
            .oauth_provider(provider)
            .map_or(true, |p| email_allowed(p, email))
    }

    // ── password reset lifecycle ─────────────────────────────────────

    /// Starts a password reset for the account behind an email.
    ///
    /// Issues a fresh hash (replacing any pending reset), emails the link,
    /// and returns the hash. Returns `None` for an unknown email, which
    /// callers deliberately do not distinguish.
    pub async fn forgot_password(&self, email: &str) -> ForgeResult<Option<String>> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            info!(email, "password reset requested for unknown email");
            return Ok(None);
        };
        let reset_hash = random_hash();
        self.store
            .save_reset(UserResetPassword::new(user.id, reset_hash.clone()))
            .await?;
        let link = format!("/users/resetmypw/{reset_hash}");
        self.email_sender
            .send(
                &user.email,
                "Reset your password",
                &format!("Follow this link to reset your password: {link}"),
            )
            .await?;
        info!(user_id = user.id, "password reset issued");
        Ok(Some(reset_hash))
    }

    /// The pending reset for a user, if one exists.
    pub async fn get_reset_password_hash(&self, user_id: i64) -> ForgeResult<Option<UserResetPassword>> {
        self.store.find_reset_by_user(user_id).await
    }

    /// Whether a reset hash is known, acknowledged, and unexpired.
    pub async fn check_reset_password_hash(&self, reset_hash: &str) -> ForgeResult<bool> {
        let Some(reset) = self.store.find_reset_by_hash(reset_hash).await? else {
            return Ok(false);
        };
        Ok(reset.ack && !self.reset_expired(&reset))
    }

    /// Marks the reset behind a hash as acknowledged.
    ///
    /// Returns the record's owner, or `None` for an unknown or expired hash.
    pub async fn set_reset_hash_ack(&self, reset_hash: &str) -> ForgeResult<Option<UserResetPassword>> {
        let Some(mut reset) = self.store.find_reset_by_hash(reset_hash).await? else {
            return Ok(None);
        };
        if self.reset_expired(&reset) {
            return Ok(None);
        }
        reset.ack = true;
        self.store.update_reset(&reset).await?;
        Ok(Some(reset))
    }

    /// Sets a user's password and closes any pending reset.
    pub async fn reset_password(&self, user_id: i64, password: &str) -> ForgeResult<()> {
        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ForgeError::NotFound(format!("user {user_id}")))?;
        user.password = make_password(password).await?;
        user.changed_on = Utc::now();
        self.store.update_user(&user).await?;
        self.store.delete_reset_for_user(user_id).await?;
        info!(user_id, "password reset completed");
        Ok(())
    }

    /// Drops a user's pending reset without changing the password.
    pub async fn del_reset_password_hash(&self, user_id: i64) -> ForgeResult<()> {
        self.store.delete_reset_for_user(user_id).await
    }

    fn reset_expired(&self, reset: &UserResetPassword) -> bool {
        let lifetime = i64::try_from(self.settings.reset_hash_lifetime_secs).unwrap_or(i64::MAX);
        reset.age_secs(Utc::now()) > lifetime
    }

    // ── user management helpers ──────────────────────────────────────

    /// Looks up a user by primary key.
    pub async fn get_user_by_id(&self, user_id: i64) -> ForgeResult<Option<User>> {
        self.store.find_user_by_id(user_id).await
    }

    /// Persists changes to a user, stamping `changed_on`.
    pub async fn update_user(&self, user: &mut User) -> ForgeResult<()> {
        user.changed_on = Utc::now();
        self.store.update_user(user).await
    }

    /// Adds a user with a hashed password.
    pub async fn add_user(&self, mut user: User, password: &str) -> ForgeResult<User> {
        user.password = make_password(password).await?;
        self.store.add_user(user).await
    }

    async fn find_by_username_or_email(&self, identity: &str) -> ForgeResult<Option<User>> {
        if let Some(user) = self.store.find_user_by_username(identity).await? {
            return Ok(Some(user));
        }
        self.store.find_user_by_email(identity).await
    }

    /// Registers an externally authenticated user with the registration role
    /// and no usable password.
    async fn register_external_user(&self, mut user: User) -> ForgeResult<User> {
        user.password = unusable_password();
        let role_name = &self.settings.auth_user_registration_role;
        let role = match self.store.find_role_by_name(role_name).await? {
            Some(role) => role,
            None => self.store.add_role(Role::new(role_name.clone())).await?,
        };
        user.roles.push(role.id);
        let user = self.store.add_user(user).await?;
        info!(user_id = user.id, username = %user.username, "self-registered user");
        Ok(user)
    }

    async fn update_auth_stat(&self, mut user: User, success: bool) -> ForgeResult<User> {
        if success {
            user.login_count += 1;
            user.fail_login_count = 0;
            user.last_login = Some(Utc::now());
        } else {
            user.fail_login_count += 1;
            warn!(user_id = user.id, fails = user.fail_login_count, "failed login");
        }
        self.store.update_user(&user).await?;
        Ok(user)
    }
}

/// 160 bits of randomness, hex encoded. Used for reset links.
fn random_hash() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::{LdapEntry, StaticDirectory};
    use crate::store::MemorySecurityStore;

    fn manager_with(settings: Settings) -> (SecurityManager, Arc<MemorySecurityStore>) {
        let store = Arc::new(MemorySecurityStore::new());
        (SecurityManager::new(settings, store.clone()), store)
    }

    async fn seed_user(manager: &SecurityManager, username: &str, email: &str, password: &str) -> User {
        let mut user = User::new(username);
        user.email = email.to_string();
        manager.add_user(user, password).await.unwrap()
    }

    // ── auth_user_db tests ──────────────────────────────────────────

    #[tokio::test]
    async fn test_auth_user_db_success_updates_counters() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "s3cret").await;

        let user = manager.auth_user_db("alice", "s3cret").await.unwrap().unwrap();
        assert_eq!(user.login_count, 1);
        assert_eq!(user.fail_login_count, 0);
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_auth_user_db_accepts_email_identity() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "s3cret").await;

        assert!(manager
            .auth_user_db("alice@example.org", "s3cret")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_auth_user_db_wrong_password_counts_failure() {
        let (manager, store) = manager_with(Settings::new("secret"));
        let seeded = seed_user(&manager, "alice", "alice@example.org", "s3cret").await;

        assert!(manager.auth_user_db("alice", "wrong").await.unwrap().is_none());
        let reloaded = store.find_user_by_id(seeded.id).await.unwrap().unwrap();
        assert_eq!(reloaded.fail_login_count, 1);
    }

    #[tokio::test]
    async fn test_auth_user_db_success_clears_failures() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "s3cret").await;

        manager.auth_user_db("alice", "wrong").await.unwrap();
        let user = manager.auth_user_db("alice", "s3cret").await.unwrap().unwrap();
        assert_eq!(user.fail_login_count, 0);
    }

    #[tokio::test]
    async fn test_auth_user_db_inactive_user() {
        let (manager, store) = manager_with(Settings::new("secret"));
        let mut user = seed_user(&manager, "alice", "alice@example.org", "s3cret").await;
        user.active = false;
        store.update_user(&user).await.unwrap();

        assert!(manager.auth_user_db("alice", "s3cret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auth_user_db_unknown_user() {
        let (manager, _) = manager_with(Settings::new("secret"));
        assert!(manager.auth_user_db("ghost", "pw").await.unwrap().is_none());
    }

    // ── auth_user_ldap tests ────────────────────────────────────────

    fn ldap_settings() -> Settings {
        let mut settings = Settings::new("secret");
        settings.ldap = Some(appforge_core::settings::LdapSettings {
            server: "ldap://directory.example".to_string(),
            bind_dn_template: "uid={username},ou=people,dc=example,dc=org".to_string(),
            search_base: "ou=people,dc=example,dc=org".to_string(),
        });
        settings
    }

    fn directory() -> Arc<StaticDirectory> {
        Arc::new(StaticDirectory::new().with_entry(
            "alice",
            "ldap-pw",
            LdapEntry {
                email: "alice@example.org".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            },
        ))
    }

    #[tokio::test]
    async fn test_auth_user_ldap_existing_user() {
        let (manager, _) = manager_with(ldap_settings());
        let manager = manager.with_ldap(directory());
        seed_user(&manager, "alice", "alice@example.org", "unused").await;

        let user = manager.auth_user_ldap("alice", "ldap-pw").await.unwrap().unwrap();
        assert_eq!(user.login_count, 1);
    }

    #[tokio::test]
    async fn test_auth_user_ldap_bad_bind() {
        let (manager, _) = manager_with(ldap_settings());
        let manager = manager.with_ldap(directory());
        seed_user(&manager, "alice", "alice@example.org", "unused").await;

        assert!(manager.auth_user_ldap("alice", "wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auth_user_ldap_auto_registration() {
        let mut settings = ldap_settings();
        settings.auth_user_registration = true;
        let (manager, store) = manager_with(settings);
        let manager = manager.with_ldap(directory());

        let user = manager.auth_user_ldap("alice", "ldap-pw").await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.org");
        assert!(!crate::hashers::is_password_usable(&user.password));
        let public = store.find_role_by_name("Public").await.unwrap().unwrap();
        assert!(user.has_role(public.id));
    }

    #[tokio::test]
    async fn test_auth_user_ldap_no_registration() {
        let (manager, _) = manager_with(ldap_settings());
        let manager = manager.with_ldap(directory());
        assert!(manager.auth_user_ldap("alice", "ldap-pw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auth_user_ldap_empty_credentials() {
        let (manager, _) = manager_with(ldap_settings());
        let manager = manager.with_ldap(directory());
        assert!(manager.auth_user_ldap("", "pw").await.unwrap().is_none());
        assert!(manager.auth_user_ldap("alice", "").await.unwrap().is_none());
    }

    // ── auth_user_oid tests ─────────────────────────────────────────

    #[tokio::test]
    async fn test_auth_user_oid_by_email() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "pw").await;

        assert!(manager.auth_user_oid("alice@example.org").await.unwrap().is_some());
        assert!(manager.auth_user_oid("ghost@example.org").await.unwrap().is_none());
    }

    // ── auth_user_oauth tests ───────────────────────────────────────

    #[tokio::test]
    async fn test_auth_user_oauth_matches_username_then_email() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "pw").await;

        let by_username = OAuthUserInfo {
            username: "alice".to_string(),
            ..OAuthUserInfo::default()
        };
        assert!(manager.auth_user_oauth(&by_username).await.unwrap().is_some());

        let by_email = OAuthUserInfo {
            email: "alice@example.org".to_string(),
            ..OAuthUserInfo::default()
        };
        assert!(manager.auth_user_oauth(&by_email).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_auth_user_oauth_self_registration() {
        let mut settings = Settings::new("secret");
        settings.auth_user_registration = true;
        let (manager, _) = manager_with(settings);

        let info = OAuthUserInfo {
            username: "newbie".to_string(),
            email: "newbie@example.org".to_string(),
            first_name: "New".to_string(),
            last_name: "Bie".to_string(),
        };
        let user = manager.auth_user_oauth(&info).await.unwrap().unwrap();
        assert_eq!(user.username, "newbie");
        assert_eq!(user.first_name, "New");
    }

    #[tokio::test]
    async fn test_auth_user_oauth_unknown_without_registration() {
        let (manager, _) = manager_with(Settings::new("secret"));
        let info = OAuthUserInfo {
            username: "ghost".to_string(),
            ..OAuthUserInfo::default()
        };
        assert!(manager.auth_user_oauth(&info).await.unwrap().is_none());
    }

    // ── auth_user_remote_user tests ─────────────────────────────────

    #[tokio::test]
    async fn test_auth_user_remote_user() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "pw").await;
        assert!(manager.auth_user_remote_user("alice").await.unwrap().is_some());
        assert!(manager.auth_user_remote_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auth_user_remote_user_registration() {
        let mut settings = Settings::new("secret");
        settings.auth_user_registration = true;
        let (manager, _) = manager_with(settings);
        let user = manager.auth_user_remote_user("proxied").await.unwrap().unwrap();
        assert_eq!(user.username, "proxied");
    }

    // ── reset lifecycle tests ───────────────────────────────────────

    #[tokio::test]
    async fn test_forgot_password_issues_hash() {
        let (manager, store) = manager_with(Settings::new("secret"));
        let user = seed_user(&manager, "alice", "alice@example.org", "pw").await;

        let hash = manager
            .forgot_password("alice@example.org")
            .await
            .unwrap()
            .unwrap();
        let reset = store.find_reset_by_hash(&hash).await.unwrap().unwrap();
        assert_eq!(reset.user_id, user.id);
        assert!(!reset.ack);
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let (manager, _) = manager_with(Settings::new("secret"));
        assert!(manager.forgot_password("ghost@example.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forgot_password_replaces_pending_reset() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "pw").await;

        let first = manager.forgot_password("alice@example.org").await.unwrap().unwrap();
        let second = manager.forgot_password("alice@example.org").await.unwrap().unwrap();
        assert_ne!(first, second);
        assert!(!manager.check_reset_password_hash(&first).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_requires_ack() {
        let (manager, _) = manager_with(Settings::new("secret"));
        seed_user(&manager, "alice", "alice@example.org", "pw").await;
        let hash = manager.forgot_password("alice@example.org").await.unwrap().unwrap();

        assert!(!manager.check_reset_password_hash(&hash).await.unwrap());
        manager.set_reset_hash_ack(&hash).await.unwrap().unwrap();
        assert!(manager.check_reset_password_hash(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_expired_hash() {
        let mut settings = Settings::new("secret");
        settings.reset_hash_lifetime_secs = 0;
        let (manager, store) = manager_with(settings);
        let user = seed_user(&manager, "alice", "alice@example.org", "pw").await;

        let mut reset = UserResetPassword::new(user.id, "stale");
        reset.ack = true;
        reset.created_on = Utc::now() - chrono::Duration::seconds(10);
        store.save_reset(reset).await.unwrap();

        assert!(!manager.check_reset_password_hash("stale").await.unwrap());
        assert!(manager.set_reset_hash_ack("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ack_unknown_hash() {
        let (manager, _) = manager_with(Settings::new("secret"));
        assert!(manager.set_reset_hash_ack("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_password_is_single_use() {
        let (manager, _) = manager_with(Settings::new("secret"));
        let user = seed_user(&manager, "alice", "alice@example.org", "old-pw").await;
        let hash = manager.forgot_password("alice@example.org").await.unwrap().unwrap();
        manager.set_reset_hash_ack(&hash).await.unwrap();

        manager.reset_password(user.id, "new-pw").await.unwrap();

        assert!(manager.auth_user_db("alice", "new-pw").await.unwrap().is_some());
        assert!(manager.auth_user_db("alice", "old-pw").await.unwrap().is_none());
        assert!(!manager.check_reset_password_hash(&hash).await.unwrap());
    }

    // ── helper tests ────────────────────────────────────────────────

    #[test]
    fn test_random_hash_shape() {
        let hash = random_hash();
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, random_hash());
    }
}
