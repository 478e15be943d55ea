//! LDAP authentication seam.
//!
//! [`LdapConnector`] is the directory contract the security manager binds
//! against. A production deployment plugs in a connector backed by a real
//! LDAP client; [`StaticDirectory`] is an in-memory directory for tests and
//! local development.

use std::collections::HashMap;

use async_trait::async_trait;

use appforge_core::error::ForgeResult;

/// Attributes returned by a directory search for one entry.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    /// The entry's mail attribute.
    pub email: String,
    /// The entry's givenName attribute.
    pub first_name: String,
    /// The entry's sn attribute.
    pub last_name: String,
}

/// Contract for talking to an LDAP directory.
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Attempts a simple bind with the given DN and password.
    ///
    /// Returns `true` when the directory accepts the credentials.
    async fn bind(&self, dn: &str, password: &str) -> ForgeResult<bool>;

    /// Searches the directory for the entry bound to a username.
    async fn search(&self, username: &str) -> ForgeResult<Option<LdapEntry>>;
}

/// Expands a bind DN template for a username.
///
/// The template carries a `{username}` placeholder, e.g.
/// `uid={username},ou=people,dc=example,dc=org`.
pub fn bind_dn(template: &str, username: &str) -> String {
    template.replace("{username}", username)
}

/// In-memory directory for tests and local development.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    entries: HashMap<String, (String, LdapEntry)>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry keyed by username with its bind password.
    pub fn with_entry(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        entry: LdapEntry,
    ) -> Self {
        self.entries
            .insert(username.into(), (password.into(), entry));
        self
    }
}

#[async_trait]
impl LdapConnector for StaticDirectory {
    async fn bind(&self, dn: &str, password: &str) -> ForgeResult<bool> {
        // The DN's first RDN value is the username.
        let username = dn
            .split(',')
            .next()
            .and_then(|rdn| rdn.split_once('='))
            .map_or("", |(_, value)| value);
        Ok(self
            .entries
            .get(username)
            .is_some_and(|(stored, _)| stored == password))
    }

    async fn search(&self, username: &str) -> ForgeResult<Option<LdapEntry>> {
        Ok(self.entries.get(username).map(|(_, entry)| entry.clone()))
    }
}
