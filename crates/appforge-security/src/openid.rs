//! OpenID authentication seam.
//!
//! The OpenID flow hands an identity URL to a resolver, which returns the
//! asserted email after the provider round trip. [`OidResolver`] is the
//! contract; [`StaticOidResolver`] is the in-memory double used by tests.

use std::collections::HashMap;

use async_trait::async_trait;

use appforge_core::error::ForgeResult;

/// Resolves an OpenID identity URL to the email the provider asserts.
#[async_trait]
pub trait OidResolver: Send + Sync {
    /// Completes the OpenID round trip for an identity URL.
    ///
    /// Returns the asserted email, or `None` when the provider rejects the
    /// identity.
    async fn resolve_email(&self, identity_url: &str) -> ForgeResult<Option<String>>;
}

/// In-memory resolver mapping identity URLs straight to emails.
#[derive(Debug, Default, Clone)]
pub struct StaticOidResolver {
    identities: HashMap<String, String>,
}

impl StaticOidResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an identity URL to an asserted email.
    pub fn with_identity(
        mut self,
        identity_url: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.identities.insert(identity_url.into(), email.into());
        self
    }
}

#[async_trait]
impl OidResolver for StaticOidResolver {
    async fn resolve_email(&self, identity_url: &str) -> ForgeResult<Option<String>> {
        Ok(self.identities.get(identity_url).cloned())
    }
}
