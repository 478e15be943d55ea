//! OAuth authentication plumbing.
//!
//! Three pieces: the [`OAuthRemote`] contract a provider client implements,
//! the signed state token carried through the authorization round trip, and
//! the regex email allow-list a provider can be fenced with.
//!
//! The state token is an HS256 JWT signed with the application secret. It
//! carries the query arguments of the login request (notably `next`) so the
//! callback can restore them; a state that fails verification aborts the
//! flow with [`ForgeError::BadSignature`].

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};

use appforge_core::error::{ForgeError, ForgeResult};
use appforge_core::settings::OAuthProviderSettings;

/// An access token returned by a provider's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The bearer token.
    pub access_token: String,
    /// The token type, normally `bearer`.
    pub token_type: String,
}

/// Identity attributes a provider asserts for the logged-in user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    /// Provider-scoped username, when the provider exposes one.
    pub username: String,
    /// The asserted email.
    pub email: String,
    /// First name, when available.
    pub first_name: String,
    /// Last name, when available.
    pub last_name: String,
}

/// Contract for one OAuth provider's client.
///
/// A production deployment implements this over a real HTTP client;
/// [`StaticRemote`] is the in-memory double used by tests.
#[async_trait]
pub trait OAuthRemote: Send + Sync {
    /// Builds the provider's authorization URL for a redirect, binding the
    /// signed state token to the round trip.
    fn authorize_redirect(&self, state: &str) -> String;

    /// Exchanges the callback's authorization code for an access token.
    ///
    /// Returns `None` when the provider rejects the exchange.
    async fn authorize_access_token(&self, code: &str) -> ForgeResult<Option<OAuthToken>>;

    /// Fetches the identity behind an access token.
    async fn user_info(&self, token: &OAuthToken) -> ForgeResult<OAuthUserInfo>;
}

/// The request arguments preserved across the authorization round trip.
pub type StateArgs = HashMap<String, Vec<String>>;

/// Signs the login request's query arguments into a state token.
pub fn encode_state(args: &StateArgs, secret: &str) -> ForgeResult<String> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        args,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ForgeError::BadSignature(e.to_string()))
}

/// Verifies a state token and recovers the preserved arguments.
///
/// A token signed with a different secret, or otherwise malformed, fails
/// with [`ForgeError::BadSignature`].
pub fn decode_state(state: &str, secret: &str) -> ForgeResult<StateArgs> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The state is not a session token; it carries no registered claims.
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    jsonwebtoken::decode::<StateArgs>(
        state,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| ForgeError::BadSignature(e.to_string()))
}

/// Checks an email against a provider's allow-list.
///
/// Each entry is a regex matched anywhere in the email. An empty list allows
/// everyone; an invalid pattern is treated as non-matching.
pub fn email_allowed(settings: &OAuthProviderSettings, email: &str) -> bool {
    if settings.email_allow_list.is_empty() {
        return true;
    }
    settings
        .email_allow_list
        .iter()
        .any(|pattern| Regex::new(pattern).is_ok_and(|re| re.is_match(email)))
}

/// In-memory provider double for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct StaticRemote {
    authorize_url: String,
    codes: HashMap<String, OAuthUserInfo>,
}

impl StaticRemote {
    /// Creates a remote that authorizes against the given URL.
    pub fn new(authorize_url: impl Into<String>) -> Self {
        Self {
            authorize_url: authorize_url.into(),
            codes: HashMap::new(),
        }
    }

    /// Registers an authorization code and the identity it resolves to.
    pub fn with_code(mut self, code: impl Into<String>, info: OAuthUserInfo) -> Self {
        self.codes.insert(code.into(), info);
        self
    }
}

#[async_trait]
impl OAuthRemote for StaticRemote {
    fn authorize_redirect(&self, state: &str) -> String {
        format!("{}?state={state}", self.authorize_url)
    }

    async fn authorize_access_token(&self, code: &str) -> ForgeResult<Option<OAuthToken>> {
        Ok(self.codes.contains_key(code).then(|| OAuthToken {
            access_token: format!("token-for-{code}"),
            token_type: "bearer".to_string(),
        }))
    }

    async fn user_info(&self, token: &OAuthToken) -> ForgeResult<OAuthUserInfo> {
        let code = token
            .access_token
            .strip_prefix("token-for-")
            .unwrap_or_default();
        self.codes
            .get(code)
            .cloned()
            .ok_or_else(|| ForgeError::Unauthorized("unknown access token".to_string()))
    }
}
