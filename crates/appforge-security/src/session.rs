//! Session integration for the security layer.
//!
//! Authentication state lives in the request META, where the session
//! middleware serializes session data as JSON under `SESSION_DATA`. Two keys
//! carry the state:
//!
//! - `_auth_user_id` - the authenticated user's primary key
//! - `_auth_user_hash` - a fragment of the password hash for invalidation
//!
//! Writes set `SESSION_MODIFIED` so the middleware persists the session, and
//! mirror the logged-in state into the `USER_AUTHENTICATED` META key for
//! downstream views.

use appforge_http::HttpRequest;

use crate::models::User;

/// Session key for the authenticated user's id.
const SESSION_USER_KEY: &str = "_auth_user_id";
/// Session key for the password hash fragment (detects password changes).
const SESSION_HASH_KEY: &str = "_auth_user_hash";
/// META key indicating whether the current user is authenticated.
const META_USER_AUTHENTICATED: &str = "USER_AUTHENTICATED";
/// Session key for the remember-me checkbox carried across a login round trip.
const SESSION_REMEMBER_KEY: &str = "remember_me";

/// Computes the session authentication hash from a user's password hash.
///
/// The first 40 characters cover the algorithm metadata and salt, enough to
/// detect a password change.
fn session_auth_hash(password_hash: &str) -> String {
    let end = std::cmp::min(password_hash.len(), 40);
    password_hash[..end].to_string()
}

fn read_session(request: &HttpRequest) -> serde_json::Map<String, serde_json::Value> {
    request
        .meta()
        .get("SESSION_DATA")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

fn write_session(request: &mut HttpRequest, data: &serde_json::Map<String, serde_json::Value>) {
    let updated = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    let meta = request.meta_mut();
    meta.insert("SESSION_DATA".to_string(), updated);
    meta.insert("SESSION_MODIFIED".to_string(), "true".to_string());
}

/// Stores the user's authentication state in the request session.
pub fn login_to_session(request: &mut HttpRequest, user: &User) {
    let mut data = read_session(request);
    data.insert(
        SESSION_USER_KEY.to_string(),
        serde_json::Value::String(user.id.to_string()),
    );
    data.insert(
        SESSION_HASH_KEY.to_string(),
        serde_json::Value::String(session_auth_hash(&user.password)),
    );
    write_session(request, &data);
    request
        .meta_mut()
        .insert(META_USER_AUTHENTICATED.to_string(), "true".to_string());
}

/// Clears authentication state from the request session.
pub fn logout_from_session(request: &mut HttpRequest) {
    let mut data = read_session(request);
    data.remove(SESSION_USER_KEY);
    data.remove(SESSION_HASH_KEY);
    write_session(request, &data);
    request
        .meta_mut()
        .insert(META_USER_AUTHENTICATED.to_string(), "false".to_string());
}

/// Stores the remember-me choice so it survives the identity round trip.
pub fn store_remember_me(request: &mut HttpRequest, remember: bool) {
    let mut data = read_session(request);
    data.insert(
        SESSION_REMEMBER_KEY.to_string(),
        serde_json::Value::Bool(remember),
    );
    write_session(request, &data);
}

/// The stored remember-me choice, defaulting to false.
pub fn remember_me(request: &HttpRequest) -> bool {
    read_session(request)
        .get(SESSION_REMEMBER_KEY)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Whether the current request carries an authenticated user.
pub fn is_authenticated(request: &HttpRequest) -> bool {
    request
        .meta()
        .get(META_USER_AUTHENTICATED)
        .is_some_and(|v| v == "true")
}

/// The authenticated user's id, if any.
pub fn get_user_id(request: &HttpRequest) -> Option<i64> {
    read_session(request)
        .get(SESSION_USER_KEY)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
}
