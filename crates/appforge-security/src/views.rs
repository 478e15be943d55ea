//! Authentication views.
//!
//! One login view per authentication strategy, plus logout. Each view
//! handles GET by returning the form schema as JSON and POST by delegating
//! the decision to the [`SecurityManager`]. Failed logins flash a warning
//! and redirect back to the login page; successful logins store the session
//! state and redirect to the index (or the `next` destination when one was
//! requested).

use appforge_core::error::{ForgeError, ForgeResult};
use appforge_http::{flash, FlashLevel, HttpRequest, HttpResponse, HttpResponseRedirect};
use tracing::warn;

use crate::forms::{FieldDef, LoginForm, OpenIdLoginForm};
use crate::manager::SecurityManager;
use crate::oauth::{decode_state, encode_state, StateArgs};
use crate::session;

/// Configuration for the authentication views.
#[derive(Debug, Clone)]
pub struct AuthViewConfig {
    /// The template rendered for the login page.
    pub login_template: String,
    /// The page title shown on the login form.
    pub title: String,
    /// Message flashed when credentials are rejected.
    pub invalid_login_message: String,
}

impl Default for AuthViewConfig {
    fn default() -> Self {
        Self {
            login_template: "appforge/general/security/login_db.html".to_string(),
            title: "Sign In".to_string(),
            invalid_login_message: "Invalid login. Please try again.".to_string(),
        }
    }
}

fn form_schema_body(config: &AuthViewConfig, fields: &[FieldDef]) -> String {
    let fields: Vec<serde_json::Value> = fields
        .iter()
        .map(|f| {
            serde_json::json!({
                "name": f.name,
                "label": f.label,
                "kind": f.kind,
                "required": f.required,
            })
        })
        .collect();
    serde_json::json!({
        "title": config.title,
        "template": config.login_template,
        "form": { "fields": fields },
    })
    .to_string()
}

/// Whether a `next` target is safe to redirect to. Relative paths pass;
/// absolute URLs must point at an allow-listed host.
fn safe_redirect_target(target: &str, allowed_hosts: &[String]) -> bool {
    if target.starts_with('/') {
        // Protocol-relative forms like "//evil.example" escape the site.
        return !target.starts_with("//") && !target.starts_with("/\\");
    }
    let Some(rest) = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
    else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    allowed_hosts.iter().any(|allowed| allowed == host)
}

fn redirect_destination(request: &HttpRequest, manager: &SecurityManager) -> String {
    let settings = manager.settings();
    match request.get().get("next") {
        Some(next) if safe_redirect_target(next, &settings.allowed_redirect_hosts) => {
            next.to_string()
        }
        Some(next) => {
            warn!(next, "unsafe next target dropped");
            settings.index_url.clone()
        }
        None => settings.index_url.clone(),
    }
}

fn failed_login(
    request: &mut HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> HttpResponse {
    warn!(path = %request.path(), "rejected login attempt");
    flash(request, FlashLevel::Warning, &config.invalid_login_message);
    HttpResponseRedirect::new(&manager.settings().login_url)
}

/// Login against the user database.
///
/// GET returns the form schema; POST authenticates username and password.
pub async fn login_db(
    mut request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    if session::is_authenticated(&request) {
        return Ok(HttpResponseRedirect::new(&manager.settings().index_url));
    }

    if *request.method() == http::Method::GET {
        return Ok(HttpResponse::ok(form_schema_body(
            config,
            LoginForm::new().field_defs(),
        )));
    }
    if *request.method() != http::Method::POST {
        return Ok(HttpResponse::not_allowed(&["GET", "POST"]));
    }

    let mut form = LoginForm::new();
    let post_data = request.post().clone();
    form.bind(&post_data);
    if !form.is_valid() {
        return Ok(failed_login(&mut request, config, manager));
    }

    let username = form.username().unwrap_or_default().to_string();
    let password = form.password().unwrap_or_default().to_string();
    match manager.auth_user_db(&username, &password).await? {
        Some(user) => {
            session::login_to_session(&mut request, &user);
            Ok(HttpResponseRedirect::new(&redirect_destination(
                &request, manager,
            )))
        }
        None => Ok(failed_login(&mut request, config, manager)),
    }
}

/// Login against the LDAP directory.
///
/// Same surface as [`login_db`]; the credentials are bound against the
/// directory instead of the local store.
pub async fn login_ldap(
    mut request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    if session::is_authenticated(&request) {
        return Ok(HttpResponseRedirect::new(&manager.settings().index_url));
    }

    if *request.method() == http::Method::GET {
        return Ok(HttpResponse::ok(form_schema_body(
            config,
            LoginForm::new().field_defs(),
        )));
    }
    if *request.method() != http::Method::POST {
        return Ok(HttpResponse::not_allowed(&["GET", "POST"]));
    }

    let mut form = LoginForm::new();
    let post_data = request.post().clone();
    form.bind(&post_data);
    if !form.is_valid() {
        return Ok(failed_login(&mut request, config, manager));
    }

    let username = form.username().unwrap_or_default().to_string();
    let password = form.password().unwrap_or_default().to_string();
    match manager.auth_user_ldap(&username, &password).await? {
        Some(user) => {
            session::login_to_session(&mut request, &user);
            Ok(HttpResponseRedirect::new(&redirect_destination(
                &request, manager,
            )))
        }
        None => Ok(failed_login(&mut request, config, manager)),
    }
}

/// OpenID login.
///
/// GET returns the form schema along with the configured providers; POST
/// starts the identity round trip and authenticates the asserted email.
pub async fn login_oid(
    mut request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    if session::is_authenticated(&request) {
        return Ok(HttpResponseRedirect::new(&manager.settings().index_url));
    }

    if *request.method() == http::Method::GET {
        let form = OpenIdLoginForm::new();
        let fields: Vec<serde_json::Value> = form
            .field_defs()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "label": f.label,
                    "kind": f.kind,
                    "required": f.required,
                })
            })
            .collect();
        let body = serde_json::json!({
            "title": config.title,
            "template": config.login_template,
            "form": { "fields": fields },
            "providers": manager.settings().openid_providers,
        });
        return Ok(HttpResponse::ok(body.to_string()));
    }
    if *request.method() != http::Method::POST {
        return Ok(HttpResponse::not_allowed(&["GET", "POST"]));
    }

    let mut form = OpenIdLoginForm::new();
    let post_data = request.post().clone();
    form.bind(&post_data);
    if !form.is_valid() {
        return Ok(failed_login(&mut request, config, manager));
    }

    session::store_remember_me(&mut request, form.remember_me());
    let identity = form.openid().unwrap_or_default().to_string();
    match manager.auth_user_oid_identity(&identity).await? {
        Some(user) => {
            session::login_to_session(&mut request, &user);
            Ok(HttpResponseRedirect::new(&redirect_destination(
                &request, manager,
            )))
        }
        None => Ok(failed_login(&mut request, config, manager)),
    }
}

/// OAuth login entry point.
///
/// Without a provider, lists the configured providers so the client can
/// render a chooser. With a provider, signs the request arguments into a
/// state token and redirects to the provider's authorize URL.
pub async fn login_oauth(
    request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
    provider: Option<&str>,
) -> ForgeResult<HttpResponse> {
    if session::is_authenticated(&request) {
        return Ok(HttpResponseRedirect::new(&manager.settings().index_url));
    }

    let Some(provider) = provider else {
        let providers: Vec<&str> = manager
            .settings()
            .oauth_providers
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let body = serde_json::json!({
            "title": config.title,
            "template": config.login_template,
            "providers": providers,
        });
        return Ok(HttpResponse::ok(body.to_string()));
    };

    let remote = manager
        .oauth_remote(provider)
        .ok_or_else(|| ForgeError::NotFound(format!("OAuth provider '{provider}'")))?;

    // Preserve the login request's arguments across the round trip.
    let mut args = StateArgs::new();
    for (key, values) in request.get().items() {
        args.insert(key.to_string(), values.to_vec());
    }
    let state = encode_state(&args, &manager.settings().secret_key)?;
    Ok(HttpResponseRedirect::new(&remote.authorize_redirect(&state)))
}

/// OAuth callback.
///
/// Verifies the state signature, exchanges the code for a token, checks the
/// provider's email allow-list, and authenticates the asserted identity.
/// A state that fails verification aborts with an error; everything else
/// flashes a warning and sends the user back to the login page.
pub async fn oauth_authorized(
    mut request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
    provider: &str,
) -> ForgeResult<HttpResponse> {
    let denied = request.get().contains_key("error") || request.get().get("code").is_none();
    if denied {
        flash(
            &mut request,
            FlashLevel::Warning,
            "You denied the request to sign in.",
        );
        return Ok(HttpResponseRedirect::new(&manager.settings().login_url));
    }

    let state = request.get().get("state").unwrap_or_default().to_string();
    let args = decode_state(&state, &manager.settings().secret_key)?;

    let remote = manager
        .oauth_remote(provider)
        .ok_or_else(|| ForgeError::NotFound(format!("OAuth provider '{provider}'")))?;
    let code = request.get().get("code").unwrap_or_default().to_string();
    let Some(token) = remote.authorize_access_token(&code).await? else {
        flash(
            &mut request,
            FlashLevel::Warning,
            "You denied the request to sign in.",
        );
        return Ok(HttpResponseRedirect::new(&manager.settings().login_url));
    };

    let userinfo = remote.user_info(&token).await?;
    if !manager.oauth_email_allowed(provider, &userinfo.email) {
        flash(&mut request, FlashLevel::Warning, "You are not authorized.");
        return Ok(HttpResponseRedirect::new(&manager.settings().login_url));
    }

    match manager.auth_user_oauth(&userinfo).await? {
        Some(user) => {
            session::login_to_session(&mut request, &user);
            let settings = manager.settings();
            let destination = args
                .get("next")
                .and_then(|values| values.first())
                .filter(|next| safe_redirect_target(next, &settings.allowed_redirect_hosts))
                .map_or_else(|| settings.index_url.clone(), String::clone);
            Ok(HttpResponseRedirect::new(&destination))
        }
        None => Ok(failed_login(&mut request, config, manager)),
    }
}

/// Login from the reverse proxy's `REMOTE_USER` identity.
///
/// Authenticates the proxied username when one is present. A missing header
/// or unknown user flashes the invalid-login warning; the view redirects to
/// the index either way.
pub async fn login_remote_user(
    mut request: HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    remote_user_redirect(&mut request, config, manager).await
}

async fn remote_user_redirect(
    request: &mut HttpRequest,
    config: &AuthViewConfig,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    if !session::is_authenticated(request) {
        match request.remote_user().map(String::from) {
            Some(username) => match manager.auth_user_remote_user(&username).await? {
                Some(user) => session::login_to_session(request, &user),
                None => {
                    warn!(%username, "unknown REMOTE_USER identity");
                    flash(request, FlashLevel::Warning, &config.invalid_login_message);
                }
            },
            None => {
                warn!("REMOTE_USER login without proxy identity");
                flash(request, FlashLevel::Warning, &config.invalid_login_message);
            }
        }
    }
    Ok(HttpResponseRedirect::new(&manager.settings().index_url))
}

/// Logout: clears the session and redirects to the index.
pub async fn logout(
    mut request: HttpRequest,
    manager: &SecurityManager,
) -> ForgeResult<HttpResponse> {
    session::logout_from_session(&mut request);
    Ok(HttpResponseRedirect::new(&manager.settings().index_url))
}
