//! Integration tests for the security pipeline.
//!
//! Exercises the full flows across views, manager, session, and store:
//! login -> logout, forgot password -> emailed link -> reset form -> login
//! with the new password, and the OAuth round trip with a signed state.

use std::sync::Arc;

use appforge_core::settings::{OAuthProviderSettings, Settings};
use appforge_http::{peek_flashes, FlashLevel, HttpRequest};
use appforge_security::manager::SecurityManager;
use appforge_security::models::User;
use appforge_security::oauth::{OAuthUserInfo, StaticRemote};
use appforge_security::recovery::{
    forgot_my_password, public_reset_my_password, reset_my_password_landing, RecoveryViewConfig,
};
use appforge_security::session;
use appforge_security::store::{MemorySecurityStore, SecurityStore};
use appforge_security::views::{login_db, logout, oauth_authorized, AuthViewConfig};

fn manager() -> SecurityManager {
    SecurityManager::new(Settings::new("secret"), Arc::new(MemorySecurityStore::new()))
}

async fn seed_user(manager: &SecurityManager, username: &str, password: &str) -> User {
    let mut user = User::new(username);
    user.email = format!("{username}@example.org");
    manager.add_user(user, password).await.unwrap()
}

fn post_login(username: &str, password: &str) -> HttpRequest {
    HttpRequest::builder()
        .method(http::Method::POST)
        .path("/login/")
        .form_body(&format!("username={username}&password={password}"))
        .build()
}

// ── login / logout flow ──────────────────────────────────────────────

#[tokio::test]
async fn login_then_logout_round_trip() {
    let manager = manager();
    let user = seed_user(&manager, "alice", "s3cret").await;

    let response = login_db(
        post_login("alice", "s3cret"),
        &AuthViewConfig::default(),
        &manager,
    )
    .await
    .unwrap();
    assert_eq!(response.location(), Some("/"));

    let mut request = HttpRequest::builder().path("/logout/").build();
    session::login_to_session(&mut request, &user);
    assert!(session::is_authenticated(&request));

    let response = logout(request, &manager).await.unwrap();
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn failed_login_does_not_leak_which_field_was_wrong() {
    let manager = manager();
    seed_user(&manager, "alice", "s3cret").await;

    for (username, password) in [("alice", "wrong"), ("ghost", "s3cret")] {
        let response = login_db(
            post_login(username, password),
            &AuthViewConfig::default(),
            &manager,
        )
        .await
        .unwrap();
        assert_eq!(response.location(), Some("/login/"));
    }
}

// ── full recovery lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn locked_out_user_recovers_via_emailed_link() {
    let manager = manager();
    seed_user(&manager, "alice", "forgotten").await;
    let config = RecoveryViewConfig::default();

    // 1. Request the reset link.
    let request = HttpRequest::builder()
        .method(http::Method::POST)
        .path("/forgotmypassword/form")
        .form_body("email=alice%40example.org")
        .build();
    forgot_my_password(request, &config, &manager).await.unwrap();

    let user = manager
        .store()
        .find_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    let reset = manager
        .get_reset_password_hash(user.id)
        .await
        .unwrap()
        .unwrap();

    // 2. The public form is unreachable before the link is followed.
    let probe = HttpRequest::builder()
        .path(&format!("/resetmypassword/form/{}", reset.reset_hash))
        .build();
    let response = public_reset_my_password(probe, &config, &manager, &reset.reset_hash)
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);

    // 3. Follow the emailed link; it acknowledges and forwards.
    let landing = HttpRequest::builder()
        .path(&format!("/users/resetmypw/{}", reset.reset_hash))
        .build();
    let response = reset_my_password_landing(landing, &manager, &reset.reset_hash)
        .await
        .unwrap();
    assert_eq!(
        response.location(),
        Some(format!("/resetmypassword/form/{}", reset.reset_hash).as_str())
    );

    // 4. Submit the new password on the public form.
    let post = HttpRequest::builder()
        .method(http::Method::POST)
        .path(&format!("/resetmypassword/form/{}", reset.reset_hash))
        .form_body("password=recovered&conf_password=recovered")
        .build();
    let response = public_reset_my_password(post, &config, &manager, &reset.reset_hash)
        .await
        .unwrap();
    assert!(response.is_redirect());

    // 5. The new password works, the old one does not, the link is dead.
    assert!(manager.auth_user_db("alice", "recovered").await.unwrap().is_some());
    assert!(manager.auth_user_db("alice", "forgotten").await.unwrap().is_none());
    let retry = HttpRequest::builder()
        .path(&format!("/resetmypassword/form/{}", reset.reset_hash))
        .build();
    let response = public_reset_my_password(retry, &config, &manager, &reset.reset_hash)
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn landing_with_forged_hash_flashes_danger() {
    let manager = manager();
    let request = HttpRequest::builder().path("/users/resetmypw/forged").build();
    let response = reset_my_password_landing(request, &manager, "forged")
        .await
        .unwrap();
    assert_eq!(response.location(), Some("/"));
}

// ── OAuth round trip ─────────────────────────────────────────────────

#[tokio::test]
async fn oauth_callback_logs_in_registered_identity() {
    let mut settings = Settings::new("secret");
    settings.auth_user_registration = true;
    settings.oauth_providers = vec![OAuthProviderSettings {
        name: "github".to_string(),
        client_id: "id".to_string(),
        client_secret: "cs".to_string(),
        authorize_url: "https://github.example/authorize".to_string(),
        token_url: "https://github.example/token".to_string(),
        email_allow_list: Vec::new(),
    }];
    let remote = StaticRemote::new("https://github.example/authorize").with_code(
        "code123",
        OAuthUserInfo {
            username: "octocat".to_string(),
            email: "octocat@example.org".to_string(),
            ..OAuthUserInfo::default()
        },
    );
    let store = Arc::new(MemorySecurityStore::new());
    let manager = SecurityManager::new(settings, store.clone())
        .with_oauth_remote("github", Arc::new(remote));

    let state = appforge_security::encode_state(
        &appforge_security::StateArgs::new(),
        "secret",
    )
    .unwrap();
    let request = HttpRequest::builder()
        .path("/oauth-authorized/github")
        .query_string(&format!("code=code123&state={state}"))
        .build();
    let response = oauth_authorized(request, &AuthViewConfig::default(), &manager, "github")
        .await
        .unwrap();
    assert_eq!(response.location(), Some("/"));

    let registered = store.find_user_by_username("octocat").await.unwrap().unwrap();
    assert_eq!(registered.email, "octocat@example.org");
    assert_eq!(registered.login_count, 1);
}

// ── flash persistence across the view boundary ───────────────────────

#[tokio::test]
async fn warning_flash_is_readable_after_failed_login_helper() {
    let mut request = HttpRequest::builder().path("/login/").build();
    appforge_http::flash(&mut request, FlashLevel::Warning, "Invalid login. Please try again.");
    let flashes = peek_flashes(&request);
    assert_eq!(flashes.len(), 1);
    assert!(matches!(flashes[0].level, FlashLevel::Warning));
}
