//! # appforge-security
//!
//! The security layer of the appforge scaffolding framework:
//!
//! - **User, role, and permission records** (`models`) behind a pluggable
//!   store (`store`)
//! - **Password hashing** with Argon2 and legacy PBKDF2 verification
//!   (`hashers`)
//! - **The security manager** (`manager`) owning the authentication
//!   strategies: database, LDAP, OpenID, OAuth, and reverse-proxy remote user
//! - **Password-reset lifecycle**: emailed single-use reset hashes with
//!   acknowledgement and expiry
//! - **OAuth plumbing** (`oauth`): provider registry, signed state tokens,
//!   email allow-lists
//! - **Auth views** (`views`) and **recovery views** (`recovery`) that wire
//!   HTTP requests to the manager
//!
//! ## Design Principles
//!
//! CPU-bound cryptographic work (password hashing) runs via
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime. The
//! view layer never decides authentication outcomes itself; it delegates to
//! [`manager::SecurityManager`] and translates results into flashes and
//! redirects.

pub mod forms;
pub mod hashers;
pub mod ldap;
pub mod manager;
pub mod models;
pub mod oauth;
pub mod openid;
pub mod recovery;
pub mod session;
pub mod store;
pub mod views;

pub use forms::{
    FieldDef, ForgotPasswordForm, LoginForm, OpenIdLoginForm, ResetPasswordForm, UserInfoForm,
};
pub use hashers::{
    check_password, is_password_usable, make_password, unusable_password, PasswordHasher,
};
pub use ldap::{bind_dn, LdapConnector, LdapEntry, StaticDirectory};
pub use manager::{EmailSender, LogEmailSender, SecurityManager};
pub use models::{
    Permission, PermissionView, RegisterUser, Role, User, UserResetPassword, ViewMenu,
};
pub use oauth::{
    decode_state, email_allowed, encode_state, OAuthRemote, OAuthToken, OAuthUserInfo, StateArgs,
    StaticRemote,
};
pub use openid::{OidResolver, StaticOidResolver};
pub use recovery::RecoveryViewConfig;
pub use session::{
    get_user_id, is_authenticated, login_to_session, logout_from_session, remember_me,
    store_remember_me,
};
pub use store::{MemorySecurityStore, SecurityStore};
pub use views::AuthViewConfig;
