//! Security model records.
//!
//! These are the framework-managed records the security layer operates on:
//! [`User`], [`Role`], the authorization primitives ([`Permission`],
//! [`ViewMenu`], [`PermissionView`]), the password-reset record
//! ([`UserResetPassword`]), and self-registration requests ([`RegisterUser`]).
//! Persistence lives behind [`crate::store::SecurityStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account with credentials, role memberships, login counters, and
/// audit timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key. Zero until the store assigns one.
    pub id: i64,
    /// Unique username, valid for DB or LDAP authentication.
    pub username: String,
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
    /// Email address; also the identity for OpenID authentication.
    pub email: String,
    /// The hashed password. May hold the unusable marker for externally
    /// authenticated accounts.
    pub password: String,
    /// Inactive users cannot authenticate. Deactivating is preferred over
    /// deleting.
    pub active: bool,
    /// Role ids this user belongs to.
    pub roles: Vec<i64>,
    /// Number of successful logins.
    pub login_count: u32,
    /// Number of consecutive failed login attempts.
    pub fail_login_count: u32,
    /// Timestamp of the last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_on: DateTime<Utc>,
    /// When the record was last changed.
    pub changed_on: DateTime<Utc>,
    /// User id of the creator, if created through the admin.
    pub created_by: Option<i64>,
    /// User id of the last editor.
    pub changed_by: Option<i64>,
}

impl User {
    /// Creates a new active user with the given username.
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            active: true,
            roles: Vec::new(),
            login_count: 0,
            fail_login_count: 0,
            last_login: None,
            created_on: now,
            changed_on: now,
            created_by: None,
            changed_by: None,
        }
    }

    /// The user's full name ("First Last", trimmed).
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether the user belongs to the given role.
    pub fn has_role(&self, role_id: i64) -> bool {
        self.roles.contains(&role_id)
    }
}

/// A named role: a set of permission-view associations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Primary key.
    pub id: i64,
    /// Unique role name.
    pub name: String,
    /// Ids of the [`PermissionView`] associations granted to this role.
    pub permission_views: Vec<i64>,
}

impl Role {
    /// Creates a new role with no permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            permission_views: Vec::new(),
        }
    }

    /// Grants a permission-view to this role. Duplicate grants are no-ops, so
    /// a role's permission set stays unique per view.
    pub fn add_permission_view(&mut self, permission_view_id: i64) {
        if !self.permission_views.contains(&permission_view_id) {
            self.permission_views.push(permission_view_id);
        }
    }

    /// Revokes a permission-view from this role.
    pub fn remove_permission_view(&mut self, permission_view_id: i64) {
        self.permission_views.retain(|&id| id != permission_view_id);
    }
}

/// A base permission: an action name such as `can_list` or `can_edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Primary key.
    pub id: i64,
    /// The action name.
    pub name: String,
}

/// A view or menu resource that permissions attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMenu {
    /// Primary key.
    pub id: i64,
    /// The resource name.
    pub name: String,
}

/// An action × resource pair: a [`Permission`] granted on a [`ViewMenu`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionView {
    /// Primary key.
    pub id: i64,
    /// The permission (action) id.
    pub permission_id: i64,
    /// The view/menu (resource) id.
    pub view_menu_id: i64,
}

/// A pending password reset for one user.
///
/// Single-use: issuing a new reset replaces any existing record for the user,
/// and a completed reset deletes it. The `ack` flag records that the user
/// followed the emailed link; the reset form is unreachable before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResetPassword {
    /// Primary key.
    pub id: i64,
    /// The user this reset belongs to.
    pub user_id: i64,
    /// The random hash carried in the emailed reset link.
    pub reset_hash: String,
    /// Whether the emailed link has been visited.
    pub ack: bool,
    /// When the reset was issued; drives expiry.
    pub created_on: DateTime<Utc>,
}

impl UserResetPassword {
    /// Creates a new, unacknowledged reset record.
    pub fn new(user_id: i64, reset_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            reset_hash: reset_hash.into(),
            ack: false,
            created_on: Utc::now(),
        }
    }

    /// Age of the record in whole seconds.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_on).num_seconds()
    }
}

/// A self-registration request awaiting confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    /// Primary key.
    pub id: i64,
    /// Requested username.
    pub username: String,
    /// Requested email.
    pub email: String,
    /// Hashed password for the account-to-be.
    pub password: String,
    /// When the registration was requested.
    pub registration_date: DateTime<Utc>,
    /// Random hash carried in the confirmation link.
    pub registration_hash: String,
}
