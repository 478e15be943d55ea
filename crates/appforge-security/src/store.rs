//! Persistence seam for security records.
//!
//! [`SecurityStore`] is the data-layer contract the security manager and the
//! admin views talk to. [`MemorySecurityStore`] is the built-in
//! implementation: an `Arc<RwLock<...>>` record set standing in for the ORM,
//! which is an external collaborator of this layer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use appforge_core::error::{ForgeError, ForgeResult};

use crate::models::{
    Permission, PermissionView, RegisterUser, Role, User, UserResetPassword, ViewMenu,
};

/// Data-layer operations for security records.
///
/// All methods are async and implementations must be `Send + Sync`; a real
/// backend would issue database queries here.
#[async_trait]
pub trait SecurityStore: Send + Sync {
    // ── users ────────────────────────────────────────────────────────

    /// Adds a user, assigning its id. Fails on duplicate username.
    async fn add_user(&self, user: User) -> ForgeResult<User>;
    /// Looks up a user by primary key.
    async fn find_user_by_id(&self, id: i64) -> ForgeResult<Option<User>>;
    /// Looks up a user by username.
    async fn find_user_by_username(&self, username: &str) -> ForgeResult<Option<User>>;
    /// Looks up a user by email.
    async fn find_user_by_email(&self, email: &str) -> ForgeResult<Option<User>>;
    /// Returns all users.
    async fn all_users(&self) -> ForgeResult<Vec<User>>;
    /// Persists changes to an existing user.
    async fn update_user(&self, user: &User) -> ForgeResult<()>;
    /// Deletes a user by id.
    async fn delete_user(&self, id: i64) -> ForgeResult<()>;

    // ── roles ────────────────────────────────────────────────────────

    /// Adds a role, assigning its id. Fails on duplicate name.
    async fn add_role(&self, role: Role) -> ForgeResult<Role>;
    /// Looks up a role by primary key.
    async fn find_role_by_id(&self, id: i64) -> ForgeResult<Option<Role>>;
    /// Looks up a role by name.
    async fn find_role_by_name(&self, name: &str) -> ForgeResult<Option<Role>>;
    /// Returns all roles.
    async fn all_roles(&self) -> ForgeResult<Vec<Role>>;
    /// Persists changes to an existing role.
    async fn update_role(&self, role: &Role) -> ForgeResult<()>;
    /// Deletes a role by id.
    async fn delete_role(&self, id: i64) -> ForgeResult<()>;

    // ── authorization primitives ─────────────────────────────────────

    /// Adds (or returns the existing) permission with the given action name.
    async fn add_permission(&self, name: &str) -> ForgeResult<Permission>;
    /// Returns all permissions.
    async fn all_permissions(&self) -> ForgeResult<Vec<Permission>>;
    /// Adds (or returns the existing) view/menu with the given name.
    async fn add_view_menu(&self, name: &str) -> ForgeResult<ViewMenu>;
    /// Returns all view/menus.
    async fn all_view_menus(&self) -> ForgeResult<Vec<ViewMenu>>;
    /// Adds (or returns the existing) permission × view association.
    async fn add_permission_view(
        &self,
        permission_id: i64,
        view_menu_id: i64,
    ) -> ForgeResult<PermissionView>;
    /// Returns all permission-view associations.
    async fn all_permission_views(&self) -> ForgeResult<Vec<PermissionView>>;

    // ── password resets ──────────────────────────────────────────────

    /// Stores a reset record, replacing any existing record for the user.
    async fn save_reset(&self, reset: UserResetPassword) -> ForgeResult<UserResetPassword>;
    /// Returns the pending reset for a user, if any.
    async fn find_reset_by_user(&self, user_id: i64) -> ForgeResult<Option<UserResetPassword>>;
    /// Returns the reset carrying the given hash, if any.
    async fn find_reset_by_hash(&self, reset_hash: &str)
        -> ForgeResult<Option<UserResetPassword>>;
    /// Persists changes to a reset record (the ack flag).
    async fn update_reset(&self, reset: &UserResetPassword) -> ForgeResult<()>;
    /// Removes the reset record for a user.
    async fn delete_reset_for_user(&self, user_id: i64) -> ForgeResult<()>;

    // ── registration requests ────────────────────────────────────────

    /// Stores a self-registration request.
    async fn add_register_user(&self, register: RegisterUser) -> ForgeResult<RegisterUser>;
    /// Returns all pending registration requests.
    async fn all_register_users(&self) -> ForgeResult<Vec<RegisterUser>>;
    /// Deletes a registration request by id.
    async fn delete_register_user(&self, id: i64) -> ForgeResult<()>;
}

#[derive(Debug, Default)]
struct StoreInner {
    users: Vec<User>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    view_menus: Vec<ViewMenu>,
    permission_views: Vec<PermissionView>,
    resets: Vec<UserResetPassword>,
    register_users: Vec<RegisterUser>,
    next_id: i64,
}

impl StoreInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`SecurityStore`] implementation.
#[derive(Debug, Default, Clone)]
pub struct MemorySecurityStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemorySecurityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
#[allow(clippy::significant_drop_tightening)]
impl SecurityStore for MemorySecurityStore {
    async fn add_user(&self, mut user: User) -> ForgeResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(ForgeError::Validation(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        user.id = inner.next_id();
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> ForgeResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> ForgeResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ForgeResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn all_users(&self) -> ForgeResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.clone())
    }

    async fn update_user(&self, user: &User) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| ForgeError::NotFound(format!("user {}", user.id)))?;
        *existing = user.clone();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        if inner.users.len() == before {
            return Err(ForgeError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn add_role(&self, mut role: Role) -> ForgeResult<Role> {
        let mut inner = self.inner.write().await;
        if inner.roles.iter().any(|r| r.name == role.name) {
            return Err(ForgeError::Validation(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        role.id = inner.next_id();
        inner.roles.push(role.clone());
        Ok(role)
    }

    async fn find_role_by_id(&self, id: i64) -> ForgeResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> ForgeResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn all_roles(&self) -> ForgeResult<Vec<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.clone())
    }

    async fn update_role(&self, role: &Role) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| ForgeError::NotFound(format!("role {}", role.id)))?;
        *existing = role.clone();
        Ok(())
    }

    async fn delete_role(&self, id: i64) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let before = inner.roles.len();
        inner.roles.retain(|r| r.id != id);
        if inner.roles.len() == before {
            return Err(ForgeError::NotFound(format!("role {id}")));
        }
        Ok(())
    }

    async fn add_permission(&self, name: &str) -> ForgeResult<Permission> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.permissions.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let permission = Permission {
            id: inner.next_id(),
            name: name.to_string(),
        };
        inner.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn all_permissions(&self) -> ForgeResult<Vec<Permission>> {
        let inner = self.inner.read().await;
        Ok(inner.permissions.clone())
    }

    async fn add_view_menu(&self, name: &str) -> ForgeResult<ViewMenu> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.view_menus.iter().find(|v| v.name == name) {
            return Ok(existing.clone());
        }
        let view_menu = ViewMenu {
            id: inner.next_id(),
            name: name.to_string(),
        };
        inner.view_menus.push(view_menu.clone());
        Ok(view_menu)
    }

    async fn all_view_menus(&self) -> ForgeResult<Vec<ViewMenu>> {
        let inner = self.inner.read().await;
        Ok(inner.view_menus.clone())
    }

    async fn add_permission_view(
        &self,
        permission_id: i64,
        view_menu_id: i64,
    ) -> ForgeResult<PermissionView> {
        let mut inner = self.inner.write().await;
        // Unique per (permission, view) pair.
        if let Some(existing) = inner
            .permission_views
            .iter()
            .find(|pv| pv.permission_id == permission_id && pv.view_menu_id == view_menu_id)
        {
            return Ok(existing.clone());
        }
        let pv = PermissionView {
            id: inner.next_id(),
            permission_id,
            view_menu_id,
        };
        inner.permission_views.push(pv.clone());
        Ok(pv)
    }

    async fn all_permission_views(&self) -> ForgeResult<Vec<PermissionView>> {
        let inner = self.inner.read().await;
        Ok(inner.permission_views.clone())
    }

    async fn save_reset(&self, mut reset: UserResetPassword) -> ForgeResult<UserResetPassword> {
        let mut inner = self.inner.write().await;
        // One pending reset per user.
        let user_id = reset.user_id;
        inner.resets.retain(|r| r.user_id != user_id);
        reset.id = inner.next_id();
        inner.resets.push(reset.clone());
        Ok(reset)
    }

    async fn find_reset_by_user(&self, user_id: i64) -> ForgeResult<Option<UserResetPassword>> {
        let inner = self.inner.read().await;
        Ok(inner.resets.iter().find(|r| r.user_id == user_id).cloned())
    }

    async fn find_reset_by_hash(
        &self,
        reset_hash: &str,
    ) -> ForgeResult<Option<UserResetPassword>> {
        let inner = self.inner.read().await;
        Ok(inner
            .resets
            .iter()
            .find(|r| r.reset_hash == reset_hash)
            .cloned())
    }

    async fn update_reset(&self, reset: &UserResetPassword) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .resets
            .iter_mut()
            .find(|r| r.id == reset.id)
            .ok_or_else(|| ForgeError::NotFound(format!("reset {}", reset.id)))?;
        *existing = reset.clone();
        Ok(())
    }

    async fn delete_reset_for_user(&self, user_id: i64) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        inner.resets.retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn add_register_user(&self, mut register: RegisterUser) -> ForgeResult<RegisterUser> {
        let mut inner = self.inner.write().await;
        register.id = inner.next_id();
        inner.register_users.push(register.clone());
        Ok(register)
    }

    async fn all_register_users(&self) -> ForgeResult<Vec<RegisterUser>> {
        let inner = self.inner.read().await;
        Ok(inner.register_users.clone())
    }

    async fn delete_register_user(&self, id: i64) -> ForgeResult<()> {
        let mut inner = self.inner.write().await;
        let before = inner.register_users.len();
        inner.register_users.retain(|r| r.id != id);
        if inner.register_users.len() == before {
            return Err(ForgeError::NotFound(format!("register user {id}")));
        }
        Ok(())
    }
}
