//! # appforge-admin
//!
//! The security admin for the appforge scaffolding framework. It serves a
//! JSON API over the security store:
//!
//! - **Model view configuration** (`model_view`): titles, column labels and
//!   help texts, list/add/edit columns, show-page fieldsets, and base
//!   permissions for each security record type
//! - **List plumbing** (`list`): pagination, case-insensitive search with
//!   password exclusion, ordering, and row serialization
//! - **Bulk actions** (`actions`): role copying and the password-reset and
//!   profile-edit shortcuts
//! - **The site** (`site`): the registry tying views and actions together,
//!   and the Axum router with the CRUD endpoints
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use appforge_admin::site::SecuritySite;
//! use appforge_core::settings::Settings;
//! use appforge_security::manager::SecurityManager;
//! use appforge_security::store::MemorySecurityStore;
//!
//! let manager = SecurityManager::new(
//!     Settings::new("change-me"),
//!     Arc::new(MemorySecurityStore::new()),
//! );
//! let router = SecuritySite::new(Arc::new(manager)).into_axum_router();
//! // Serve `router` with axum.
//! ```

pub mod actions;
pub mod list;
pub mod model_view;
pub mod site;

pub use actions::{
    ActionDescriptor, ActionRegistry, ActionResult, AdminAction, CopyRoleAction,
    ResetMyPasswordAction, ResetPasswordsAction, UserInfoEditAction,
};
pub use list::{ListParams, PageResponse, DEFAULT_PAGE_SIZE};
pub use model_view::{
    permission_model_view, permission_view_model_view, register_user_model_view, role_model_view,
    user_db_model_view, user_model_view, view_menu_model_view, Fieldset, ModelViewConfig,
};
pub use site::{ActionRequest, RolePayload, SecuritySite, UserPayload, USER_HEADER};
