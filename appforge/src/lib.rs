//! # appforge
//!
//! Authentication and admin scaffolding for Rust web applications.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. You can depend on `appforge` to get the entire framework, or
//! depend on individual crates for finer-grained control.

/// Settings, error types, and logging setup.
pub use appforge_core as core;

/// HTTP layer: request, response, query strings, and flash messages.
#[cfg(feature = "http")]
pub use appforge_http as http;

/// Security: users, roles, permissions, authentication strategies, and
/// password recovery.
#[cfg(feature = "security")]
pub use appforge_security as security;

/// The security admin API: model views, CRUD endpoints, and bulk actions.
#[cfg(feature = "admin")]
pub use appforge_admin as admin;
