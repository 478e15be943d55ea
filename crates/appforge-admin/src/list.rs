//! List view plumbing: pagination, search, ordering, and row serialization.
//!
//! The list endpoints of the admin accept `page`, `page_size`, `search`, and
//! `ordering` query parameters. The helpers here apply those to in-memory
//! record vectors and shape the rows the frontend consumes. Passwords never
//! appear in any serialized row.

use appforge_security::models::{RegisterUser, Role, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default page size for list views.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<usize>,
    /// Rows per page.
    pub page_size: Option<usize>,
    /// Case-insensitive substring search.
    pub search: Option<String>,
    /// Column to order by; prefix with `-` for descending.
    pub ordering: Option<String>,
}

impl ListParams {
    /// Creates empty parameters (first page, defaults).
    pub fn new() -> Self {
        Self::default()
    }
}

/// One page of serialized rows, with the total count before paging.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    /// Total number of rows matching the search, across all pages.
    pub count: usize,
    /// The page these rows belong to.
    pub page: usize,
    /// The page size used.
    pub page_size: usize,
    /// The rows on this page.
    pub results: Vec<Value>,
}

/// Slices a filtered row set down to the requested page.
pub fn paginate(rows: Vec<Value>, params: &ListParams) -> PageResponse {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let count = rows.len();
    let start = (page - 1) * page_size;
    let results = if start >= count {
        Vec::new()
    } else {
        rows.into_iter().skip(start).take(page_size).collect()
    };
    PageResponse {
        count,
        page,
        page_size,
        results,
    }
}

// ── Search ──────────────────────────────────────────────────────────

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether a user matches the search term. The password column is excluded
/// from search.
pub fn user_matches(user: &User, term: &str) -> bool {
    contains_ci(&user.username, term)
        || contains_ci(&user.first_name, term)
        || contains_ci(&user.last_name, term)
        || contains_ci(&user.email, term)
}

/// Whether a role matches the search term.
pub fn role_matches(role: &Role, term: &str) -> bool {
    contains_ci(&role.name, term)
}

/// Whether a registration request matches the search term. The password
/// column is excluded from search.
pub fn register_user_matches(request: &RegisterUser, term: &str) -> bool {
    contains_ci(&request.username, term) || contains_ci(&request.email, term)
}

// ── Ordering ────────────────────────────────────────────────────────

fn split_ordering(ordering: &str) -> (&str, bool) {
    ordering
        .strip_prefix('-')
        .map_or((ordering, false), |column| (column, true))
}

/// Sorts users by the given column, `-column` for descending. Unknown
/// columns leave the order untouched.
pub fn order_users(users: &mut [User], ordering: &str) {
    let (column, descending) = split_ordering(ordering);
    let key: fn(&User) -> String = match column {
        "username" => |u| u.username.to_lowercase(),
        "first_name" => |u| u.first_name.to_lowercase(),
        "last_name" => |u| u.last_name.to_lowercase(),
        "email" => |u| u.email.to_lowercase(),
        _ => return,
    };
    users.sort_by_key(key);
    if descending {
        users.reverse();
    }
}

/// Sorts roles by name, `-name` for descending.
pub fn order_roles(roles: &mut [Role], ordering: &str) {
    let (column, descending) = split_ordering(ordering);
    if column != "name" {
        return;
    }
    roles.sort_by_key(|r| r.name.to_lowercase());
    if descending {
        roles.reverse();
    }
}

// ── Row serialization ───────────────────────────────────────────────

/// Serializes a user for list and show pages. The hashed password is never
/// included; role ids are resolved to names by the caller.
pub fn user_row(user: &User, role_names: &[String]) -> Value {
    json!({
        "id": user.id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "full_name": user.full_name(),
        "username": user.username,
        "email": user.email,
        "active": user.active,
        "roles": role_names,
        "login_count": user.login_count,
        "fail_login_count": user.fail_login_count,
        "last_login": user.last_login,
        "created_on": user.created_on,
        "created_by": user.created_by,
        "changed_on": user.changed_on,
        "changed_by": user.changed_by,
    })
}

/// Serializes a role with its permissions rendered as display strings.
pub fn role_row(role: &Role, permissions: &[String]) -> Value {
    json!({
        "id": role.id,
        "name": role.name,
        "permissions": permissions,
    })
}

/// Serializes a registration request. The stored password hash is excluded.
pub fn register_user_row(request: &RegisterUser) -> Value {
    json!({
        "id": request.id,
        "username": request.username,
        "email": request.email,
        "registration_date": request.registration_date,
    })
}
