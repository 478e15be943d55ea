//! Model view configuration for the security admin.
//!
//! A [`ModelViewConfig`] describes how one security record type is presented
//! and managed: which columns appear in lists and forms, the human-readable
//! labels and descriptions, the show-page fieldset groupings, and the base
//! permissions the view exposes. The canned constructors at the bottom of
//! this module build the configurations for the framework-managed records
//! (users, roles, permissions, view menus, registration requests).

use serde::{Deserialize, Serialize};

/// Configuration for how a security record type is displayed and managed.
///
/// Built with a builder pattern; the canned constructors such as
/// [`user_db_model_view`] produce the stock configurations.
///
/// # Examples
///
/// ```
/// use appforge_admin::model_view::ModelViewConfig;
///
/// let config = ModelViewConfig::new("/widgets", "widget")
///     .list_title("List Widgets")
///     .list_columns(vec!["name", "size"])
///     .order_columns(vec!["name"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelViewConfig {
    /// URL prefix for all routes of this view (e.g. `/users`).
    pub route_base: String,
    /// The record type name in lowercase (e.g. `user`).
    pub model_name: String,
    /// Title for the list page.
    pub list_title: String,
    /// Title for the show page.
    pub show_title: String,
    /// Title for the add form.
    pub add_title: String,
    /// Title for the edit form.
    pub edit_title: String,
    /// Column name to human-readable label, in display order.
    pub label_columns: Vec<(String, String)>,
    /// Column name to help text shown on forms.
    pub description_columns: Vec<(String, String)>,
    /// Columns shown in the list view.
    pub list_columns: Vec<String>,
    /// Columns available in add forms.
    pub add_columns: Vec<String>,
    /// Columns available in edit forms.
    pub edit_columns: Vec<String>,
    /// Columns shown on the show page, when fieldsets are not used.
    pub show_columns: Vec<String>,
    /// Fieldset groupings for the show page.
    pub show_fieldsets: Vec<Fieldset>,
    /// Fieldset groupings for a user's own profile page.
    pub user_show_fieldsets: Vec<Fieldset>,
    /// Columns the search box must never match against.
    pub search_exclude_columns: Vec<String>,
    /// Columns the list can be ordered by.
    pub order_columns: Vec<String>,
    /// The operations this view exposes (e.g. `can_list`, `can_show`).
    pub base_permissions: Vec<String>,
}

impl ModelViewConfig {
    /// Creates a new configuration with full CRUD permissions and the
    /// given route prefix.
    pub fn new(route_base: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            route_base: route_base.into(),
            model_name: model_name.into(),
            list_title: String::new(),
            show_title: String::new(),
            add_title: String::new(),
            edit_title: String::new(),
            label_columns: Vec::new(),
            description_columns: Vec::new(),
            list_columns: Vec::new(),
            add_columns: Vec::new(),
            edit_columns: Vec::new(),
            show_columns: Vec::new(),
            show_fieldsets: Vec::new(),
            user_show_fieldsets: Vec::new(),
            search_exclude_columns: Vec::new(),
            order_columns: Vec::new(),
            base_permissions: vec![
                "can_list".to_string(),
                "can_show".to_string(),
                "can_add".to_string(),
                "can_edit".to_string(),
                "can_delete".to_string(),
            ],
        }
    }

    /// Sets the list page title.
    #[must_use]
    pub fn list_title(mut self, title: impl Into<String>) -> Self {
        self.list_title = title.into();
        self
    }

    /// Sets the show page title.
    #[must_use]
    pub fn show_title(mut self, title: impl Into<String>) -> Self {
        self.show_title = title.into();
        self
    }

    /// Sets the add form title.
    #[must_use]
    pub fn add_title(mut self, title: impl Into<String>) -> Self {
        self.add_title = title.into();
        self
    }

    /// Sets the edit form title.
    #[must_use]
    pub fn edit_title(mut self, title: impl Into<String>) -> Self {
        self.edit_title = title.into();
        self
    }

    /// Sets the column labels, in display order.
    #[must_use]
    pub fn label_columns(mut self, labels: Vec<(&str, &str)>) -> Self {
        self.label_columns = labels
            .into_iter()
            .map(|(c, l)| (c.to_string(), l.to_string()))
            .collect();
        self
    }

    /// Sets the column help texts.
    #[must_use]
    pub fn description_columns(mut self, descriptions: Vec<(&str, &str)>) -> Self {
        self.description_columns = descriptions
            .into_iter()
            .map(|(c, d)| (c.to_string(), d.to_string()))
            .collect();
        self
    }

    /// Sets the list view columns.
    #[must_use]
    pub fn list_columns(mut self, columns: Vec<&str>) -> Self {
        self.list_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the add form columns.
    #[must_use]
    pub fn add_columns(mut self, columns: Vec<&str>) -> Self {
        self.add_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the edit form columns.
    #[must_use]
    pub fn edit_columns(mut self, columns: Vec<&str>) -> Self {
        self.edit_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the show page columns.
    #[must_use]
    pub fn show_columns(mut self, columns: Vec<&str>) -> Self {
        self.show_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the show page fieldsets.
    #[must_use]
    pub fn show_fieldsets(mut self, fieldsets: Vec<Fieldset>) -> Self {
        self.show_fieldsets = fieldsets;
        self
    }

    /// Sets the fieldsets for a user's own profile page.
    #[must_use]
    pub fn user_show_fieldsets(mut self, fieldsets: Vec<Fieldset>) -> Self {
        self.user_show_fieldsets = fieldsets;
        self
    }

    /// Sets the columns excluded from search.
    #[must_use]
    pub fn search_exclude_columns(mut self, columns: Vec<&str>) -> Self {
        self.search_exclude_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the orderable columns.
    #[must_use]
    pub fn order_columns(mut self, columns: Vec<&str>) -> Self {
        self.order_columns = columns.into_iter().map(String::from).collect();
        self
    }

    /// Sets the base permissions.
    #[must_use]
    pub fn base_permissions(mut self, permissions: Vec<&str>) -> Self {
        self.base_permissions = permissions.into_iter().map(String::from).collect();
        self
    }

    /// The label for a column, if one is configured.
    pub fn label_for(&self, column: &str) -> Option<&str> {
        self.label_columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, l)| l.as_str())
    }

    /// Whether the view exposes the given operation.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.base_permissions.iter().any(|p| p == permission)
    }

    /// Whether the search box may match against the given column.
    pub fn searchable(&self, column: &str) -> bool {
        !self.search_exclude_columns.iter().any(|c| c == column)
    }
}

/// A grouping of columns on the show page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fieldset {
    /// Display name of the group.
    pub label: String,
    /// The columns in this group.
    pub fields: Vec<String>,
    /// Whether the group is rendered expanded.
    pub expanded: bool,
}

impl Fieldset {
    /// Creates a new expanded fieldset.
    pub fn new(label: impl Into<String>, fields: Vec<&str>) -> Self {
        Self {
            label: label.into(),
            fields: fields.into_iter().map(String::from).collect(),
            expanded: true,
        }
    }

    /// Renders this fieldset collapsed by default.
    #[must_use]
    pub const fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }
}

// ── Canned configurations ───────────────────────────────────────────

/// The base user view configuration, shared by every authentication type.
pub fn user_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/users", "user")
        .list_title("List Users")
        .show_title("Show User")
        .add_title("Add User")
        .edit_title("Edit User")
        .label_columns(vec![
            ("full_name", "Full Name"),
            ("first_name", "First Name"),
            ("last_name", "Last Name"),
            ("username", "User Name"),
            ("password", "Password"),
            ("active", "Is Active?"),
            ("email", "Email"),
            ("roles", "Role"),
            ("last_login", "Last login"),
            ("login_count", "Login count"),
            ("fail_login_count", "Failed login count"),
            ("created_on", "Created on"),
            ("created_by", "Created by"),
            ("changed_on", "Changed on"),
            ("changed_by", "Changed by"),
        ])
        .description_columns(vec![
            ("first_name", "Write the user first name or names"),
            ("last_name", "Write the user last name"),
            (
                "username",
                "Username valid for authentication on DB or LDAP, unused for OID auth",
            ),
            (
                "password",
                "Please use a good password policy, this application does not check this for you",
            ),
            (
                "active",
                "It's not a good policy to remove a user, just make it inactive",
            ),
            (
                "email",
                "The user's email, this will also be used for OID auth",
            ),
            (
                "roles",
                "The user role on the application, this will associate with a list of permissions",
            ),
            (
                "conf_password",
                "Please rewrite the user's password to confirm",
            ),
        ])
        .list_columns(vec![
            "first_name",
            "last_name",
            "username",
            "email",
            "active",
            "roles",
        ])
        .show_fieldsets(vec![
            Fieldset::new("User info", vec!["username", "active", "roles", "login_count"]),
            Fieldset::new("Personal Info", vec!["first_name", "last_name", "email"]),
            Fieldset::new(
                "Audit Info",
                vec![
                    "last_login",
                    "fail_login_count",
                    "created_on",
                    "created_by",
                    "changed_on",
                    "changed_by",
                ],
            )
            .collapsed(),
        ])
        .user_show_fieldsets(vec![
            Fieldset::new("User info", vec!["username", "active", "roles", "login_count"]),
            Fieldset::new("Personal Info", vec!["first_name", "last_name", "email"]),
        ])
        .search_exclude_columns(vec!["password"])
        .add_columns(vec![
            "first_name",
            "last_name",
            "username",
            "active",
            "email",
            "roles",
        ])
        .edit_columns(vec![
            "first_name",
            "last_name",
            "username",
            "active",
            "email",
            "roles",
        ])
        .order_columns(vec!["first_name", "last_name", "username", "email"])
}

/// The user view for database authentication: adds the password pair to the
/// add form.
pub fn user_db_model_view() -> ModelViewConfig {
    user_model_view().add_columns(vec![
        "first_name",
        "last_name",
        "username",
        "active",
        "email",
        "roles",
        "password",
        "conf_password",
    ])
}

/// The role view configuration.
pub fn role_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/roles", "role")
        .list_title("List Roles")
        .show_title("Show Role")
        .add_title("Add Role")
        .edit_title("Edit Role")
        .label_columns(vec![("name", "Name"), ("permissions", "Permissions")])
        .list_columns(vec!["name", "permissions"])
        .show_columns(vec!["name", "permissions"])
        .add_columns(vec!["name", "permissions"])
        .edit_columns(vec!["name", "permissions"])
        .order_columns(vec!["name"])
}

/// The list-only base permission view configuration.
pub fn permission_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/permissions", "permission")
        .list_title("List Base Permissions")
        .show_title("Show Base Permission")
        .add_title("Add Base Permission")
        .edit_title("Edit Base Permission")
        .label_columns(vec![("name", "Name")])
        .list_columns(vec!["name"])
        .base_permissions(vec!["can_list"])
}

/// The list-only view menu configuration.
pub fn view_menu_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/viewmenus", "view_menu")
        .list_title("List View Menus")
        .show_title("Show View Menu")
        .add_title("Add View Menu")
        .edit_title("Edit View Menu")
        .label_columns(vec![("name", "Name")])
        .list_columns(vec!["name"])
        .base_permissions(vec!["can_list"])
}

/// The list-only permission-on-view configuration.
pub fn permission_view_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/permissionviews", "permission_view")
        .list_title("List Permissions on Views/Menus")
        .show_title("Show Permission on Views/Menus")
        .add_title("Add Permission on Views/Menus")
        .edit_title("Edit Permission on Views/Menus")
        .label_columns(vec![("permission", "Permission"), ("view_menu", "View/Menu")])
        .list_columns(vec!["permission", "view_menu"])
        .base_permissions(vec!["can_list"])
}

/// The registration request view: list, show, and delete only.
pub fn register_user_model_view() -> ModelViewConfig {
    ModelViewConfig::new("/registeruser", "register_user")
        .list_title("List of Registration Requests")
        .show_title("Show Registration")
        .list_columns(vec!["username", "registration_date", "email"])
        .search_exclude_columns(vec!["password"])
        .base_permissions(vec!["can_list", "can_show", "can_delete"])
}
