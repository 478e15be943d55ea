//! The security admin site: view registry and router generation.
//!
//! [`SecuritySite`] registers the model view configurations and bulk actions
//! for the security records, then produces an Axum router serving a JSON
//! API: paginated lists with search and ordering, schema introspection,
//! CRUD for users and roles, read-only listings for the authorization
//! primitives, and registration request management.

use std::collections::HashMap;
use std::sync::Arc;

use appforge_core::error::{ForgeError, ForgeResult};
use appforge_security::manager::SecurityManager;
use appforge_security::models::{Role, User};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::actions::{
    ActionRegistry, CopyRoleAction, ResetMyPasswordAction, ResetPasswordsAction, UserInfoEditAction,
};
use crate::list::{
    order_roles, order_users, paginate, register_user_matches, register_user_row, role_matches,
    role_row, user_matches, user_row, ListParams,
};
use crate::model_view::{
    permission_model_view, permission_view_model_view, register_user_model_view, role_model_view,
    user_db_model_view, view_menu_model_view, ModelViewConfig,
};

/// The admin site for the security records.
///
/// Stock model views and actions are registered on construction; both can be
/// replaced or extended before the router is built.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use appforge_admin::site::SecuritySite;
/// use appforge_core::settings::Settings;
/// use appforge_security::manager::SecurityManager;
/// use appforge_security::store::MemorySecurityStore;
///
/// let manager = SecurityManager::new(
///     Settings::new("secret"),
///     Arc::new(MemorySecurityStore::new()),
/// );
/// let router = SecuritySite::new(Arc::new(manager)).into_axum_router();
/// ```
pub struct SecuritySite {
    manager: Arc<SecurityManager>,
    registered_views: HashMap<String, ModelViewConfig>,
    action_registries: HashMap<String, ActionRegistry>,
}

impl SecuritySite {
    /// Creates a site with the stock views and actions registered.
    pub fn new(manager: Arc<SecurityManager>) -> Self {
        let mut site = Self {
            manager,
            registered_views: HashMap::new(),
            action_registries: HashMap::new(),
        };

        site.register(user_db_model_view());
        site.register(role_model_view());
        site.register(permission_model_view());
        site.register(view_menu_model_view());
        site.register(permission_view_model_view());
        site.register(register_user_model_view());

        if let Some(registry) = site.action_registries.get_mut("user") {
            registry.register(Box::new(ResetMyPasswordAction));
            registry.register(Box::new(ResetPasswordsAction));
            registry.register(Box::new(UserInfoEditAction));
        }
        if let Some(registry) = site.action_registries.get_mut("role") {
            registry.register(Box::new(CopyRoleAction));
        }

        site
    }

    /// Registers (or replaces) a model view, keyed by its model name.
    pub fn register(&mut self, config: ModelViewConfig) {
        let key = config.model_name.clone();
        self.registered_views.insert(key.clone(), config);
        self.action_registries
            .entry(key)
            .or_insert_with(ActionRegistry::new);
    }

    /// Removes a model view and its actions.
    pub fn unregister(&mut self, model_name: &str) {
        self.registered_views.remove(model_name);
        self.action_registries.remove(model_name);
    }

    /// Returns the configuration for a registered view, if any.
    pub fn get_view(&self, model_name: &str) -> Option<&ModelViewConfig> {
        self.registered_views.get(model_name)
    }

    /// Returns the mutable action registry for a registered view.
    pub fn get_action_registry_mut(&mut self, model_name: &str) -> Option<&mut ActionRegistry> {
        self.action_registries.get_mut(model_name)
    }

    /// Returns whether a view is registered.
    pub fn is_registered(&self, model_name: &str) -> bool {
        self.registered_views.contains_key(model_name)
    }

    /// Returns the number of registered views.
    pub fn view_count(&self) -> usize {
        self.registered_views.len()
    }

    /// Generates the Axum router with the admin API endpoints.
    ///
    /// The generated routes are:
    ///
    /// - `GET /` - Index of registered views
    /// - `GET /users/schema` - User view schema and actions
    /// - `GET /users/userinfo/` - The calling user's own profile, resolved
    ///   from the `x-forge-user` header set by the authentication layer
    /// - `GET /users/` - List users (paginated)
    /// - `POST /users/` - Create a user (hashes the password)
    /// - `GET /users/{pk}/` - Show a user
    /// - `PUT /users/{pk}/` - Update a user
    /// - `DELETE /users/{pk}/` - Delete a user
    /// - `POST /users/action/` - Execute a user action
    /// - `GET|POST /roles/`, `GET|PUT|DELETE /roles/{pk}/`,
    ///   `POST /roles/action/`, `GET /roles/schema` - Role CRUD and actions
    /// - `GET /permissions/`, `GET /viewmenus/`, `GET /permissionviews/` -
    ///   Read-only authorization primitives (plus their `schema` routes)
    /// - `GET /registeruser/`, `GET|DELETE /registeruser/{pk}/` -
    ///   Registration requests
    pub fn into_axum_router(self) -> Router {
        let shared = Arc::new(SiteState {
            manager: self.manager,
            views: self.registered_views,
            actions: self.action_registries,
        });

        Router::new()
            .route("/", get(handle_index))
            .route("/users/schema", get(handle_user_schema))
            .route("/users/userinfo/", get(handle_userinfo))
            .route("/users/", get(handle_user_list).post(handle_user_create))
            .route(
                "/users/{pk}/",
                get(handle_user_show)
                    .put(handle_user_update)
                    .delete(handle_user_delete),
            )
            .route("/users/action/", axum::routing::post(handle_user_action))
            .route("/roles/schema", get(handle_role_schema))
            .route("/roles/", get(handle_role_list).post(handle_role_create))
            .route(
                "/roles/{pk}/",
                get(handle_role_show)
                    .put(handle_role_update)
                    .delete(handle_role_delete),
            )
            .route("/roles/action/", axum::routing::post(handle_role_action))
            .route("/permissions/schema", get(handle_permission_schema))
            .route("/permissions/", get(handle_permission_list))
            .route("/viewmenus/schema", get(handle_view_menu_schema))
            .route("/viewmenus/", get(handle_view_menu_list))
            .route("/permissionviews/schema", get(handle_permission_view_schema))
            .route("/permissionviews/", get(handle_permission_view_list))
            .route("/registeruser/schema", get(handle_register_user_schema))
            .route("/registeruser/", get(handle_register_user_list))
            .route(
                "/registeruser/{pk}/",
                get(handle_register_user_show).delete(handle_register_user_delete),
            )
            .with_state(shared)
    }
}

impl std::fmt::Debug for SecuritySite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut views: Vec<&str> = self.registered_views.keys().map(String::as_str).collect();
        views.sort_unstable();
        f.debug_struct("SecuritySite")
            .field("view_count", &self.registered_views.len())
            .field("views", &views.join(", "))
            .finish_non_exhaustive()
    }
}

/// Shared state for the Axum handlers.
struct SiteState {
    manager: Arc<SecurityManager>,
    views: HashMap<String, ModelViewConfig>,
    actions: HashMap<String, ActionRegistry>,
}

fn error_response(err: &ForgeError) -> Response {
    (
        err.status_code(),
        axum::Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

fn schema_response(state: &SiteState, model_name: &str) -> Response {
    let Some(config) = state.views.get(model_name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let actions = state
        .actions
        .get(model_name)
        .map(ActionRegistry::descriptors)
        .unwrap_or_default();
    axum::Json(json!({ "config": config, "actions": actions })).into_response()
}

// ── Payloads ────────────────────────────────────────────────────────

const fn default_active() -> bool {
    true
}

/// Request body for creating or updating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    /// Unique username.
    pub username: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Whether the account may authenticate.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Role ids.
    #[serde(default)]
    pub roles: Vec<i64>,
    /// Plaintext password, required on create, ignored on edit.
    pub password: Option<String>,
    /// Password confirmation, must match `password` on create.
    pub conf_password: Option<String>,
}

impl UserPayload {
    /// Validates the payload for the add form: username and a matching
    /// password pair are required.
    pub fn validate_for_add(&self) -> ForgeResult<&str> {
        if self.username.trim().is_empty() {
            return Err(ForgeError::Validation("username is required".to_string()));
        }
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ForgeError::Validation("password is required".to_string()))?;
        if self.conf_password.as_deref() != Some(password) {
            return Err(ForgeError::Validation("Passwords must match".to_string()));
        }
        Ok(password)
    }

    /// Applies the editable columns to an existing user. The password is
    /// never touched here.
    pub fn apply_edit(&self, user: &mut User) {
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
        user.username = self.username.clone();
        user.active = self.active;
        user.email = self.email.clone();
        user.roles = self.roles.clone();
    }
}

/// Request body for creating or updating a role.
#[derive(Debug, Clone, Deserialize)]
pub struct RolePayload {
    /// Unique role name.
    pub name: String,
    /// Permission-view ids granted to the role.
    #[serde(default)]
    pub permission_views: Vec<i64>,
}

/// Request body for executing a bulk action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    /// The action name.
    pub action: String,
    /// Selected record ids.
    #[serde(default)]
    pub ids: Vec<i64>,
}

// ── Index handler ───────────────────────────────────────────────────

async fn handle_index(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    let mut views: Vec<Value> = state
        .views
        .values()
        .map(|config| {
            json!({
                "model_name": config.model_name,
                "route_base": config.route_base,
                "list_title": config.list_title,
                "base_permissions": config.base_permissions,
            })
        })
        .collect();
    views.sort_by_key(|v| v["model_name"].as_str().map(String::from));
    axum::Json(json!({ "views": views }))
}

// ── User handlers ───────────────────────────────────────────────────

async fn role_name_index(state: &SiteState) -> ForgeResult<HashMap<i64, String>> {
    let roles = state.manager.store().all_roles().await?;
    Ok(roles.into_iter().map(|r| (r.id, r.name)).collect())
}

fn resolve_role_names(index: &HashMap<i64, String>, ids: &[i64]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| index.get(id).cloned())
        .collect()
}

async fn handle_user_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "user")
}

/// The header the fronting authentication layer uses to pass the logged-in
/// user's id to the admin API.
pub const USER_HEADER: &str = "x-forge-user";

/// Parses the calling user's id out of the request headers.
fn caller_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

async fn handle_userinfo(
    State(state): State<Arc<SiteState>>,
    headers: HeaderMap,
) -> Response {
    let result: ForgeResult<Response> = async {
        let user_id = caller_id(&headers)
            .ok_or_else(|| ForgeError::Unauthorized("no authenticated user".to_string()))?;
        let Some(user) = state.manager.store().find_user_by_id(user_id).await? else {
            return Err(ForgeError::NotFound(format!("user {user_id}")));
        };
        let index = role_name_index(&state).await?;
        let fieldsets = state
            .views
            .get("user")
            .map(|config| config.user_show_fieldsets.clone())
            .unwrap_or_default();
        Ok(axum::Json(json!({
            "title": "Your user information",
            "fieldsets": fieldsets,
            "user": user_row(&user, &resolve_role_names(&index, &user.roles)),
        }))
        .into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_user_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let mut users = state.manager.store().all_users().await?;
        if let Some(term) = params.search.as_deref().filter(|t| !t.is_empty()) {
            users.retain(|u| user_matches(u, term));
        }
        if let Some(ordering) = params.ordering.as_deref() {
            order_users(&mut users, ordering);
        }
        let index = role_name_index(&state).await?;
        let rows = users
            .iter()
            .map(|u| user_row(u, &resolve_role_names(&index, &u.roles)))
            .collect();
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_user_show(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let Some(user) = state.manager.store().find_user_by_id(pk).await? else {
            return Err(ForgeError::NotFound(format!("user {pk}")));
        };
        let index = role_name_index(&state).await?;
        Ok(axum::Json(user_row(&user, &resolve_role_names(&index, &user.roles))).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_user_create(
    State(state): State<Arc<SiteState>>,
    axum::Json(payload): axum::Json<UserPayload>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let password = payload.validate_for_add()?.to_string();
        let mut user = User::new(payload.username.clone());
        payload.apply_edit(&mut user);
        let created = state.manager.add_user(user, &password).await?;
        let index = role_name_index(&state).await?;
        let row = user_row(&created, &resolve_role_names(&index, &created.roles));
        Ok((StatusCode::CREATED, axum::Json(row)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_user_update(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<UserPayload>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let Some(mut user) = state.manager.store().find_user_by_id(pk).await? else {
            return Err(ForgeError::NotFound(format!("user {pk}")));
        };
        payload.apply_edit(&mut user);
        if let Some(editor) = caller_id(&headers) {
            user.changed_by = Some(editor);
        }
        state.manager.update_user(&mut user).await?;
        let index = role_name_index(&state).await?;
        Ok(axum::Json(user_row(&user, &resolve_role_names(&index, &user.roles))).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_user_delete(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    match state.manager.store().delete_user(pk).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

async fn handle_user_action(
    State(state): State<Arc<SiteState>>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response {
    run_action(&state, "user", &request).await
}

// ── Role handlers ───────────────────────────────────────────────────

/// Display strings for a role's permission grants, e.g. `can_list on Users`.
async fn permission_labels(state: &SiteState, role: &Role) -> ForgeResult<Vec<String>> {
    let store = state.manager.store();
    let permissions: HashMap<i64, String> = store
        .all_permissions()
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let view_menus: HashMap<i64, String> = store
        .all_view_menus()
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();
    let pairs: HashMap<i64, (i64, i64)> = store
        .all_permission_views()
        .await?
        .into_iter()
        .map(|pv| (pv.id, (pv.permission_id, pv.view_menu_id)))
        .collect();
    Ok(role
        .permission_views
        .iter()
        .filter_map(|id| {
            let (permission_id, view_menu_id) = pairs.get(id)?;
            let permission = permissions.get(permission_id)?;
            let view_menu = view_menus.get(view_menu_id)?;
            Some(format!("{permission} on {view_menu}"))
        })
        .collect())
}

async fn handle_role_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "role")
}

async fn handle_role_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let mut roles = state.manager.store().all_roles().await?;
        if let Some(term) = params.search.as_deref().filter(|t| !t.is_empty()) {
            roles.retain(|r| role_matches(r, term));
        }
        if let Some(ordering) = params.ordering.as_deref() {
            order_roles(&mut roles, ordering);
        }
        let mut rows = Vec::with_capacity(roles.len());
        for role in &roles {
            rows.push(role_row(role, &permission_labels(&state, role).await?));
        }
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_role_show(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let Some(role) = state.manager.store().find_role_by_id(pk).await? else {
            return Err(ForgeError::NotFound(format!("role {pk}")));
        };
        let labels = permission_labels(&state, &role).await?;
        Ok(axum::Json(role_row(&role, &labels)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_role_create(
    State(state): State<Arc<SiteState>>,
    axum::Json(payload): axum::Json<RolePayload>,
) -> Response {
    let result: ForgeResult<Response> = async {
        if payload.name.trim().is_empty() {
            return Err(ForgeError::Validation("name is required".to_string()));
        }
        let mut role = Role::new(payload.name.clone());
        role.permission_views = payload.permission_views.clone();
        let created = state.manager.store().add_role(role).await?;
        let labels = permission_labels(&state, &created).await?;
        Ok((StatusCode::CREATED, axum::Json(role_row(&created, &labels))).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_role_update(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
    axum::Json(payload): axum::Json<RolePayload>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let store = state.manager.store();
        let Some(mut role) = store.find_role_by_id(pk).await? else {
            return Err(ForgeError::NotFound(format!("role {pk}")));
        };
        role.name = payload.name.clone();
        role.permission_views = payload.permission_views.clone();
        store.update_role(&role).await?;
        let labels = permission_labels(&state, &role).await?;
        Ok(axum::Json(role_row(&role, &labels)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_role_delete(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    match state.manager.store().delete_role(pk).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

async fn handle_role_action(
    State(state): State<Arc<SiteState>>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response {
    run_action(&state, "role", &request).await
}

async fn run_action(state: &SiteState, model_name: &str, request: &ActionRequest) -> Response {
    let Some(registry) = state.actions.get(model_name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match registry
        .execute(&request.action, &state.manager, &request.ids)
        .await
    {
        Ok(result) => axum::Json(result).into_response(),
        Err(err) => error_response(&err),
    }
}

// ── Authorization primitive handlers ────────────────────────────────

async fn handle_permission_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "permission")
}

async fn handle_permission_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let rows = state
            .manager
            .store()
            .all_permissions()
            .await?
            .iter()
            .map(|p| json!({ "id": p.id, "name": p.name }))
            .collect();
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_view_menu_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "view_menu")
}

async fn handle_view_menu_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let rows = state
            .manager
            .store()
            .all_view_menus()
            .await?
            .iter()
            .map(|v| json!({ "id": v.id, "name": v.name }))
            .collect();
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_permission_view_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "permission_view")
}

async fn handle_permission_view_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let store = state.manager.store();
        let permissions: HashMap<i64, String> = store
            .all_permissions()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let view_menus: HashMap<i64, String> = store
            .all_view_menus()
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();
        let rows = store
            .all_permission_views()
            .await?
            .iter()
            .map(|pv| {
                json!({
                    "id": pv.id,
                    "permission": permissions.get(&pv.permission_id),
                    "view_menu": view_menus.get(&pv.view_menu_id),
                })
            })
            .collect();
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

// ── Registration request handlers ───────────────────────────────────

async fn handle_register_user_schema(State(state): State<Arc<SiteState>>) -> impl IntoResponse {
    schema_response(&state, "register_user")
}

async fn handle_register_user_list(
    State(state): State<Arc<SiteState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let mut requests = state.manager.store().all_register_users().await?;
        if let Some(term) = params.search.as_deref().filter(|t| !t.is_empty()) {
            requests.retain(|r| register_user_matches(r, term));
        }
        let rows = requests.iter().map(register_user_row).collect();
        Ok(axum::Json(paginate(rows, &params)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_register_user_show(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    let result: ForgeResult<Response> = async {
        let requests = state.manager.store().all_register_users().await?;
        let Some(request) = requests.iter().find(|r| r.id == pk) else {
            return Err(ForgeError::NotFound(format!("registration request {pk}")));
        };
        Ok(axum::Json(register_user_row(request)).into_response())
    }
    .await;
    result.unwrap_or_else(|err| error_response(&err))
}

async fn handle_register_user_delete(
    State(state): State<Arc<SiteState>>,
    Path(pk): Path<i64>,
) -> Response {
    match state.manager.store().delete_register_user(pk).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}
