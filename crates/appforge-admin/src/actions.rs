//! Bulk actions on selected records.
//!
//! Actions appear on list and show pages: each has a name, a label, an
//! optional confirmation prompt, and either mutates the store (role copying)
//! or answers with a redirect target (the password-reset and profile-edit
//! shortcuts). The [`ActionRegistry`] holds the actions wired to one model
//! view.

use appforge_core::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use appforge_security::manager::SecurityManager;
use appforge_security::models::Role;
use appforge_security::store::SecurityStore;
use serde::{Deserialize, Serialize};

/// The outcome of executing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action completed.
    pub success: bool,
    /// A message describing the outcome.
    pub message: String,
    /// Number of records affected.
    pub affected_count: usize,
    /// Where the client should navigate next, for redirect-style actions.
    pub redirect_to: Option<String>,
}

impl ActionResult {
    /// A successful mutation result.
    pub fn success(message: impl Into<String>, affected_count: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected_count,
            redirect_to: None,
        }
    }

    /// A failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            affected_count: 0,
            redirect_to: None,
        }
    }

    /// A successful result that sends the client to another page.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            success: true,
            message: String::new(),
            affected_count: 0,
            redirect_to: Some(url.into()),
        }
    }
}

/// Static description of an action, served to the frontend alongside the
/// model view schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Unique identifier.
    pub name: String,
    /// Button label.
    pub label: String,
    /// Confirmation prompt shown before executing, if any.
    pub confirmation: Option<String>,
    /// Whether the action applies to multiple selected records.
    pub multiple: bool,
}

/// An action that can be executed on selected records.
#[async_trait]
pub trait AdminAction: Send + Sync {
    /// Unique identifier for this action.
    fn name(&self) -> &str;

    /// Human-readable button label.
    fn label(&self) -> &str;

    /// Confirmation prompt shown before executing.
    fn confirmation(&self) -> Option<&str> {
        None
    }

    /// Whether the action accepts more than one selected record.
    fn multiple(&self) -> bool {
        true
    }

    /// Executes the action on the selected record ids.
    async fn execute(
        &self,
        manager: &SecurityManager,
        selected_ids: &[i64],
    ) -> ForgeResult<ActionResult>;

    /// The static descriptor for this action.
    fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            name: self.name().to_string(),
            label: self.label().to_string(),
            confirmation: self.confirmation().map(String::from),
            multiple: self.multiple(),
        }
    }
}

fn single_selection(selected_ids: &[i64]) -> Option<i64> {
    match selected_ids {
        [id] => Some(*id),
        _ => None,
    }
}

/// Copies the selected roles, appending " copy" to each name. The copies
/// carry the same permission grants as the originals.
#[derive(Debug)]
pub struct CopyRoleAction;

#[async_trait]
impl AdminAction for CopyRoleAction {
    fn name(&self) -> &'static str {
        "copyrole"
    }

    fn label(&self) -> &'static str {
        "Copy Role"
    }

    fn confirmation(&self) -> Option<&'static str> {
        Some("Copy the selected roles?")
    }

    async fn execute(
        &self,
        manager: &SecurityManager,
        selected_ids: &[i64],
    ) -> ForgeResult<ActionResult> {
        if selected_ids.is_empty() {
            return Ok(ActionResult::failure("No roles selected."));
        }
        let store = manager.store();
        let mut copied = 0;
        for &id in selected_ids {
            let Some(role) = store.find_role_by_id(id).await? else {
                continue;
            };
            let mut copy = Role::new(format!("{} copy", role.name));
            copy.permission_views = role.permission_views.clone();
            store.add_role(copy).await?;
            copied += 1;
        }
        Ok(ActionResult::success(
            format!("Copied {copied} role(s)."),
            copied,
        ))
    }
}

/// Sends the current user to their own password-reset form.
#[derive(Debug)]
pub struct ResetMyPasswordAction;

#[async_trait]
impl AdminAction for ResetMyPasswordAction {
    fn name(&self) -> &'static str {
        "resetmypassword"
    }

    fn label(&self) -> &'static str {
        "Reset my password"
    }

    fn multiple(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _manager: &SecurityManager,
        _selected_ids: &[i64],
    ) -> ForgeResult<ActionResult> {
        Ok(ActionResult::redirect("/resetmypassword/form"))
    }
}

/// Sends an administrator to the reset form for the selected user.
#[derive(Debug)]
pub struct ResetPasswordsAction;

#[async_trait]
impl AdminAction for ResetPasswordsAction {
    fn name(&self) -> &'static str {
        "resetpasswords"
    }

    fn label(&self) -> &'static str {
        "Reset Password"
    }

    fn multiple(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _manager: &SecurityManager,
        selected_ids: &[i64],
    ) -> ForgeResult<ActionResult> {
        let Some(pk) = single_selection(selected_ids) else {
            return Ok(ActionResult::failure("Select exactly one user."));
        };
        Ok(ActionResult::redirect(format!("/resetpassword/form?pk={pk}")))
    }
}

/// Sends the current user to the profile edit form.
#[derive(Debug)]
pub struct UserInfoEditAction;

#[async_trait]
impl AdminAction for UserInfoEditAction {
    fn name(&self) -> &'static str {
        "userinfoedit"
    }

    fn label(&self) -> &'static str {
        "Edit User"
    }

    fn multiple(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _manager: &SecurityManager,
        _selected_ids: &[i64],
    ) -> ForgeResult<ActionResult> {
        Ok(ActionResult::redirect("/userinfoeditview/form"))
    }
}

/// The actions wired to one model view.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn AdminAction>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action.
    pub fn register(&mut self, action: Box<dyn AdminAction>) {
        self.actions.push(action);
    }

    /// Returns the names of all registered actions.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Returns the static descriptors of all registered actions.
    pub fn descriptors(&self) -> Vec<ActionDescriptor> {
        self.actions.iter().map(|a| a.descriptor()).collect()
    }

    /// Finds and executes an action by name.
    pub async fn execute(
        &self,
        action_name: &str,
        manager: &SecurityManager,
        selected_ids: &[i64],
    ) -> ForgeResult<ActionResult> {
        let action = self
            .actions
            .iter()
            .find(|a| a.name() == action_name)
            .ok_or_else(|| ForgeError::NotFound(format!("Action '{action_name}' not found")))?;
        action.execute(manager, selected_ids).await
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_count", &self.actions.len())
            .field("actions", &self.action_names())
            .finish()
    }
}
