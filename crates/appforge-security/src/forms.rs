//! Forms for the authentication workflows.
//!
//! - [`LoginForm`] - username and password
//! - [`OpenIdLoginForm`] - OpenID identity URL with remember-me
//! - [`ResetPasswordForm`] - new password with confirmation
//! - [`ForgotPasswordForm`] - email requesting a reset link
//! - [`UserInfoForm`] - the user's own editable profile fields
//!
//! Each form binds a [`QueryDict`], validates field presence and
//! form-specific rules, and exposes its field definitions so views can
//! render a schema for clients. Non-field errors from the view layer
//! (credential failures) are collected under the `__all__` key.

use std::collections::HashMap;

use serde::Serialize;

use appforge_http::QueryDict;

/// The rendering schema for one form field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    /// The field's form name.
    pub name: String,
    /// The human label shown next to the field.
    pub label: String,
    /// The input kind: `text`, `password`, `email`, or `checkbox`.
    pub kind: String,
    /// Whether the field must be non-empty.
    pub required: bool,
}

impl FieldDef {
    fn new(name: &str, label: &str, kind: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: kind.to_string(),
            required,
        }
    }
}

/// Shared bind-and-validate machinery for the concrete forms.
#[derive(Debug, Default)]
struct BoundForm {
    fields: Vec<FieldDef>,
    data: HashMap<String, String>,
    bound: bool,
    errors: HashMap<String, Vec<String>>,
}

impl BoundForm {
    fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    fn bind(&mut self, data: &QueryDict) {
        self.data = self
            .fields
            .iter()
            .filter_map(|f| data.get(&f.name).map(|v| (f.name.clone(), v.to_string())))
            .collect();
        self.bound = true;
        self.errors.clear();
    }

    fn validate_required(&mut self) -> bool {
        for field in &self.fields {
            if field.required && self.data.get(&field.name).map_or(true, |v| v.is_empty()) {
                self.errors
                    .entry(field.name.clone())
                    .or_default()
                    .push("This field is required.".to_string());
            }
        }
        self.errors.is_empty()
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    fn add_error(&mut self, field: &str, error: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(error.into());
    }
}

macro_rules! form_common {
    () => {
        /// Binds form data to this form.
        pub fn bind(&mut self, data: &QueryDict) {
            self.inner.bind(data);
        }

        /// Returns whether this form is bound.
        pub fn is_bound(&self) -> bool {
            self.inner.bound
        }

        /// Returns all form errors keyed by field name.
        pub fn errors(&self) -> &HashMap<String, Vec<String>> {
            &self.inner.errors
        }

        /// Adds a non-field error under the `__all__` key.
        pub fn add_error(&mut self, error: impl Into<String>) {
            self.inner.add_error("__all__", error);
        }

        /// Returns the field definitions for schema rendering.
        pub fn field_defs(&self) -> &[FieldDef] {
            &self.inner.fields
        }
    };
}

// ── LoginForm ───────────────────────────────────────────────────────

/// Login form with username and password fields.
pub struct LoginForm {
    inner: BoundForm,
}

impl LoginForm {
    /// Creates a new unbound login form.
    pub fn new() -> Self {
        Self {
            inner: BoundForm::new(vec![
                FieldDef::new("username", "User Name", "text", true),
                FieldDef::new("password", "Password", "password", true),
            ]),
        }
    }

    form_common!();

    /// Validates field presence.
    ///
    /// Credential verification happens in the view layer, not here.
    pub fn is_valid(&mut self) -> bool {
        self.inner.validate_required()
    }

    /// The submitted username.
    pub fn username(&self) -> Option<&str> {
        self.inner.get("username")
    }

    /// The submitted password.
    pub fn password(&self) -> Option<&str> {
        self.inner.get("password")
    }
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

// ── OpenIdLoginForm ─────────────────────────────────────────────────

/// OpenID login form: an identity URL and a remember-me checkbox.
pub struct OpenIdLoginForm {
    inner: BoundForm,
}

impl OpenIdLoginForm {
    /// Creates a new unbound OpenID login form.
    pub fn new() -> Self {
        Self {
            inner: BoundForm::new(vec![
                FieldDef::new("openid", "OpenID", "text", true),
                FieldDef::new("remember_me", "Remember me", "checkbox", false),
            ]),
        }
    }

    form_common!();

    /// Validates field presence.
    pub fn is_valid(&mut self) -> bool {
        self.inner.validate_required()
    }

    /// The submitted identity URL.
    pub fn openid(&self) -> Option<&str> {
        self.inner.get("openid")
    }

    /// Whether the remember-me box was checked.
    pub fn remember_me(&self) -> bool {
        self.inner
            .get("remember_me")
            .is_some_and(|v| v == "on" || v == "true" || v == "1")
    }
}

impl Default for OpenIdLoginForm {
    fn default() -> Self {
        Self::new()
    }
}

// ── ResetPasswordForm ───────────────────────────────────────────────

/// Password reset form: the new password entered twice.
pub struct ResetPasswordForm {
    inner: BoundForm,
}

impl ResetPasswordForm {
    /// Creates a new unbound reset form.
    pub fn new() -> Self {
        Self {
            inner: BoundForm::new(vec![
                FieldDef::new("password", "Password", "password", true),
                FieldDef::new("conf_password", "Confirm Password", "password", true),
            ]),
        }
    }

    form_common!();

    /// Validates field presence and that the two passwords match.
    pub fn is_valid(&mut self) -> bool {
        if !self.inner.validate_required() {
            return false;
        }
        if self.inner.get("password") != self.inner.get("conf_password") {
            self.inner
                .add_error("conf_password", "Passwords must match");
            return false;
        }
        true
    }

    /// The confirmed new password.
    pub fn password(&self) -> Option<&str> {
        self.inner.get("password")
    }
}

impl Default for ResetPasswordForm {
    fn default() -> Self {
        Self::new()
    }
}

// ── ForgotPasswordForm ──────────────────────────────────────────────

/// Forgot-password form: the email a reset link should go to.
pub struct ForgotPasswordForm {
    inner: BoundForm,
}

impl ForgotPasswordForm {
    /// Creates a new unbound forgot-password form.
    pub fn new() -> Self {
        Self {
            inner: BoundForm::new(vec![FieldDef::new("email", "Email", "email", true)]),
        }
    }

    form_common!();

    /// Validates field presence and a minimal email shape.
    pub fn is_valid(&mut self) -> bool {
        if !self.inner.validate_required() {
            return false;
        }
        if self.inner.get("email").is_some_and(|e| !e.contains('@')) {
            self.inner.add_error("email", "Enter a valid email address.");
            return false;
        }
        true
    }

    /// The submitted email.
    pub fn email(&self) -> Option<&str> {
        self.inner.get("email")
    }
}

impl Default for ForgotPasswordForm {
    fn default() -> Self {
        Self::new()
    }
}

// ── UserInfoForm ────────────────────────────────────────────────────

/// Profile form for the user's own editable fields.
pub struct UserInfoForm {
    inner: BoundForm,
}

impl UserInfoForm {
    /// Creates a new unbound profile form.
    pub fn new() -> Self {
        Self {
            inner: BoundForm::new(vec![
                FieldDef::new("first_name", "First Name", "text", true),
                FieldDef::new("last_name", "Last Name", "text", true),
            ]),
        }
    }

    form_common!();

    /// Validates field presence.
    pub fn is_valid(&mut self) -> bool {
        self.inner.validate_required()
    }

    /// The submitted first name.
    pub fn first_name(&self) -> Option<&str> {
        self.inner.get("first_name")
    }

    /// The submitted last name.
    pub fn last_name(&self) -> Option<&str> {
        self.inner.get("last_name")
    }
}

impl Default for UserInfoForm {
    fn default() -> Self {
        Self::new()
    }
}
