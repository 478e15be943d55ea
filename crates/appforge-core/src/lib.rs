//! # appforge-core
//!
//! Foundation types for the appforge scaffolding framework:
//!
//! - [`error::ForgeError`] - the framework-wide error enum
//! - [`settings::Settings`] - application configuration, TOML-loadable
//! - [`logging`] - tracing subscriber setup driven by settings

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{ForgeError, ForgeResult};
pub use settings::{AuthType, LazySettings, Settings};
