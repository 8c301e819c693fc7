//! Core abstractions: resources, controllers, auth, validation,
//! plugins, and the error taxonomy.

pub mod auth;
pub mod controller;
pub mod error;
pub mod plugins;
pub mod resource;
pub mod validation;

pub use auth::{AuthContext, Capability, Claims, PermissionRegistry, TokenKeys};
pub use controller::ResourceController;
pub use error::{CmsError, CmsResult, DuplicateKind};
pub use plugins::{Hook, HookArgs, Plugin, PluginAbout, PluginHandler, PluginState, PluginStatus};
pub use resource::{Payload, Resource};
