//! # Slate
//!
//! A pluggable content-management backend for building headless CMS
//! services in Rust.
//!
//! ## Features
//!
//! - **Resource Controllers**: One generic pipeline (authorization →
//!   validation → storage) serving pages, blog posts, and users
//! - **Pluggable Storage**: In-memory, MySQL, and MongoDB engines
//!   behind one capability contract, selected by configuration
//! - **Role Capabilities**: Built-in roles with host extensions merged
//!   over them; unknown roles fail closed
//! - **Bearer Auth**: Token derivation that never rejects a request,
//!   it only widens or narrows what the actor can see
//! - **Plugins**: Registered once, initialized concurrently, receiving
//!   lifecycle hooks in registration order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use slate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CmsConfig::from_yaml_file("cms.yaml")?;
//!     ServerBuilder::new(config)
//!         .register_plugin(AuditPlugin::default())
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod resources;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, Capability, Claims, PermissionRegistry, TokenKeys},
        controller::ResourceController,
        error::{CmsError, CmsResult, DuplicateKind},
        plugins::{Hook, HookArgs, Plugin, PluginAbout, PluginHandler, PluginState},
        resource::{Payload, Resource},
    };

    // === Resources ===
    pub use crate::resources::{BlogPost, Page, User};

    // === Storage ===
    pub use crate::storage::{Backend, BackendDescriptor, Lookup, ResourceStore, StoreError};
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::CmsConfig;

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
