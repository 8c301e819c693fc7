//! Configuration loading and management

use crate::core::auth::Capability;
use crate::storage::BackendDescriptor;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_token_ttl() -> i64 {
    24 * 60 * 60
}

/// Complete configuration for a CMS server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Secret used to sign and verify auth tokens. Injected here, the
    /// auth layer never reads the environment itself.
    pub auth_secret: String,

    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    /// Which storage engine backs the controllers.
    #[serde(default = "BackendDescriptor::memory")]
    pub backend: BackendDescriptor,

    /// Host-defined roles, merged over the built-ins. A role listed
    /// here replaces the built-in of the same name.
    #[serde(default)]
    pub roles: HashMap<String, HashSet<Capability>>,
}

impl CmsConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_secret: "insecure-test-secret".to_string(),
            token_ttl_secs: default_token_ttl(),
            backend: BackendDescriptor::memory(),
            roles: HashMap::new(),
        }
    }
}
