//! Plugin registration and lifecycle hooks.
//!
//! Plugins are registered once by name, initialized concurrently, and
//! then receive lifecycle hooks in registration order. A plugin whose
//! init fails is rejected and never sees a hook; it does not affect
//! the registration or initialization of any other plugin.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Static facts a plugin declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginAbout {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Lifecycle moments plugins can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeLogin,
    LoginSucceeded,
    LoginFailed,
    AfterCreate,
    AfterUpdate,
    AfterDelete,
}

/// Context handed to a hook. Fields are populated per hook: login
/// hooks carry the username, resource hooks carry the kind and the
/// record as it was returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct HookArgs {
    pub resource_kind: Option<&'static str>,
    pub record: Option<Value>,
    pub username: Option<String>,
}

impl HookArgs {
    pub fn for_login(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    pub fn for_record(kind: &'static str, record: Value) -> Self {
        Self {
            resource_kind: Some(kind),
            record: Some(record),
            ..Self::default()
        }
    }
}

/// A host extension. Hooks default to no-ops so a plugin implements
/// only what it cares about.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn about(&self) -> PluginAbout;

    /// Disabled plugins stay registered but are skipped at dispatch.
    fn enabled(&self) -> bool {
        true
    }

    /// One-time setup. Failure rejects the plugin permanently.
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run_hook(&self, _hook: Hook, _args: &HookArgs) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Where a plugin sits in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    Registered,
    Initializing,
    Active,
    Rejected(String),
}

/// Outcome of one registration attempt, reported per plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStatus {
    pub name: String,
    pub state: PluginState,
}

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    state: Arc<RwLock<PluginState>>,
}

/// Owns the plugin list and drives registration, initialization, and
/// hook dispatch.
#[derive(Default)]
pub struct PluginHandler {
    entries: RwLock<Vec<PluginEntry>>,
}

impl PluginHandler {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register and initialize a batch of plugins.
    ///
    /// Registration is idempotent by plugin name: a name already on
    /// the list keeps its existing entry and state. New plugins are
    /// appended in the order given, then initialized concurrently and
    /// independently. Returns the current state of every registered
    /// plugin, earlier batches included.
    pub async fn add_plugins(&self, plugins: Vec<Arc<dyn Plugin>>) -> Vec<PluginStatus> {
        let mut pending = Vec::new();

        {
            let mut entries = self.entries.write().await;
            for plugin in plugins {
                let name = plugin.about().name;
                if entries.iter().any(|e| e.plugin.about().name == name) {
                    tracing::debug!(plugin = %name, "plugin already registered, skipping");
                    continue;
                }
                let state = Arc::new(RwLock::new(PluginState::Registered));
                entries.push(PluginEntry {
                    plugin: Arc::clone(&plugin),
                    state: Arc::clone(&state),
                });
                pending.push((plugin, state));
            }
        }

        let inits = pending.into_iter().map(|(plugin, state)| async move {
            let name = plugin.about().name;
            *state.write().await = PluginState::Initializing;

            let outcome = match plugin.init().await {
                Ok(()) => {
                    tracing::info!(plugin = %name, "plugin activated");
                    PluginState::Active
                }
                Err(err) => {
                    tracing::warn!(plugin = %name, error = %err, "plugin init failed, rejecting");
                    PluginState::Rejected(err.to_string())
                }
            };

            *state.write().await = outcome;
        });
        futures::future::join_all(inits).await;

        self.statuses().await
    }

    /// Current state of every registered plugin, in registration order.
    pub async fn statuses(&self) -> Vec<PluginStatus> {
        let entries = self.entries.read().await;
        let mut statuses = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            statuses.push(PluginStatus {
                name: entry.plugin.about().name,
                state: entry.state.read().await.clone(),
            });
        }
        statuses
    }

    /// Dispatch a hook off the request path. The caller returns
    /// immediately; the hook runs on its own task, so a slow plugin
    /// never delays the triggering request.
    pub fn dispatch_lifecycle_hook(self: &Arc<Self>, hook: Hook, args: HookArgs) {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            handler.run_lifecycle_hook(hook, &args).await;
        });
    }

    /// Deliver a hook to every active, enabled plugin in registration
    /// order. A plugin error is logged and delivery continues; one
    /// plugin can never block another or fail the triggering request.
    pub async fn run_lifecycle_hook(&self, hook: Hook, args: &HookArgs) {
        let targets: Vec<(Arc<dyn Plugin>, Arc<RwLock<PluginState>>)> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .map(|e| (Arc::clone(&e.plugin), Arc::clone(&e.state)))
                .collect()
        };

        for (plugin, state) in targets {
            if !plugin.enabled() {
                continue;
            }
            if *state.read().await != PluginState::Active {
                continue;
            }
            if let Err(err) = plugin.run_hook(hook, args).await {
                tracing::warn!(
                    plugin = %plugin.about().name,
                    hook = ?hook,
                    error = %err,
                    "plugin hook failed"
                );
            }
        }
    }
}
