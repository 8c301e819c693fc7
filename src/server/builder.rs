//! ServerBuilder wiring configuration into a running router.

use super::handlers::{self, AppState};
use crate::config::CmsConfig;
use crate::core::auth::{PermissionRegistry, TokenKeys};
use crate::core::controller::ResourceController;
use crate::core::plugins::{Plugin, PluginHandler, PluginStatus};
use crate::storage::Backend;
use anyhow::Result;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the application from a [`CmsConfig`]: resolves the storage
/// backend, merges host roles over the built-ins, registers plugins,
/// and produces the router.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new(CmsConfig::from_yaml_file("cms.yaml")?)
///     .register_plugin(AuditPlugin::default())
///     .build()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: CmsConfig,
    plugins: Vec<Arc<dyn Plugin>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new(config: CmsConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Register a plugin. Initialization happens during `build`.
    pub fn register_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Add routes that don't fit the resource pattern (webhooks,
    /// custom business endpoints).
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared state: backend, permissions, plugins, keys.
    pub async fn build_state(&self) -> Result<(AppState, Vec<PluginStatus>)> {
        let backend = Backend::resolve(&self.config.backend)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown storage engine: {:?}",
                    self.config.backend.engine
                )
            })?;
        backend.provision().await?;

        let mut permissions = PermissionRegistry::with_builtins();
        for (role, capabilities) in &self.config.roles {
            permissions.extend(role.clone(), capabilities.clone());
        }
        let permissions = Arc::new(permissions);

        let plugins = Arc::new(PluginHandler::new());
        let statuses = plugins.add_plugins(self.plugins.clone()).await;

        let state = AppState {
            pages: ResourceController::new(
                backend.make_store(),
                Arc::clone(&permissions),
                Arc::clone(&plugins),
            ),
            blog_posts: ResourceController::new(
                backend.make_store(),
                Arc::clone(&permissions),
                Arc::clone(&plugins),
            ),
            users: ResourceController::new(
                backend.make_store(),
                Arc::clone(&permissions),
                Arc::clone(&plugins),
            ),
            permissions,
            plugins,
            keys: TokenKeys::new(self.config.auth_secret.as_bytes()),
            token_ttl_secs: self.config.token_ttl_secs,
        };

        Ok((state, statuses))
    }

    /// Build the final router.
    pub async fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let (state, _statuses) = self.build_state().await?;

        let mut app = router(state);
        for routes in custom_routes {
            app = app.merge(routes);
        }
        Ok(app)
    }

    /// Serve the application with graceful shutdown on SIGTERM/Ctrl+C.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr.clone();
        let app = self.build().await?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// All routes, GET for reads and POST for mutations.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/login", post(handlers::login))
        .route(
            "/api/pages",
            get(handlers::list_pages).post(handlers::create_page),
        )
        .route(
            "/api/pages/{selector}",
            get(handlers::get_page).post(handlers::update_page),
        )
        .route("/api/pages/{selector}/delete", post(handlers::delete_page))
        .route(
            "/api/blog-posts",
            get(handlers::list_blog_posts).post(handlers::create_blog_post),
        )
        .route(
            "/api/blog-posts/{selector}",
            get(handlers::get_blog_post).post(handlers::update_blog_post),
        )
        .route(
            "/api/blog-posts/{selector}/delete",
            post(handlers::delete_blog_post),
        )
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/users/update", post(handlers::update_user))
        .route("/api/users/delete", post(handlers::delete_user))
        .route("/api/users/{selector}", get(handlers::get_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
