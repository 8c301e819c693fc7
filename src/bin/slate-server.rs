//! Standalone CMS server.
//!
//! Loads a YAML config (path from the first argument, `cms.yaml` by
//! default) and serves until SIGTERM/Ctrl+C.

use anyhow::Result;
use slate::config::CmsConfig;
use slate::server::ServerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "cms.yaml".to_string());
    let config = CmsConfig::from_yaml_file(&path)?;

    ServerBuilder::new(config).serve().await
}
