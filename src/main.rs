use anyhow::Result;
use promptgate::config::Config;
use promptgate::http::start_http_server;
use promptgate::server::PromptGateServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    promptgate::load_env();

    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.runtime.log_level.clone())),
        )
        .init();

    info!("Starting promptgate server");

    let server = PromptGateServer::new(config)?;
    info!(
        catalog_version = %server.catalog.version,
        modules = server.catalog.modules.len(),
        "Catalog loaded"
    );

    start_http_server(server).await?;

    Ok(())
}
