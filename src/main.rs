use libris::config::Config;
use libris::database::{DefaultAuthorRepository, DefaultBookRepository, establish_pool};
use libris::rpc::{AppState, RpcServer, RpcServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = establish_pool(config.database_url()).await?;

    let state = AppState::new(
        DefaultAuthorRepository::new(pool.clone()),
        DefaultBookRepository::new(pool),
    );
    let server_config = RpcServerConfig::new(config.host(), config.server_port());
    let server = RpcServer::new(state, server_config).await?;
    server.run().await
}
