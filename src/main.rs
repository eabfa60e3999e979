use sharp::{build_state, config::ServerConfig, routes::build_router};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ServerConfig::from_env();
    match config.local_state_path.as_deref() {
        Some(path) => tracing::info!("persisting local state to {}", path),
        None => tracing::info!("LOCAL_STATE_PATH not set, state is kept in memory only"),
    }

    let app = build_router(build_state(&config));

    let addr: SocketAddr = config.bind_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("sharp local api listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
