use std::net::SocketAddr;

use anyhow::Context;
use tracing::{Level, info};

use sports_server::config::AppConfig;
use sports_server::database::init_db;
use sports_server::seed;
use sports_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = init_db(&config.database)
        .await
        .context("failed to connect to the database")?;
    seed::run(&db, &config.auth).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let app = sports_server::build_router(AppState { db, config });

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
