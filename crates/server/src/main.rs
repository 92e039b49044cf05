//! Arena game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  World: {}x{}", config.world.size, config.world.size);
    info!(
        "  Rooms: {} players, {} gems, {} traps",
        config.room.max_players, config.room.max_gems, config.room.max_traps
    );

    server::net::run(config).await?;

    Ok(())
}
