use cardroom_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment first - config reads from it
    let _ = dotenv::dotenv();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Working directory and logging
    setup_environment(&config)?;

    tracing::info!(
        environment = %config.environment,
        tz = %config.venue_tz,
        "Cardroom server starting..."
    );

    // 4. Initialize state (opens the embedded database)
    let state = ServerState::initialize(&config).await?;

    // 5. Serve until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
