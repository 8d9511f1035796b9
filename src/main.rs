use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use texture_relay::{api, config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("texture_relay=info,tower_http=info")),
        )
        .init();

    // Load configuration
    config::Config::dotenv_load();
    let config = config::Config::new()?;
    config.log_summary();

    let state = Arc::new(api::AppState::from_config(&config));
    let app = api::router(state);

    let ip: std::net::IpAddr = config.api_host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", config.api_host);
        std::net::IpAddr::from([127, 0, 0, 1])
    });
    let socket_address = SocketAddr::new(ip, config.api_port);
    tracing::info!("Server running at http://{}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
