//! Relay Gateway: HTTP front for conversation commands on registered instances.
//! Binds to `host:port` from config (default 127.0.0.1:8000).

mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use relay_core::{Dispatcher, LocalInstanceService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewayConfig;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(".env not loaded: {} (using system environment)", e);
    }

    let config = GatewayConfig::load()?;

    let service = Arc::new(LocalInstanceService::new());
    for seed in &config.instances {
        service.register_instance(seed.id.as_str(), seed.name.as_str());
    }
    tracing::info!(
        instances = config.instances.len(),
        relay_core = relay_core::version(),
        "loopback instance service ready"
    );

    let state = AppState::new(Dispatcher::new(service), config.expose_diagnostics);
    let app = routes::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("relay gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
