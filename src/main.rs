//! CodeVault server binary.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codevault::{build_router, config, AppState, Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // Load configuration
    let config = config::init();
    tracing::info!(
        "Starting CodeVault server on {}:{}",
        config.server.host,
        config.server.port
    );
    for (name, missing) in [
        ("GEMINI_API_KEY", config.gemini.api_key.is_none()),
        ("YOUTUBE_API_KEY", config.youtube.api_key.is_none()),
        ("SUPABASE_JWT_SECRET", config.supabase.jwt_secret.is_none()),
        ("SUPABASE_SERVICE_KEY", config.supabase.service_key.is_none()),
    ] {
        if missing {
            tracing::warn!("{} is not set; dependent endpoints will return 500", name);
        }
    }

    // Initialize application state
    let state = AppState::new().await?;
    tracing::info!("Application state initialized");

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid listen address: {}", e)))?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "codevault=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
