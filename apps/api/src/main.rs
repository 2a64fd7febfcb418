use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{store_from_config, AppointmentLifecycleService, ExpiryScheduler};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting appointments API server");

    let config = AppConfig::from_env();

    let store = store_from_config(&config);
    let lifecycle = Arc::new(AppointmentLifecycleService::new(store));

    let scheduler = ExpiryScheduler::new(
        lifecycle.clone(),
        Duration::from_secs(config.expiry_sweep_interval_seconds),
    )
    .start();

    let app = router::create_router(lifecycle)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.shutdown().await;
    info!("Appointments API stopped");

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = match config.cors_allowed_origin.parse() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!(
                "Invalid CORS_ALLOWED_ORIGIN {:?}, allowing any origin",
                config.cors_allowed_origin
            );
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
