//! ADS-B Aggregator - Beast receiver feed to live WebSocket snapshots
//!
//! Connects to a receiver's Beast output, decodes Mode S/ADS-B, aggregates
//! per-aircraft state and pushes snapshots to browser clients.

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adsb_aggregator::config::Config;
use adsb_aggregator::runtime::Runtime;
use adsb_aggregator::web;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adsb_aggregator=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("===========================================");
    info!("   ADS-B Aggregator - Beast feed");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env();

    info!("Configuration:");
    info!("  Receiver: {}", config.upstream_addr());
    info!("  Stale timeout: {:?}", config.stale_timeout);
    info!("  Trail: {} points, min move {}°", config.trail_max_points, config.trail_min_displacement_deg);
    info!("  Broadcast interval: {:?}", config.broadcast_interval);
    info!("  Reconnect delay: {:?}", config.reconnect_delay);
    if config.synthetic_fallback {
        info!(
            "  Synthetic fallback: {} aircraft around {}:{}",
            config.synthetic_aircraft, config.synthetic_center.lat, config.synthetic_center.lon
        );
    } else {
        info!("  Synthetic fallback: disabled");
    }
    match config.receiver_location {
        Some(loc) => info!("  Receiver location: {}:{}", loc.lat, loc.lon),
        None => info!("  Receiver location: unset, coverage stats disabled"),
    }

    let runtime = Runtime::start(&config);
    let app = web::router(runtime.app_state());

    // Start HTTP/WebSocket server
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;
    info!("Starting HTTP/WebSocket server on {}", http_addr);

    let cancel = runtime.cancel_token();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
            _ = cancel.cancelled() => {}
        }
    });

    if let Err(e) = server.await {
        error!("HTTP server error: {}", e);
    }

    runtime.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
