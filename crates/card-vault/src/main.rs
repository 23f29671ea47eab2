//! `card-vault` — service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline.
//! 3. Derive the encryption key and build the [`CipherEngine`].
//! 4. Open the card store.
//! 5. Compose the [`CardRegistry`].
//! 6. Build the Axum router and start the HTTP server.

mod batch;
mod config;
mod crypto;
mod registry;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use crypto::{CipherEngine, SecretKey};
use registry::CardRegistry;
use server::{middleware::Limits, state::AppState};
use store::MemoryCardStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = cfg.http_port,
        "card-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher engine
    // -----------------------------------------------------------------------
    let key = SecretKey::derive(&cfg.encryption_secret).context("invalid encryption secret")?;
    let cipher = Arc::new(CipherEngine::new(key));

    // -----------------------------------------------------------------------
    // 4. Card store
    // -----------------------------------------------------------------------
    let store = Arc::new(MemoryCardStore::new());

    // -----------------------------------------------------------------------
    // 5. Registry
    // -----------------------------------------------------------------------
    let registry = CardRegistry::new(cipher, store);

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(registry), Limits::from_config(&cfg));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
