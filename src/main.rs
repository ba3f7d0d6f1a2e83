// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Map Share API Service
//!
//! Persists drafts and shares of an editable map and hands out short,
//! checksum-verified retrieval ids:
//!
//! - `POST /save-draft` — raw draft body under a fresh id (rate limited)
//! - `POST /share/store` — validated share payload, write-once
//! - `GET /share/load?id=...` — retrieve a share by verified id
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `DATA_DIR`: Storage directory for `shares/` and `drafts/` (default: ./data)
//! - `SHARE_SECRET`: Secret mixed into share id checksums (required in production)
//! - `PUBLIC_URL`: Base URL for retrieval links (default: request Host header)
//! - `DRAFT_RATE_LIMIT`: Draft saves per window per client (default: 5)
//! - `DRAFT_RATE_WINDOW_SECS`: Rate window length (default: 60)
//! - `MIN_FREE_BYTES`: Required storage headroom (default: 30 GiB)
//! - `APP_ENV`: Set to `production` to refuse startup on the default secret

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

use map_share_api::{
    config::Config,
    handlers::{health, load_share, save_draft, store_share, AppState},
    limiter::DraftRateLimiter,
    share_id::ShareIdCodec,
    storage::ShareStore,
    validator::ShareValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    let production = std::env::var("APP_ENV").map(|v| v == "production").unwrap_or(false);
    if config.share_id.is_default_secret() {
        if production {
            anyhow::bail!(
                "SHARE_SECRET is unset; refusing to start in production on the default secret"
            );
        }
        warn!("SHARE_SECRET is unset; share id checksums use the built-in default secret");
    }

    info!(
        bind_addr = %config.bind_addr,
        data_dir = %config.storage.data_dir.display(),
        draft_rate_limit = config.rate_limit.max_requests,
        draft_rate_window_secs = config.rate_limit.window_secs,
        min_free_bytes = config.storage.min_free_bytes,
        "Starting map share service"
    );

    // Create application state
    let codec = ShareIdCodec::new(config.share_id.secret.clone());
    let validator = ShareValidator::new(config.validation.clone(), codec.clone());
    let limiter = DraftRateLimiter::new(config.rate_limit.clone());
    let store = ShareStore::open(&config.storage).await?;

    let state = Arc::new(AppState {
        limiter,
        validator,
        codec,
        store,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/save-draft", post(save_draft))
        .route("/share/store", post(store_share))
        .route("/share/load", get(load_share))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        ..Default::default()
    };

    if let Ok(data_dir) = std::env::var("DATA_DIR") {
        config.storage.data_dir = PathBuf::from(data_dir);
    }
    if let Ok(secret) = std::env::var("SHARE_SECRET") {
        if !secret.is_empty() {
            config.share_id.secret = secret;
        }
    }
    if let Some(limit) = env_parse("DRAFT_RATE_LIMIT") {
        config.rate_limit.max_requests = limit;
    }
    if let Some(window) = env_parse("DRAFT_RATE_WINDOW_SECS") {
        config.rate_limit.window_secs = window;
    }
    if let Some(min_free) = env_parse("MIN_FREE_BYTES") {
        config.storage.min_free_bytes = min_free;
    }
    if let Ok(public_url) = std::env::var("PUBLIC_URL") {
        match Url::parse(&public_url) {
            Ok(_) => config.public_url = Some(public_url),
            Err(e) => warn!(%public_url, error = %e, "ignoring unparseable PUBLIC_URL"),
        }
    }

    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
