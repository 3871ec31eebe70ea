//! # fundraiser-rs
//!
//! Charity fundraising web service in Rust.
//!
//! Visitors browse open campaigns. Registered users donate and comment.
//! Admins create, edit and close campaigns.
//!
//! ## Architecture
//!
//! - **Store**: In-memory tables with write transactions, optionally persisted to a JSON snapshot
//! - **Mutations**: Input validation, ownership checks and every state change
//! - **Browse**: Read-side queries filtered by viewer role
//! - **HTTP**: Axum router with signed session cookies, role guards, request IDs, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod browse;
mod config;
mod error;
mod http;
mod identity;
mod models;
mod mutations;
mod password;
mod store;

use std::net::SocketAddr;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli};
use crate::http::{router, signing_key, AppState};
use crate::password::CredentialHasher;
use crate::store::{Store, SNAPSHOT_FILE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        data_dir = ?config.data_dir.as_ref().map(|path| path.display().to_string()),
        cookie_secure = config.cookie_secure,
        session_secret_configured = config.session_secret.is_some(),
        "configuration loaded"
    );

    let hasher =
        CredentialHasher::new(config.password_hash).context("invalid password hash parameters")?;
    let cookie_key = signing_key(config.session_secret.as_deref())
        .context("failed to build session signing key")?;

    let store = match &config.data_dir {
        Some(dir) => {
            let path = dir.join(SNAPSHOT_FILE);
            Store::open(path.clone())
                .await
                .with_context(|| format!("failed to open data snapshot {}", path.display()))?
        }
        None => {
            warn!("no data directory configured; data will be lost on shutdown");
            Store::in_memory()
        }
    };

    let state = AppState {
        store,
        hasher,
        cookie_key,
        cookie_secure: config.cookie_secure,
    };

    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "fundraiser-rs listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
