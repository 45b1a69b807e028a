//! melon-review HTTP server binary.
//!
//! Configuration comes from the environment (see [`melon_review::config`]).
//! `RUST_LOG` sets the tracing filter (default: `info,melon_review=debug`).
//!
//! # Usage
//!
//! ```bash
//! PORT=3000 DATABASE_PATH=data/melon.db cargo run --bin server
//! ```

use anyhow::Context;
use melon_review::config::ServerConfig;
use melon_review::db::Database;
use melon_review::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,melon_review=debug".into()),
        )
        .init();

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open database at {}", config.database_path))?;
    std::fs::create_dir_all(&config.files_dir).with_context(|| {
        format!("failed to create upload directory {}", config.files_dir.display())
    })?;

    let bind_addr = config.bind_addr();
    tracing::info!(
        database = %config.database_path,
        files = %config.files_dir.display(),
        "melon-review {} starting on {}",
        melon_review::VERSION,
        bind_addr
    );

    let state = AppState::new(db, config);
    let sessions = state.sessions.clone();
    let app = app_router(state);

    // Sweep abandoned sessions.
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            tick.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions removed");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
