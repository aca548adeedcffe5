//! # secrets-site
//!
//! A small members-only web site: visitors register with a name, email and
//! password, log in to get a signed session cookie, and can then see the secret
//! page and open the cheat sheet download.
//!
//! ## Architecture
//!
//! - **Users**: SQLite table behind `sqlx`, unique on email
//! - **Credentials**: Argon2id digests with a random salt per password
//! - **Sessions**: stateless; a signed cookie names the user id and issue time,
//!   resolved against the user table on every request
//! - **HTTP**: Axum router with rate limiting, request IDs, tracing and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod accounts;
mod config;
mod credentials;
mod http;
mod serve_files;
mod session;
mod users;

use std::net::SocketAddr;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::accounts::Accounts;
use crate::config::{AppConfig, Cli};
use crate::http::{derive_cookie_key, router, AppState, SessionSettings};
use crate::session::SessionPolicy;
use crate::users::UserStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        database = %config.database.display(),
        static_dir = %config.static_dir.display(),
        download_file = %config.download_file.display(),
        session_ttl = %humantime::format_duration(config.session_ttl),
        cookie_secure = config.cookie_secure,
        "configuration loaded"
    );

    let download_path = config.static_dir.join(&config.download_file);
    if !download_path.is_file() {
        warn!(
            path = %download_path.display(),
            "download file is missing; /download will answer 404"
        );
    }

    let users = UserStore::open(&config.database).await.with_context(|| {
        format!("failed to open user database {}", config.database.display())
    })?;
    let cookie_key =
        derive_cookie_key(&config.secret_key).context("failed to derive cookie signing key")?;

    let state = AppState {
        accounts: Accounts::new(users),
        cookie_key,
        session: SessionSettings {
            policy: SessionPolicy::new(config.session_ttl),
            secure_cookies: config.cookie_secure,
        },
        static_dir: config.static_dir,
        download_file: config.download_file,
    };

    let app = router(state)?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    if !config.cookie_secure && !config.bind.ip().is_loopback() {
        warn!(
            bind = %config.bind,
            "session cookies are not marked Secure; set SECRETS_COOKIE_SECURE=1 behind TLS"
        );
    }

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "secrets-site listening");

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
