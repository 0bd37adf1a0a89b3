// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! URL Probe Service
//!
//! Serves the URL validation endpoints:
//!
//! - `GET /validate-domain?url=`: URL syntax plus DNS resolution
//! - `GET /validate-url?url=`: hostname resolution (internal)
//! - `GET /check-200-status?url=`: HTTP reachability (rate limited)
//! - `GET /checkSSL?url=`: TLS certificate trust (rate limited)
//! - `GET /check-robots-txt?url=`: robots.txt presence (rate limited)
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:3000)
//! - `RATE_LIMIT_MAX_REQUESTS`: Requests per client per window (default: 3)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 300)
//! - `DNS_TIMEOUT_MS`, `HTTP_TIMEOUT_MS`, `TLS_TIMEOUT_MS`: Probe timeouts
//! - `MAX_REDIRECTS`: Redirect cap for HTTP probes (default: 5)
//! - `ALLOWED_ORIGINS`: Comma-separated CORS origins (default: any)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use url_probe::{
    config::Config,
    error::SetupError,
    gateway::{Gateway, Probes},
    handlers::{router, AppState},
    limiter::RateLimiter,
    metrics::Metrics,
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

    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        max_redirects = config.probes.max_redirects,
        "Starting URL probe service"
    );

    // Create application state
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let metrics = Arc::new(Metrics::new().map_err(SetupError::from)?);
    let probes = Probes::from_config(&config.probes)?;
    let gateway = Gateway::new(Arc::clone(&limiter), probes, Arc::clone(&metrics));

    let state = Arc::new(AppState {
        gateway,
        metrics,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_interval = config.rate_limit.cleanup_interval();
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|_| SetupError::InvalidBindAddr(config.bind_addr.clone()))?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup.abort();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
