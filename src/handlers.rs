// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the URL probe service.
//!
//! Every route answers with a definite status and a short plain-text
//! message, except `/checkSSL` which answers with JSON on success.

use crate::config::Config;
use crate::error::ProbeError;
use crate::gateway::Gateway;
use crate::metrics::Metrics;
use crate::probes::{ProbeOutcome, Throttle};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Shared application state.
pub struct AppState {
    pub gateway: Gateway,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

/// Query string shared by every probe route.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub url: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/validate-domain", get(validate_domain))
        .route("/validate-url", get(validate_url))
        .route("/check-200-status", get(check_status))
        .route("/checkSSL", get(check_ssl))
        .route("/check-robots-txt", get(check_robots))
        .route("/health", get(health))
        .route("/healthz", get(health));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(cors_layer(&state.config.allowed_origins))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "url-probe",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Public domain check: URL syntax, then DNS.
pub async fn validate_domain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.gateway.validate_domain(&query.url).await {
        ProbeOutcome::Success(_) => (StatusCode::OK, "Valid Domain.").into_response(),
        _ => (StatusCode::BAD_REQUEST, "Invalid Domain.").into_response(),
    }
}

/// Internal hostname resolution check.
pub async fn validate_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.gateway.resolve_hostname(&query.url).await {
        ProbeOutcome::Success(_) => (StatusCode::OK, "Valid URL.").into_response(),
        _ => (StatusCode::BAD_REQUEST, "Invalid URL.").into_response(),
    }
}

/// Rate-limited HTTP status check.
pub async fn check_status(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.gateway.check_status(addr.ip(), &query.url).await {
        ProbeOutcome::Success(_) => (StatusCode::OK, "URL returns a 200 status.").into_response(),
        ProbeOutcome::RateLimited(throttle) => too_many_requests(throttle),
        ProbeOutcome::Failure(ProbeError::UpstreamStatus { code, text }) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, text).into_response()
        }
        ProbeOutcome::Failure(ProbeError::MalformedInput(_)) => {
            (StatusCode::BAD_REQUEST, "Invalid URL.").into_response()
        }
        ProbeOutcome::Failure(_) => (StatusCode::BAD_GATEWAY, "URL is unreachable.").into_response(),
    }
}

/// Rate-limited TLS certificate check.
pub async fn check_ssl(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.gateway.check_tls(addr.ip(), &query.url).await {
        ProbeOutcome::Success(report) => Json(report).into_response(),
        ProbeOutcome::RateLimited(throttle) => too_many_requests(throttle),
        ProbeOutcome::Failure(ProbeError::MalformedInput(_)) => {
            (StatusCode::BAD_REQUEST, "Invalid URL.").into_response()
        }
        ProbeOutcome::Failure(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response()
        }
    }
}

/// Rate-limited robots.txt presence check.
pub async fn check_robots(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match state.gateway.check_robots(addr.ip(), &query.url).await {
        ProbeOutcome::Success(_) => {
            (StatusCode::OK, "robots.txt exists at this URL.").into_response()
        }
        ProbeOutcome::RateLimited(throttle) => too_many_requests(throttle),
        ProbeOutcome::Failure(ProbeError::MalformedInput(_)) => (
            StatusCode::BAD_REQUEST,
            "Error checking robots.txt existence.",
        )
            .into_response(),
        ProbeOutcome::Failure(_) => (
            StatusCode::NOT_FOUND,
            "robots.txt does not exist at this URL.",
        )
            .into_response(),
    }
}

fn too_many_requests(throttle: Throttle) -> Response {
    match throttle {
        Throttle::Local { retry_after } => {
            let retry_secs = retry_after.as_secs().max(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                RATE_LIMITED_MESSAGE,
            )
                .into_response()
        }
        Throttle::Upstream => (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE).into_response(),
    }
}
