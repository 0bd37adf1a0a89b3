// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the URL probe service.
//!
//! Provides stub transports with call counters, a state builder that wires
//! them into a router, and small local servers that play the probed site.

#![allow(dead_code)]

pub mod servers;
pub mod stubs;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::net::SocketAddr;
use tower::ServiceExt;

/// Percent-encode a value for use in a query string.
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Attach a fixed peer address so `ConnectInfo` resolves in tests.
pub fn with_client(app: Router, client: SocketAddr) -> Router {
    app.layer(MockConnectInfo(client))
}

/// Issue `GET path?url=<target>` and return status, Retry-After and body.
pub async fn get(app: &Router, path: &str, target: &str) -> (StatusCode, Option<String>, String) {
    let uri = format!("{path}?url={}", encode(target));
    get_uri(app, &uri).await
}

/// Issue a GET for a raw URI.
pub async fn get_uri(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, retry_after, String::from_utf8(body.to_vec()).unwrap())
}
