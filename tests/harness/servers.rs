// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Local HTTP servers that stand in for probed sites.

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const SELF_SIGNED_CERT: &[u8] = include_bytes!("../fixtures/self_signed.crt");
const SELF_SIGNED_KEY: &[u8] = include_bytes!("../fixtures/self_signed.key");

/// TLS alert record: fatal `handshake_failure`.
const HANDSHAKE_FAILURE_ALERT: [u8; 7] = [0x15, 0x03, 0x03, 0x00, 0x02, 0x02, 0x28];

async fn ok() -> &'static str {
    "hello"
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn busy() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing here")
}

async fn redirect_loop() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/loop")])
}

async fn hop(Path(n): Path<u32>) -> axum::response::Response {
    if n == 0 {
        (StatusCode::OK, "landed").into_response()
    } else {
        (StatusCode::FOUND, [(header::LOCATION, format!("/hop/{}", n - 1))]).into_response()
    }
}

async fn robots() -> &'static str {
    "User-agent: *\nDisallow:\n"
}

fn site(with_robots: bool) -> Router {
    let app = Router::new()
        .route("/", get(ok))
        .route("/ok", get(ok))
        .route("/error", get(server_error))
        .route("/busy", get(busy))
        .route("/loop", get(redirect_loop))
        .route("/hop/:n", get(hop))
        .fallback(not_found);

    if with_robots {
        app.route("/robots.txt", get(robots))
    } else {
        app
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Spawn a site that serves `/robots.txt`.
pub async fn spawn_site() -> SocketAddr {
    serve(site(true)).await
}

/// Spawn a site without `/robots.txt`.
pub async fn spawn_site_without_robots() -> SocketAddr {
    serve(site(false)).await
}

fn self_signed_config() -> ServerConfig {
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &SELF_SIGNED_CERT[..])
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &SELF_SIGNED_KEY[..])
        .unwrap()
        .unwrap();

    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap()
}

/// Spawn a TLS site with a self-signed certificate for `127.0.0.1`.
///
/// When `answer` is false the site completes the handshake and closes
/// without sending an HTTP response.
pub async fn spawn_self_signed_tls_site(answer: bool) -> SocketAddr {
    let acceptor = TlsAcceptor::from(Arc::new(self_signed_config()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                // Verifying clients abort the handshake; that is expected
                let Ok(mut tls) = acceptor.accept(tcp).await else {
                    return;
                };
                if answer {
                    let mut buf = [0u8; 1024];
                    let _ = tls.read(&mut buf).await;
                    let _ = tls
                        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                        .await;
                }
                let _ = tls.shutdown().await;
            });
        }
    });
    addr
}

/// Spawn a server that refuses every TLS handshake with a fatal alert.
pub async fn spawn_handshake_refusing_site() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut hello = [0u8; 4096];
                let _ = tcp.read(&mut hello).await;
                let _ = tcp.write_all(&HANDSHAKE_FAILURE_ALERT).await;
                let _ = tcp.shutdown().await;
            });
        }
    });
    addr
}
