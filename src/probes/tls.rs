// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! TLS certificate trust probe.
//!
//! Performs a raw handshake against the webpki root store. When the chain
//! is rejected, the handshake is repeated without verification so that a
//! reachable host with an untrusted certificate is still reported as
//! connected, with `valid_ssl = false`. Connectivity and trust are reported
//! as two separate fields.
//!
//! The HTTP status is read by sending a single `GET /` over the
//! established session.

use super::ProbeOutcome;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, SetupError};
use crate::target::ParsedUrl;
use futures::future::{BoxFuture, FutureExt};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Longest status line we are willing to read.
const MAX_STATUS_LINE: u64 = 1024;

/// Result of a TLS inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlsReport {
    /// HTTP status returned over the TLS session, if the peer sent one
    pub status: Option<u16>,
    /// Whether the certificate chain validated against the trust store
    #[serde(rename = "validSSL")]
    pub valid_ssl: bool,
}

/// TLS handshake transport.
pub trait TlsInspect: Send + Sync {
    fn inspect<'a>(&'a self, host: &'a str, port: u16)
        -> BoxFuture<'a, Result<TlsReport, ProbeError>>;
}

/// Verifier that accepts any chain but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Inspector backed by rustls with the webpki root store.
#[derive(Clone)]
pub struct RustlsInspector {
    verifying: TlsConnector,
    permissive: TlsConnector,
    user_agent: String,
}

impl RustlsInspector {
    pub fn new(config: &ProbeConfig) -> Result<Self, SetupError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let verifying = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let permissive = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            verifying: TlsConnector::from(Arc::new(verifying)),
            permissive: TlsConnector::from(Arc::new(permissive)),
            user_agent: config.user_agent.clone(),
        })
    }

    async fn handshake(
        &self,
        connector: &TlsConnector,
        server_name: ServerName<'static>,
        host: &str,
        port: u16,
    ) -> Result<TlsStream<TcpStream>, ProbeError> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| ProbeError::NetworkUnreachable(e.to_string()))?;

        connector.connect(server_name, tcp).await.map_err(|e| {
            if is_certificate_error(&e) {
                ProbeError::UntrustedCertificate(e.to_string())
            } else {
                ProbeError::TlsFailure(e.to_string())
            }
        })
    }

    async fn read_status(
        &self,
        mut stream: TlsStream<TcpStream>,
        host: &str,
        port: u16,
    ) -> Option<u16> {
        let request = format!(
            "GET / HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
            host_header(host, port),
            self.user_agent
        );

        if let Err(e) = stream.write_all(request.as_bytes()).await {
            debug!(%host, error = %e, "Could not send request over TLS session");
            return None;
        }

        let mut line = String::new();
        let mut reader = BufReader::new(stream.take(MAX_STATUS_LINE));
        match reader.read_line(&mut line).await {
            Ok(_) => parse_status_line(&line),
            Err(e) => {
                debug!(%host, error = %e, "Could not read status over TLS session");
                None
            }
        }
    }
}

impl TlsInspect for RustlsInspector {
    fn inspect<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> BoxFuture<'a, Result<TlsReport, ProbeError>> {
        async move {
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|e| ProbeError::MalformedInput(e.to_string()))?;

            match self
                .handshake(&self.verifying, server_name.clone(), host, port)
                .await
            {
                Ok(stream) => Ok(TlsReport {
                    status: self.read_status(stream, host, port).await,
                    valid_ssl: true,
                }),
                Err(ProbeError::UntrustedCertificate(reason)) => {
                    debug!(%host, port, %reason, "Certificate rejected, retrying without verification");
                    let stream = self
                        .handshake(&self.permissive, server_name, host, port)
                        .await?;
                    Ok(TlsReport {
                        status: self.read_status(stream, host, port).await,
                        valid_ssl: false,
                    })
                }
                Err(e) => Err(e),
            }
        }
        .boxed()
    }
}

fn is_certificate_error(err: &std::io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .map(|e| {
            matches!(
                e,
                rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
            )
        })
        .unwrap_or(false)
}

fn host_header(host: &str, port: u16) -> String {
    let host = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    if port == 443 {
        host
    } else {
        format!("{host}:{port}")
    }
}

/// Extract the code from an HTTP/1.x status line.
pub fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok().filter(|c| (100..=999).contains(c))
}

/// Opens a TLS connection to a target and reports certificate trust.
#[derive(Clone)]
pub struct TlsProbe {
    inspector: Arc<dyn TlsInspect>,
    timeout: Duration,
}

impl TlsProbe {
    pub fn new(inspector: Arc<dyn TlsInspect>, timeout: Duration) -> Self {
        Self { inspector, timeout }
    }

    /// Parse `raw` and check it.
    pub async fn check_tls(&self, raw: &str) -> ProbeOutcome<TlsReport> {
        match ParsedUrl::parse(raw) {
            Ok(target) => self.check(&target).await,
            Err(e) => ProbeOutcome::Failure(e),
        }
    }

    pub async fn check(&self, target: &ParsedUrl) -> ProbeOutcome<TlsReport> {
        let host = target.host();
        let port = target.tls_port();

        let result =
            match tokio::time::timeout(self.timeout, self.inspector.inspect(host, port)).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::TlsFailure(format!(
                    "timed out after {:?}",
                    self.timeout
                ))),
            };

        match result {
            Ok(report) => {
                debug!(%host, port, status = ?report.status, valid_ssl = report.valid_ssl, "TLS inspected");
                ProbeOutcome::Success(report)
            }
            Err(ProbeError::MalformedInput(reason)) => {
                ProbeOutcome::Failure(ProbeError::MalformedInput(reason))
            }
            Err(e) => {
                debug!(%host, port, code = e.code(), cause = e.detail(), "TLS check failed");
                ProbeOutcome::Failure(ProbeError::TlsFailure(e.detail().to_string()))
            }
        }
    }
}
