// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the URL probe service

use thiserror::Error;

/// Failure reasons a probe can report.
///
/// Every probe converts its own network and library errors into one of
/// these before returning; no transport error crosses a probe boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("invalid url: {0}")]
    MalformedInput(String),

    #[error("unresolvable")]
    ResolutionFailure(String),

    #[error("unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("untrusted certificate: {0}")]
    UntrustedCertificate(String),

    #[error("{code} {text}")]
    UpstreamStatus { code: u16, text: String },

    #[error("ssl check failed")]
    TlsFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    /// Stable machine-readable code, logged alongside the cause.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::ResolutionFailure(_) => "RESOLUTION_FAILURE",
            Self::NetworkUnreachable(_) => "NETWORK_UNREACHABLE",
            Self::UntrustedCertificate(_) => "UNTRUSTED_CERTIFICATE",
            Self::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            Self::TlsFailure(_) => "TLS_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Low-level cause, for logging only.
    pub fn detail(&self) -> &str {
        match self {
            Self::MalformedInput(d)
            | Self::ResolutionFailure(d)
            | Self::NetworkUnreachable(d)
            | Self::UntrustedCertificate(d)
            | Self::TlsFailure(d)
            | Self::Internal(d) => d,
            Self::UpstreamStatus { text, .. } => text,
        }
    }
}

/// Errors raised while wiring the service together at start-up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_human_readable() {
        assert_eq!(
            ProbeError::ResolutionFailure("NXDOMAIN".into()).to_string(),
            "unresolvable"
        );
        assert_eq!(
            ProbeError::TlsFailure("handshake eof".into()).to_string(),
            "ssl check failed"
        );
        assert_eq!(
            ProbeError::UpstreamStatus {
                code: 500,
                text: "Internal Server Error".into()
            }
            .to_string(),
            "500 Internal Server Error"
        );
    }

    #[test]
    fn test_detail_keeps_cause() {
        let err = ProbeError::NetworkUnreachable("connection refused".into());
        assert_eq!(err.detail(), "connection refused");
        assert_eq!(err.code(), "NETWORK_UNREACHABLE");
    }
}
