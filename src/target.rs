// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Structural parsing of caller-supplied URLs.
//!
//! Runs before any probe touches the network:
//! - only `http` and `https` schemes are accepted
//! - a non-empty host is required
//! - hostnames passed on their own must be valid domains or IP literals

use crate::error::ProbeError;
use tracing::debug;
use url::{Host, Url};

/// Longest input accepted before parsing.
const MAX_URL_LENGTH: usize = 2048;

/// A URL that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    url: Url,
    host: String,
}

impl ParsedUrl {
    /// Parse and validate a raw input string.
    pub fn parse(raw: &str) -> Result<Self, ProbeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProbeError::MalformedInput("empty input".to_string()));
        }
        if raw.len() > MAX_URL_LENGTH {
            return Err(ProbeError::MalformedInput(format!(
                "longer than {MAX_URL_LENGTH} characters"
            )));
        }

        let url = Url::parse(raw).map_err(|e| {
            debug!(input = %raw, error = %e, "URL failed to parse");
            ProbeError::MalformedInput(e.to_string())
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            debug!(input = %raw, scheme = %url.scheme(), "Unsupported scheme");
            return Err(ProbeError::MalformedInput(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(ProbeError::MalformedInput("missing host".to_string())),
        };

        Ok(Self { url, host })
    }

    /// Hostname without brackets, suitable for resolution and SNI.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port for a TLS connection: the explicit port, otherwise 443.
    pub fn tls_port(&self) -> u16 {
        self.url.port().unwrap_or(443)
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Same origin with the path replaced by `/robots.txt`.
    pub fn robots_url(&self) -> Url {
        let mut robots = self.url.clone();
        robots.set_path("/robots.txt");
        robots.set_query(None);
        robots.set_fragment(None);
        robots
    }
}

/// Validate a bare hostname (no scheme) as handed to the resolver.
pub fn parse_hostname(raw: &str) -> Result<String, ProbeError> {
    let raw = raw.trim().trim_end_matches('.');
    if raw.is_empty() {
        return Err(ProbeError::MalformedInput("empty hostname".to_string()));
    }
    if let Ok(ip) = raw.parse::<std::net::IpAddr>() {
        return Ok(ip.to_string());
    }
    if raw.contains(['/', ':', '@', '?', '#']) {
        return Err(ProbeError::MalformedInput(format!("not a hostname: {raw}")));
    }

    match Host::parse(raw) {
        Ok(Host::Domain(d)) => Ok(d),
        Ok(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Ok(Host::Ipv6(ip)) => Ok(ip.to_string()),
        Err(e) => Err(ProbeError::MalformedInput(e.to_string())),
    }
}
