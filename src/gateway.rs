// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Validation gateway.
//!
//! Every request is parsed before anything else happens. Domain checks go
//! straight to the DNS probe and are never rate limited; the status, SSL
//! and robots checks pass through per-client admission control first.
//!
//! ```text
//! Received -> Parsing -> {Admitted | RateLimited} -> Probing -> {Success | Failure}
//! ```

use crate::config::ProbeConfig;
use crate::error::{ProbeError, SetupError};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::Metrics;
use crate::probes::{
    DnsProbe, HickoryResolver, ProbeOutcome, ReqwestFetcher, RobotsProbe, RustlsInspector,
    StatusProbe, Throttle, TlsProbe, TlsReport,
};
use crate::target::{parse_hostname, ParsedUrl};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// The set of probes a gateway dispatches to.
#[derive(Clone)]
pub struct Probes {
    pub dns: DnsProbe,
    pub status: StatusProbe,
    pub tls: TlsProbe,
    pub robots: RobotsProbe,
}

impl Probes {
    /// Build the production probes.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, SetupError> {
        let fetcher = Arc::new(ReqwestFetcher::new(config)?);
        let resolver = Arc::new(HickoryResolver::from_system_conf(config.dns_timeout()));
        let inspector = Arc::new(RustlsInspector::new(config)?);

        Ok(Self {
            dns: DnsProbe::new(resolver, config.dns_timeout()),
            status: StatusProbe::new(fetcher.clone()),
            tls: TlsProbe::new(inspector, config.tls_timeout()),
            robots: RobotsProbe::new(fetcher),
        })
    }
}

/// The rate-limited checks offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Status,
    Ssl,
    Robots,
}

impl CheckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Status => "status",
            CheckKind::Ssl => "ssl",
            CheckKind::Robots => "robots",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    /// Accepts the check names and the form's option numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" | "1" => Ok(CheckKind::Status),
            "ssl" | "tls" | "2" => Ok(CheckKind::Ssl),
            "robots" | "3" => Ok(CheckKind::Robots),
            other => Err(format!("unknown check: {other}")),
        }
    }
}

/// Parses requests, applies admission control and dispatches to probes.
pub struct Gateway {
    limiter: Arc<RateLimiter>,
    probes: Probes,
    metrics: Arc<Metrics>,
}

impl Gateway {
    pub fn new(limiter: Arc<RateLimiter>, probes: Probes, metrics: Arc<Metrics>) -> Self {
        Self {
            limiter,
            probes,
            metrics,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Check that a URL or bare hostname is well formed and its host resolves.
    pub async fn validate_domain(&self, input: &str) -> ProbeOutcome<String> {
        let host = ParsedUrl::parse(input)
            .map(|target| target.host().to_string())
            .or_else(|_| parse_hostname(input));

        let outcome = match host {
            Ok(host) => self
                .probes
                .dns
                .resolve(&host)
                .await
                .map(|_| "valid".to_string()),
            Err(e) => {
                debug!(input = %input, code = e.code(), cause = e.detail(), "Domain check given invalid input");
                ProbeOutcome::Failure(ProbeError::MalformedInput("invalid url".to_string()))
            }
        };
        self.record("domain", &outcome);
        outcome
    }

    /// Resolve a bare hostname. Backs the internal `/validate-url` route only.
    pub(crate) async fn resolve_hostname(&self, raw: &str) -> ProbeOutcome<String> {
        let outcome = match parse_hostname(raw) {
            Ok(host) => self
                .probes
                .dns
                .resolve(&host)
                .await
                .map(|_| "resolved".to_string()),
            Err(e) => ProbeOutcome::Failure(e),
        };
        self.record("dns", &outcome);
        outcome
    }

    /// Check that `raw` answers a GET with 200.
    pub async fn check_status(&self, client: IpAddr, raw: &str) -> ProbeOutcome<String> {
        let outcome = match ParsedUrl::parse(raw) {
            Ok(target) => match self.admit(client, CheckKind::Status).await {
                Some(throttle) => ProbeOutcome::RateLimited(throttle),
                None => self.probes.status.check(&target).await,
            },
            Err(e) => ProbeOutcome::Failure(e),
        };
        self.record(CheckKind::Status.as_str(), &outcome);
        outcome
    }

    /// Handshake with the target and report certificate trust.
    pub async fn check_tls(&self, client: IpAddr, raw: &str) -> ProbeOutcome<TlsReport> {
        let outcome = match ParsedUrl::parse(raw) {
            Ok(target) => match self.admit(client, CheckKind::Ssl).await {
                Some(throttle) => ProbeOutcome::RateLimited(throttle),
                None => self.probes.tls.check(&target).await,
            },
            Err(e) => ProbeOutcome::Failure(e),
        };
        self.record(CheckKind::Ssl.as_str(), &outcome);
        outcome
    }

    /// Check whether the target's origin serves `/robots.txt`.
    pub async fn check_robots(&self, client: IpAddr, raw: &str) -> ProbeOutcome<String> {
        let outcome = match ParsedUrl::parse(raw) {
            Ok(target) => match self.admit(client, CheckKind::Robots).await {
                Some(throttle) => ProbeOutcome::RateLimited(throttle),
                None => self.probes.robots.check(&target).await,
            },
            Err(_) => ProbeOutcome::Failure(ProbeError::MalformedInput("bad url".to_string())),
        };
        self.record(CheckKind::Robots.as_str(), &outcome);
        outcome
    }

    /// Run one check and reduce it to success, failure or rate limited.
    ///
    /// For `Ssl`, an untrusted certificate counts as a failure.
    pub async fn run_check(&self, kind: CheckKind, client: IpAddr, raw: &str) -> ProbeOutcome<String> {
        match kind {
            CheckKind::Status => self.check_status(client, raw).await,
            CheckKind::Robots => self.check_robots(client, raw).await,
            CheckKind::Ssl => match self.check_tls(client, raw).await {
                ProbeOutcome::Success(report) if report.valid_ssl => {
                    ProbeOutcome::Success("certificate trusted".to_string())
                }
                ProbeOutcome::Success(_) => ProbeOutcome::Failure(ProbeError::UntrustedCertificate(
                    "certificate not trusted".to_string(),
                )),
                ProbeOutcome::Failure(e) => ProbeOutcome::Failure(e),
                ProbeOutcome::RateLimited(t) => ProbeOutcome::RateLimited(t),
            },
        }
    }

    /// `None` when admitted, otherwise the local throttle.
    async fn admit(&self, client: IpAddr, kind: CheckKind) -> Option<Throttle> {
        match self.limiter.check(client).await {
            RateLimitResult::Allowed { remaining, .. } => {
                debug!(%client, check = %kind, remaining, "Request admitted");
                None
            }
            RateLimitResult::Limited { retry_after } => {
                info!(
                    %client,
                    check = %kind,
                    retry_after_secs = retry_after.as_secs(),
                    "Request rate limited"
                );
                self.metrics.record_rejection();
                Some(Throttle::Local { retry_after })
            }
        }
    }

    fn record<T>(&self, probe: &str, outcome: &ProbeOutcome<T>) {
        self.metrics.record_outcome(probe, outcome.label());
    }
}
