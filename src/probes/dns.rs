// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Hostname resolution probe.

use super::ProbeOutcome;
use crate::error::ProbeError;
use futures::future::{BoxFuture, FutureExt};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Name lookup transport.
pub trait NameResolver: Send + Sync {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, ProbeError>>;
}

/// Resolver backed by hickory, using the host's resolver configuration.
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Build from the system configuration, falling back to hickory defaults.
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "Could not read system resolver config, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        // Single attempt: the probe applies its own overall deadline.
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl NameResolver for HickoryResolver {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, ProbeError>> {
        async move {
            let response = self
                .inner
                .lookup_ip(host)
                .await
                .map_err(|e| ProbeError::ResolutionFailure(e.to_string()))?;
            Ok(response.iter().collect())
        }
        .boxed()
    }
}

/// Confirms that a hostname resolves to at least one address.
#[derive(Clone)]
pub struct DnsProbe {
    resolver: Arc<dyn NameResolver>,
    timeout: Duration,
}

impl DnsProbe {
    pub fn new(resolver: Arc<dyn NameResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Resolve `host`, failing on lookup error, empty answer or timeout.
    pub async fn resolve(&self, host: &str) -> ProbeOutcome<Vec<IpAddr>> {
        let result = match tokio::time::timeout(self.timeout, self.resolver.lookup(host)).await {
            Ok(Ok(addrs)) if !addrs.is_empty() => Ok(addrs),
            Ok(Ok(_)) => Err(ProbeError::ResolutionFailure("no address records".to_string())),
            Ok(Err(e)) => Err(match e {
                ProbeError::ResolutionFailure(_) => e,
                other => ProbeError::ResolutionFailure(other.to_string()),
            }),
            Err(_) => Err(ProbeError::ResolutionFailure(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        };

        match &result {
            Ok(addrs) => debug!(%host, count = addrs.len(), "Host resolved"),
            Err(e) => debug!(%host, code = e.code(), cause = e.detail(), "Host did not resolve"),
        }
        result.into()
    }
}
