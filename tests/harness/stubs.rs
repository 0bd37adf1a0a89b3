// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stub transports that count calls and answer from a script.

use futures::future::{BoxFuture, FutureExt};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use url_probe::{
    config::{Config, RateLimitConfig},
    gateway::{Gateway, Probes},
    handlers::AppState,
    limiter::{ManualClock, RateLimiter},
    metrics::Metrics,
    probes::{
        DnsProbe, FetchedStatus, HttpFetch, NameResolver, RobotsProbe, StatusProbe, TlsInspect,
        TlsProbe, TlsReport,
    },
    ProbeError,
};

/// Scripted answers for every transport.
#[derive(Debug, Clone)]
pub struct Script {
    /// Hosts that resolve; everything else is NXDOMAIN
    pub resolvable: Vec<String>,
    /// Status for the page GET
    pub page_status: Result<FetchedStatus, ProbeError>,
    /// Status for `/robots.txt`
    pub robots_status: Result<FetchedStatus, ProbeError>,
    /// TLS inspection result
    pub tls: Result<TlsReport, ProbeError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            resolvable: vec!["example.com".to_string()],
            page_status: Ok(FetchedStatus::new(200, "OK")),
            robots_status: Ok(FetchedStatus::new(200, "OK")),
            tls: Ok(TlsReport {
                status: Some(200),
                valid_ssl: true,
            }),
        }
    }
}

/// One stub standing in for the resolver, HTTP client and TLS connector.
#[derive(Default)]
pub struct StubTransport {
    pub script: Mutex<Script>,
    pub dns_calls: AtomicUsize,
    pub http_calls: AtomicUsize,
    pub tls_calls: AtomicUsize,
}

impl StubTransport {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Default::default()
        })
    }

    pub fn network_calls(&self) -> usize {
        self.dns_calls.load(Ordering::SeqCst)
            + self.http_calls.load(Ordering::SeqCst)
            + self.tls_calls.load(Ordering::SeqCst)
    }

    fn script(&self) -> Script {
        self.script.lock().unwrap().clone()
    }
}

impl NameResolver for StubTransport {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, ProbeError>> {
        self.dns_calls.fetch_add(1, Ordering::SeqCst);
        let known = self.script().resolvable.iter().any(|h| h == host);
        async move {
            if known {
                Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10))])
            } else {
                Err(ProbeError::ResolutionFailure("NXDOMAIN".to_string()))
            }
        }
        .boxed()
    }
}

impl HttpFetch for StubTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchedStatus, ProbeError>> {
        self.http_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script();
        let answer = if url.path() == "/robots.txt" {
            script.robots_status
        } else {
            script.page_status
        };
        async move { answer }.boxed()
    }
}

impl TlsInspect for StubTransport {
    fn inspect<'a>(&'a self, _host: &'a str, _port: u16) -> BoxFuture<'a, Result<TlsReport, ProbeError>> {
        self.tls_calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.script().tls;
        async move { answer }.boxed()
    }
}

/// Application state wired to a stub transport and a manual clock.
pub fn stub_state(transport: Arc<StubTransport>, clock: ManualClock) -> Arc<AppState> {
    let config = Config::default();
    let probes = Probes {
        dns: DnsProbe::new(transport.clone(), Duration::from_secs(1)),
        status: StatusProbe::new(transport.clone()),
        tls: TlsProbe::new(transport.clone(), Duration::from_secs(1)),
        robots: RobotsProbe::new(transport),
    };
    let limiter = Arc::new(RateLimiter::with_clock(
        RateLimitConfig::default(),
        Arc::new(clock),
    ));
    let metrics = Arc::new(Metrics::new().unwrap());

    Arc::new(AppState {
        gateway: Gateway::new(limiter, probes, metrics.clone()),
        metrics,
        config,
    })
}
