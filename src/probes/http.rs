// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP reachability probe.
//!
//! Issues one GET per check. Redirects are followed up to a fixed cap; a
//! longer chain is reported as unreachable rather than fetched forever.

use super::{ProbeOutcome, Throttle};
use crate::config::ProbeConfig;
use crate::error::{ProbeError, SetupError};
use crate::target::ParsedUrl;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Final status of a fetch, after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedStatus {
    pub code: u16,
    pub reason: String,
}

impl FetchedStatus {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// HTTP GET transport.
pub trait HttpFetch: Send + Sync {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchedStatus, ProbeError>>;
}

/// Transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &ProbeConfig) -> Result<Self, SetupError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str());
        if !config.use_proxy_env {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchedStatus, ProbeError>> {
        async move {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(describe_error)?;

            let status = response.status();
            Ok(FetchedStatus::new(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ))
        }
        .boxed()
    }
}

fn describe_error(err: reqwest::Error) -> ProbeError {
    let cause = if err.is_redirect() {
        "too many redirects".to_string()
    } else if err.is_timeout() {
        "timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    ProbeError::NetworkUnreachable(cause)
}

/// Map a final response status onto a probe outcome.
///
/// Codes without a known reason phrase are described by the code itself.
pub fn classify(status: FetchedStatus) -> ProbeOutcome<String> {
    match status.code {
        200 => ProbeOutcome::Success("reachable".to_string()),
        429 => ProbeOutcome::RateLimited(Throttle::Upstream),
        code => {
            let text = if status.reason.trim().is_empty() {
                code.to_string()
            } else {
                status.reason
            };
            ProbeOutcome::Failure(ProbeError::UpstreamStatus { code, text })
        }
    }
}

/// Confirms a URL is fetchable and classifies its response code.
#[derive(Clone)]
pub struct StatusProbe {
    fetcher: Arc<dyn HttpFetch>,
}

impl StatusProbe {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    /// Parse `raw` and check it.
    pub async fn check_status(&self, raw: &str) -> ProbeOutcome<String> {
        match ParsedUrl::parse(raw) {
            Ok(target) => self.check(&target).await,
            Err(e) => ProbeOutcome::Failure(e),
        }
    }

    pub async fn check(&self, target: &ParsedUrl) -> ProbeOutcome<String> {
        match self.fetcher.get(target.as_url()).await {
            Ok(status) => {
                debug!(url = %target.as_url(), code = status.code, "Status fetched");
                classify(status)
            }
            Err(e) => {
                debug!(url = %target.as_url(), code = e.code(), cause = e.detail(), "Status fetch failed");
                ProbeOutcome::Failure(e)
            }
        }
    }
}
