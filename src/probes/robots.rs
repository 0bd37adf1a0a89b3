// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! robots.txt presence probe.

use super::{HttpFetch, ProbeOutcome};
use crate::error::ProbeError;
use crate::target::ParsedUrl;
use std::sync::Arc;
use tracing::debug;

/// Reports whether `/robots.txt` exists at the target's origin.
#[derive(Clone)]
pub struct RobotsProbe {
    fetcher: Arc<dyn HttpFetch>,
}

impl RobotsProbe {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    /// Parse `raw` and check it; unparseable input never reaches the network.
    pub async fn check_robots(&self, raw: &str) -> ProbeOutcome<String> {
        match ParsedUrl::parse(raw) {
            Ok(target) => self.check(&target).await,
            Err(e) => {
                debug!(input = %raw, cause = e.detail(), "robots.txt check given bad url");
                ProbeOutcome::Failure(ProbeError::MalformedInput("bad url".to_string()))
            }
        }
    }

    pub async fn check(&self, target: &ParsedUrl) -> ProbeOutcome<String> {
        let robots_url = target.robots_url();

        match self.fetcher.get(&robots_url).await {
            Ok(status) if status.code == 200 => {
                debug!(url = %robots_url, "robots.txt present");
                ProbeOutcome::Success("present".to_string())
            }
            Ok(status) => {
                debug!(url = %robots_url, code = status.code, "robots.txt absent");
                ProbeOutcome::Failure(ProbeError::UpstreamStatus {
                    code: status.code,
                    text: "absent".to_string(),
                })
            }
            Err(e) => {
                debug!(url = %robots_url, code = e.code(), cause = e.detail(), "robots.txt fetch failed");
                ProbeOutcome::Failure(ProbeError::NetworkUnreachable(format!(
                    "absent: {}",
                    e.detail()
                )))
            }
        }
    }
}
