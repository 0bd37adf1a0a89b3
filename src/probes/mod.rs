// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Independent network probes.
//!
//! Each probe performs exactly one check against a target and reports a
//! single [`ProbeOutcome`]. Transports sit behind small traits so the
//! probes can run against stubs.

pub mod dns;
pub mod http;
pub mod robots;
pub mod tls;

pub use dns::{DnsProbe, HickoryResolver, NameResolver};
pub use http::{FetchedStatus, HttpFetch, ReqwestFetcher, StatusProbe};
pub use robots::RobotsProbe;
pub use tls::{RustlsInspector, TlsInspect, TlsProbe, TlsReport};

use crate::error::ProbeError;
use std::time::Duration;

/// Who throttled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// The probed site answered 429
    Upstream,
    /// Our own admission control rejected the caller
    Local { retry_after: Duration },
}

/// Tagged result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T = String> {
    Success(T),
    Failure(ProbeError),
    RateLimited(Throttle),
}

impl<T> ProbeOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success(_) => "success",
            ProbeOutcome::Failure(_) => "failure",
            ProbeOutcome::RateLimited(Throttle::Upstream) => "upstream_rate_limited",
            ProbeOutcome::RateLimited(Throttle::Local { .. }) => "rate_limited",
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ProbeOutcome<U> {
        match self {
            ProbeOutcome::Success(v) => ProbeOutcome::Success(f(v)),
            ProbeOutcome::Failure(e) => ProbeOutcome::Failure(e),
            ProbeOutcome::RateLimited(t) => ProbeOutcome::RateLimited(t),
        }
    }
}

impl<T> From<Result<T, ProbeError>> for ProbeOutcome<T> {
    fn from(result: Result<T, ProbeError>) -> Self {
        match result {
            Ok(v) => ProbeOutcome::Success(v),
            Err(e) => ProbeOutcome::Failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ProbeOutcome::Success("ok".to_string()).label(), "success");
        assert_eq!(
            ProbeOutcome::<String>::RateLimited(Throttle::Upstream).label(),
            "upstream_rate_limited"
        );
        assert_eq!(
            ProbeOutcome::<String>::Failure(ProbeError::Internal("x".into())).label(),
            "failure"
        );
    }

    #[test]
    fn test_map_keeps_tag() {
        let outcome: ProbeOutcome<u16> = ProbeOutcome::Success(200);
        assert_eq!(outcome.map(|c| c.to_string()), ProbeOutcome::Success("200".to_string()));

        let limited: ProbeOutcome<u16> = ProbeOutcome::RateLimited(Throttle::Upstream);
        assert_eq!(
            limited.map(|c| c + 1),
            ProbeOutcome::RateLimited(Throttle::Upstream)
        );
    }
}
