// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! URL Probe
//!
//! This crate validates a user-supplied URL through independent network
//! probes and reports one verdict per probe:
//!
//! - DNS resolution of the URL's host
//! - HTTP reachability (GET, bounded redirects)
//! - TLS certificate trust (raw handshake against the webpki roots)
//! - robots.txt presence at the URL's origin
//!
//! The status, TLS and robots checks share one per-client admission window
//! (3 requests per 5 minutes by default).

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod probes;
pub mod target;

pub use config::Config;
pub use error::{ProbeError, SetupError};
pub use gateway::{CheckKind, Gateway, Probes};
pub use limiter::{Clock, ManualClock, RateLimitResult, RateLimiter, SystemClock};
pub use probes::{ProbeOutcome, Throttle, TlsReport};
pub use target::ParsedUrl;
