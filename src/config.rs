// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the URL probe service.
//!
//! Every value can be overridden through an environment variable; values
//! that fail to parse fall back to the default.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the URL probe service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Overall ceiling on a single request, in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Network probe configuration
    #[serde(default)]
    pub probes: ProbeConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Admission control applied to the status, SSL and robots checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per client per window (default: 3)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 300)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between sweeps of expired windows in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Timeouts and limits for the network probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// DNS lookup timeout in milliseconds (default: 3000)
    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// HTTP request timeout in milliseconds (default: 10000)
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// TLS connect + handshake + status read timeout in milliseconds (default: 10000)
    #[serde(default = "default_tls_timeout_ms")]
    pub tls_timeout_ms: u64,

    /// Maximum redirects followed by the HTTP probes (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent sent by the HTTP and TLS probes
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Honour HTTP_PROXY / HTTPS_PROXY for outbound probes (default: true)
    #[serde(default = "default_true")]
    pub use_proxy_env: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_requests() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    300 // 5 minutes
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_dns_timeout_ms() -> u64 {
    3000
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_tls_timeout_ms() -> u64 {
    10_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    format!("url-probe/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout_secs(),
            allowed_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            probes: ProbeConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: default_dns_timeout_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            tls_timeout_ms: default_tls_timeout_ms(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            use_proxy_env: default_true(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let defaults = Config::default();

        Config {
            bind_addr: parsed("BIND_ADDR")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.bind_addr),
            request_timeout_secs: parse_or(parsed("REQUEST_TIMEOUT_SECS"), defaults.request_timeout_secs),
            allowed_origins: parsed("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit: RateLimitConfig {
                max_requests: parse_or(parsed("RATE_LIMIT_MAX_REQUESTS"), defaults.rate_limit.max_requests),
                window_secs: parse_or(parsed("RATE_LIMIT_WINDOW_SECS"), defaults.rate_limit.window_secs),
                cleanup_interval_secs: parse_or(
                    parsed("RATE_LIMIT_CLEANUP_SECS"),
                    defaults.rate_limit.cleanup_interval_secs,
                ),
            },
            probes: ProbeConfig {
                dns_timeout_ms: parse_or(parsed("DNS_TIMEOUT_MS"), defaults.probes.dns_timeout_ms),
                http_timeout_ms: parse_or(parsed("HTTP_TIMEOUT_MS"), defaults.probes.http_timeout_ms),
                tls_timeout_ms: parse_or(parsed("TLS_TIMEOUT_MS"), defaults.probes.tls_timeout_ms),
                max_redirects: parse_or(parsed("MAX_REDIRECTS"), defaults.probes.max_redirects),
                use_proxy_env: parse_or(parsed("USE_PROXY_ENV"), defaults.probes.use_proxy_env),
                ..defaults.probes
            },
            metrics: MetricsConfig {
                enabled: parse_or(parsed("METRICS_ENABLED"), defaults.metrics.enabled),
                path: parsed("METRICS_PATH")
                    .filter(|p| p.starts_with('/'))
                    .unwrap_or(defaults.metrics.path),
            },
        }
    }

    /// Get the overall request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the cleanup sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl ProbeConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_millis(self.tls_timeout_ms)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_admission_policy() {
        let config = Config::default();
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_duration(), Duration::from_secs(300));
        assert_eq!(config.probes.max_redirects, 5);
        assert!(config.probes.dns_timeout() <= Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("RATE_LIMIT_MAX_REQUESTS", "10"),
            ("DNS_TIMEOUT_MS", "1500"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("METRICS_ENABLED", "false"),
        ]));

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.probes.dns_timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("RATE_LIMIT_WINDOW_SECS", "five minutes"),
            ("MAX_REDIRECTS", "-1"),
            ("METRICS_PATH", "metrics"),
        ]));

        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.probes.max_redirects, 5);
        assert_eq!(config.metrics.path, "/metrics");
    }
}
