//! Server configuration read from the environment

use gmscan_core::scanner::PublicEndpoint;
use gmscan_core::ValidationError;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const FALLBACK_BASE_URL: &str = "localhost:5000";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Public host[:port][/prefix] used in console commands; the request
    /// `Host` header is used when unset
    pub base_url: Option<String>,
    pub public_scheme: String,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub max_body_bytes: usize,
    pub default_report_limit: usize,
    pub max_report_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            base_url: None,
            public_scheme: "https".to_string(),
            session_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            max_body_bytes: 16 * 1024 * 1024, // 16MB
            default_report_limit: 10,
            max_report_limit: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            base_url: std::env::var("BASE_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            public_scheme: std::env::var("PUBLIC_SCHEME").unwrap_or(defaults.public_scheme),
            session_ttl: Duration::from_secs(env_or(
                "SCAN_SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
            sweep_interval: Duration::from_secs(env_or(
                "SESSION_SWEEP_SECS",
                defaults.sweep_interval.as_secs(),
            )),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            default_report_limit: env_or("DEFAULT_REPORT_LIMIT", defaults.default_report_limit),
            max_report_limit: env_or("MAX_REPORT_LIMIT", defaults.max_report_limit),
        }
    }

    /// Public endpoint for scanner URLs: configured base URL, else the
    /// request host, else localhost.
    pub fn public_endpoint(&self, host: Option<&str>) -> Result<PublicEndpoint, ValidationError> {
        let base = self
            .base_url
            .as_deref()
            .or(host)
            .filter(|base| !base.is_empty())
            .unwrap_or(FALLBACK_BASE_URL);
        PublicEndpoint::new(&self.public_scheme, base)
    }

    /// Requested list size clamped to the configured maximum
    pub fn report_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_report_limit)
            .min(self.max_report_limit)
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_endpoint_precedence() {
        let mut config = AppConfig::default();
        let from_host = config.public_endpoint(Some("play.example.net")).unwrap();
        assert_eq!(from_host.base(), "play.example.net");
        assert_eq!(config.public_endpoint(None).unwrap().base(), "localhost:5000");

        config.base_url = Some("scan.example.com".to_string());
        let configured = config.public_endpoint(Some("ignored.host")).unwrap();
        assert_eq!(configured.base(), "scan.example.com");
        assert_eq!(configured.scheme(), "https");
    }

    #[test]
    fn test_public_endpoint_rejects_bad_host() {
        let config = AppConfig::default();
        assert!(config.public_endpoint(Some("evil\"host")).is_err());
    }

    #[test]
    fn test_report_limit() {
        let config = AppConfig::default();
        assert_eq!(config.report_limit(None), 10);
        assert_eq!(config.report_limit(Some(3)), 3);
        assert_eq!(config.report_limit(Some(1000)), 100);
    }
}
