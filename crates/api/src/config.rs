//! Application configuration loaded from environment variables.

use std::time::Duration;

use orders::CompensationMode;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CART_SERVICE_URL`: cart service base URL (default: `"http://cart-service"`)
/// - `MEDICINE_SERVICE_URL`: medicine service base URL (default: `"http://medicine-service"`)
/// - `UPSTREAM_TIMEOUT_MS`: per-request upstream timeout (default: `5000`)
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `COMPENSATE_ON_FAILURE`: unwind failed placements (default: `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cart_service_url: String,
    pub medicine_service_url: String,
    pub upstream_timeout_ms: u64,
    pub database_url: Option<String>,
    pub compensate_on_failure: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            cart_service_url: lookup("CART_SERVICE_URL").unwrap_or(defaults.cart_service_url),
            medicine_service_url: lookup("MEDICINE_SERVICE_URL")
                .unwrap_or(defaults.medicine_service_url),
            upstream_timeout_ms: lookup("UPSTREAM_TIMEOUT_MS")
                .and_then(|t| t.parse::<u64>().ok())
                .filter(|&ms| ms > 0)
                .unwrap_or(defaults.upstream_timeout_ms),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            compensate_on_failure: lookup("COMPENSATE_ON_FAILURE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.compensate_on_failure),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn compensation_mode(&self) -> CompensationMode {
        CompensationMode::from_enabled(self.compensate_on_failure)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            cart_service_url: "http://cart-service".to_string(),
            medicine_service_url: "http://medicine-service".to_string(),
            upstream_timeout_ms: 5000,
            database_url: None,
            compensate_on_failure: true,
        }
    }
}
