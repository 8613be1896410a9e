//! Configuration loading from environment variables
//!
//! Helpers for reading typed values from the environment and `.env`
//! files, and the [`HarnessConfig`] built from them.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Environment variable holding the test server bind address.
pub const BIND_ADDR_VAR: &str = "TESTBED_BIND_ADDR";
/// Environment variable toggling the request log middleware.
pub const REQUEST_LOG_VAR: &str = "TESTBED_REQUEST_LOG";
/// Environment variable toggling the trace id middleware.
pub const TRACE_ID_VAR: &str = "TESTBED_TRACE_ID";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";

/// Load environment variables from `.env` files if it exists.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Get a required environment variable.
pub fn get_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Get an optional environment with a default value
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    let value = get_env(key)?;
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}

/// Get and parse an environment variable with a default.
pub fn get_env_parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable '{0}'")]
    Missing(String),
    #[error(
        "Invalid value '{value}' for environment variable '{key}' (failed to parse as expected type)"
    )]
    Invalid { key: String, value: String },
}

/// Settings for a [`TestHarness`](crate::testing::TestHarness).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Address the background test server binds to.
    pub bind_addr: SocketAddr,
    /// Install [`RequestLogMiddleware`](crate::middleware::RequestLogMiddleware).
    pub request_log: bool,
    /// Install [`TraceIdMiddleware`](crate::middleware::TraceIdMiddleware).
    pub trace_id: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            request_log: true,
            trace_id: true,
        }
    }
}

impl HarnessConfig {
    /// Reads `TESTBED_BIND_ADDR`, `TESTBED_REQUEST_LOG` and
    /// `TESTBED_TRACE_ID`, after loading any `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let raw = get_env_or(BIND_ADDR_VAR, DEFAULT_BIND_ADDR);
        let bind_addr = raw.parse().map_err(|_| ConfigError::Invalid {
            key: BIND_ADDR_VAR.to_string(),
            value: raw.clone(),
        })?;

        Ok(Self {
            bind_addr,
            request_log: get_env_parsed_or(REQUEST_LOG_VAR, true),
            trace_id: get_env_parsed_or(TRACE_ID_VAR, true),
        })
    }
}
