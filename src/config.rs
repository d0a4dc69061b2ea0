use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "localhost";
pub const DEFAULT_BIND_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    /// `None` disables the per-connection read deadline.
    pub read_timeout: Option<Duration>,
    pub max_request_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_ADDR must not be empty")]
    EmptyBindAddr,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("READ_TIMEOUT_SECS must be a non-negative integer")]
    InvalidReadTimeout,
    #[error("MAX_REQUEST_BYTES must be a positive integer")]
    InvalidMaxRequestBytes,
    #[error("could not resolve {addr}")]
    InvalidSocket { addr: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bind_port: DEFAULT_BIND_PORT,
            read_timeout: Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Set-but-blank values are rejected by the parsers below.
        let read = |key: &str| lookup(key).map(|value| value.trim().to_string());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyBindAddr),
            Some(value) => value.trim().to_string(),
            None => DEFAULT_BIND_ADDR.to_string(),
        };

        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_BIND_PORT);

        let read_timeout_secs = read("READ_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidReadTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS);

        let max_request_bytes = read("MAX_REQUEST_BYTES")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or(ConfigError::InvalidMaxRequestBytes)
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);

        Ok(Self {
            bind_addr,
            bind_port,
            read_timeout: (read_timeout_secs > 0).then(|| Duration::from_secs(read_timeout_secs)),
            max_request_bytes,
        })
    }

    /// Resolves the configured host and port to the first matching socket address.
    pub async fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = || ConfigError::InvalidSocket {
            addr: format!("{}:{}", self.bind_addr, self.bind_port),
        };

        tokio::net::lookup_host((self.bind_addr.as_str(), self.bind_port))
            .await
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = from_pairs(&[]).expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr, "localhost");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_request_bytes, 65536);
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            ("BIND_ADDR", " 127.0.0.1 "),
            ("BIND_PORT", "9000"),
            ("READ_TIMEOUT_SECS", "0"),
            ("MAX_REQUEST_BYTES", "2048"),
        ])
        .expect("config should parse");

        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.max_request_bytes, 2048);
    }

    #[test]
    fn invalid_port_fails() {
        let err = from_pairs(&[("BIND_PORT", "70000")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn blank_numeric_values_fail() {
        let err = from_pairs(&[("BIND_PORT", "")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));

        let err =
            from_pairs(&[("READ_TIMEOUT_SECS", " ")]).expect_err("expected invalid timeout");
        assert!(matches!(err, ConfigError::InvalidReadTimeout));

        let err =
            from_pairs(&[("MAX_REQUEST_BYTES", "")]).expect_err("expected invalid limit");
        assert!(matches!(err, ConfigError::InvalidMaxRequestBytes));
    }

    #[test]
    fn empty_bind_addr_fails() {
        let err = from_pairs(&[("BIND_ADDR", "  ")]).expect_err("expected empty addr");
        assert!(matches!(err, ConfigError::EmptyBindAddr));
    }

    #[test]
    fn zero_request_limit_fails() {
        let err =
            from_pairs(&[("MAX_REQUEST_BYTES", "0")]).expect_err("expected invalid limit");
        assert!(matches!(err, ConfigError::InvalidMaxRequestBytes));
    }

    #[test]
    fn invalid_timeout_fails() {
        let err =
            from_pairs(&[("READ_TIMEOUT_SECS", "soon")]).expect_err("expected invalid timeout");
        assert!(matches!(err, ConfigError::InvalidReadTimeout));
    }

    #[tokio::test]
    async fn bind_socket_resolves_ip_literal() {
        let config = from_pairs(&[("BIND_ADDR", "127.0.0.1"), ("BIND_PORT", "0")])
            .expect("config should parse");
        let addr = config.bind_socket().await.expect("address should resolve");
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 0);
    }
}
