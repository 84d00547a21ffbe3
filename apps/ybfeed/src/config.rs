use std::env;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// ybfeed client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the feed server
    pub server: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server URL '{server}': {source}")]
    Invalid {
        server: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server URL must be http or https: '{server}'")]
    Scheme { server: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server = env::var("YBFEED_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        Self::with_server(server)
    }

    pub fn with_server(server: String) -> Self {
        // Accept a bare host:port and assume plain http
        let server = if server.contains("://") {
            server
        } else {
            format!("http://{server}")
        };
        // Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
        let server = if server.contains("//localhost") {
            server.replacen("//localhost", "//127.0.0.1", 1)
        } else {
            server
        };
        Self { server }
    }

    /// The parsed server base URL. Guarantees an http(s) scheme, which the
    /// API client relies on when deriving the websocket endpoint.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.server).map_err(|source| ConfigError::Invalid {
            server: self.server.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Scheme {
                server: self.server.clone(),
            });
        }
        Ok(url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    // Mutex to ensure environment variable tests don't run in parallel
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_config_from_env_default() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::remove_var("YBFEED_SERVER");
        let config = Config::from_env();
        assert_eq!(config.server, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_config_from_env_custom() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let original = env::var("YBFEED_SERVER").ok();

        env::set_var("YBFEED_SERVER", "https://feed.example.com");
        let config = Config::from_env();
        assert_eq!(config.server, "https://feed.example.com");

        match original {
            Some(orig) => env::set_var("YBFEED_SERVER", orig),
            None => env::remove_var("YBFEED_SERVER"),
        }
    }

    #[test]
    fn test_localhost_normalized_to_ipv4() {
        let config = Config::with_server("http://localhost:8080".to_string());
        assert_eq!(config.server, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_bare_host_gets_http_scheme() {
        let config = Config::with_server("feed.example.com:8080".to_string());
        assert_eq!(config.server, "http://feed.example.com:8080");
    }

    #[test]
    fn test_base_url_rejects_non_http_schemes() {
        let config = Config {
            server: "ftp://feed.example.com".to_string(),
        };
        assert!(matches!(
            config.base_url(),
            Err(ConfigError::Scheme { .. })
        ));
    }
}
