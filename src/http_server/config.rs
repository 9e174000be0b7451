//! Listener address and the function keys HTTP triggers are checked against

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 80;

/// HTTP listener settings; absent JSON fields take the defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Interface to listen on
    pub host: String,

    pub port: u16,

    /// Function keys; when empty only anonymous functions are reachable
    pub keys: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self::listen(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl HttpServerConfig {
    /// Listen on `host:port` with no keys
    pub fn listen(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            keys: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    /// Address handed to the TCP listener
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpServerConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:80");
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HttpServerConfig = serde_json::from_str(r#"{"keys":["secret"]}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.keys, vec!["secret".to_string()]);
    }

    #[test]
    fn test_listen_with_keys() {
        let config = HttpServerConfig::listen("127.0.0.1", 7071).with_keys(vec!["k".into()]);
        assert_eq!(config.socket_addr(), "127.0.0.1:7071");
        assert_eq!(config.keys.len(), 1);
    }
}
