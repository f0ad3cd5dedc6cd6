// Process configuration
//
// Three values come from the environment at startup; everything else is
// derived. The proxy's auxiliary HTTP API always listens on proxy_port + 1.

use std::path::PathBuf;

pub const DEFAULT_JDWP_PORT: u16 = 61959;
pub const DEFAULT_PROXY_PORT: u16 = 55005;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the target JVM's JDWP agent listens on.
    pub jdwp_port: u16,
    /// Ingress port of the multiplexing proxy; this is what we attach to.
    pub proxy_port: u16,
    /// Directory holding the collaborator proxy artifact, if configured.
    pub proxy_home: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            jdwp_port: port_from_env("JVM_JDWP_PORT", DEFAULT_JDWP_PORT),
            proxy_port: port_from_env("DEBUG_PROXY_PORT", DEFAULT_PROXY_PORT),
            proxy_home: std::env::var_os("DEBUG_PROXY_HOME").map(PathBuf::from),
        }
    }

    /// Port of the proxy's auxiliary HTTP API.
    pub fn proxy_http_port(&self) -> u16 {
        self.proxy_port + 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jdwp_port: DEFAULT_JDWP_PORT,
            proxy_port: DEFAULT_PROXY_PORT,
            proxy_home: None,
        }
    }
}

fn port_from_env(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_proxy_contract() {
        let config = Config::default();
        assert_eq!(config.jdwp_port, 61959);
        assert_eq!(config.proxy_port, 55005);
        assert_eq!(config.proxy_http_port(), 55006);
        assert!(config.proxy_home.is_none());
    }
}
