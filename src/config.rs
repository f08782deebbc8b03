//! Server configuration from environment variables

use crate::runtime::RuntimeConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 32769;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 3600;

/// Configuration for the echo agent server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    /// `None` keeps actors alive until the process exits
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = var("ECHO_AGENT_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".echo-agent").join("echo.db")
            },
            PathBuf::from,
        );

        let host = var("ECHO_AGENT_HOST")
            .and_then(|h| h.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let port = var("ECHO_AGENT_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let idle_secs = var("ECHO_AGENT_IDLE_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);
        let idle_timeout = (idle_secs > 0).then(|| Duration::from_secs(idle_secs));

        Self {
            db_path,
            host,
            port,
            idle_timeout,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            idle_timeout: self.idle_timeout,
            ..RuntimeConfig::default()
        }
    }
}
