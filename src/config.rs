//! Environment-derived node configuration
//!
//! Every setting has a documented default so the node runs out of the box
//! against a local collector:
//!
//! - `LLUVIA_COLLECTOR_HOST`: collector hostname, default `localhost`
//! - `LLUVIA_COLLECTOR_PORT`: collector data port, default `20000`
//! - `LLUVIA_HOSTNAME`: this node's advertised hostname, defaulting to the
//!   system hostname and then to `localhost`
//! - `LLUVIA_CONTROL_PORT`: control-plane HTTP port, default `22000`

use crate::error::{SensorError, SensorResult};
use std::env;

pub const DEFAULT_COLLECTOR_HOST: &str = "localhost";
pub const DEFAULT_COLLECTOR_PORT: u16 = 20000;
pub const DEFAULT_CONTROL_PORT: u16 = 22000;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub collector_host: String,
    pub collector_port: u16,
    pub hostname: String,
    pub control_port: u16,
}

impl NodeConfig {
    /// Resolve configuration from the environment, falling back to defaults.
    ///
    /// A variable that is present but unparsable is a hard `Config` error
    /// rather than a silent fallback.
    pub fn from_env() -> SensorResult<Self> {
        Ok(Self {
            collector_host: env::var("LLUVIA_COLLECTOR_HOST")
                .unwrap_or_else(|_| DEFAULT_COLLECTOR_HOST.to_string()),
            collector_port: env_port("LLUVIA_COLLECTOR_PORT", DEFAULT_COLLECTOR_PORT)?,
            hostname: env::var("LLUVIA_HOSTNAME").unwrap_or_else(|_| default_hostname()),
            control_port: env_port("LLUVIA_CONTROL_PORT", DEFAULT_CONTROL_PORT)?,
        })
    }
}

/// The system hostname, or `localhost` when it cannot be read
fn default_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

fn env_port(name: &str, default: u16) -> SensorResult<u16> {
    match env::var(name) {
        Ok(raw) => parse_port(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_port(name: &str, raw: &str) -> SensorResult<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| SensorError::Config(format!("{} is not a valid port: {:?}", name, raw)))
}
