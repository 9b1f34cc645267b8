//! Control-name advertisement
//!
//! Binds the control endpoint under a fixed symbolic name so an operator
//! console can resolve it without knowing host/port. The name is carried by
//! an mDNS service advertisement and is intentionally distinct from the data
//! channel's identification token (`lluvia` addresses the collector,
//! `sensor-lluvia` addresses the console). Advertisement failure is
//! non-fatal: an already-running responder is tolerated and the HTTP
//! endpoint keeps serving.

use crate::error::{SensorError, SensorResult};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::sync::Arc;

pub const SERVICE_TYPE: &str = "_lluvia-ctl._tcp.local.";

/// Fixed symbolic name the operator console resolves
pub const CONTROL_NAME: &str = "sensor-lluvia";

pub struct ControlAdvertiser {
    daemon: Arc<ServiceDaemon>,
}

impl ControlAdvertiser {
    pub fn new() -> SensorResult<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| SensorError::Registry(e.to_string()))?;
        Ok(Self {
            daemon: Arc::new(daemon),
        })
    }

    /// Advertise the control endpoint under [`CONTROL_NAME`]
    pub fn advertise(&self, hostname: &str, control_port: u16) -> SensorResult<()> {
        let ip = resolve_advertised_ip(hostname);
        let service_hostname = format!("{}.local.", hostname);

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            CONTROL_NAME,
            &service_hostname,
            ip,
            control_port,
            None,
        )
        .map_err(|e| SensorError::Registry(e.to_string()))?;

        self.daemon
            .register(service_info)
            .map_err(|e| SensorError::Registry(e.to_string()))?;

        tracing::info!(
            "control endpoint '{}' advertised at {}:{}",
            CONTROL_NAME,
            ip,
            control_port
        );
        Ok(())
    }

    pub fn stop(&self) {
        self.daemon.shutdown().ok();
    }
}

fn resolve_advertised_ip(hostname: &str) -> IpAddr {
    if let Ok(mut addrs) = (hostname, 0).to_socket_addrs() {
        if let Some(addr) = addrs.next() {
            return addr.ip();
        }
    }
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_distinct_identifiers() {
        // Data token addresses the collector, control name the console
        assert_ne!(CONTROL_NAME, crate::collector::IDENT_TOKEN);
    }

    #[test]
    fn test_resolve_falls_back_to_localhost() {
        let ip = resolve_advertised_ip("definitely-not-a-real-host.invalid");
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_resolve_localhost() {
        let ip = resolve_advertised_ip("localhost");
        assert!(ip.is_loopback());
    }

    #[test]
    fn test_advertiser_lives_until_stopped() {
        // The daemon handle inside the advertiser must stay valid across
        // advertise() and a later stop(); environments without multicast
        // networking skip the daemon path entirely
        let Ok(advertiser) = ControlAdvertiser::new() else {
            return;
        };
        let _ = advertiser.advertise("localhost", 22000);
        advertiser.stop();
    }
}
