//! Collector link
//!
//! Outbound TCP connection to the data collector. The protocol is
//! fire-and-forget lines: after connecting, the node identifies itself with
//! the fixed token `lluvia` (exactly once, before any reading), then sends
//! one reading per line. No response is expected or read.
//!
//! `ReconnectStrategy` bounds how hard the emission loop tries to get the
//! connection back after a mid-stream write failure.

use crate::error::{SensorError, SensorResult};
use crate::reading::Reading;
use rand::Rng;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Identification token sent on the data channel. Intentionally distinct
/// from the control-registry service name (two different external systems).
pub const IDENT_TOKEN: &str = "lluvia";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl CollectorConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: CONNECT_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
        }
    }
}

/// The live connection to the collector. Owned exclusively by the emission
/// thread; control handlers never touch it.
pub struct CollectorLink {
    config: CollectorConfig,
    stream: TcpStream,
}

impl CollectorLink {
    /// Establish the data channel. Bounded by the configured connect timeout
    /// so a stalled collector cannot wedge startup indefinitely.
    pub fn connect(config: CollectorConfig) -> SensorResult<Self> {
        let stream = Self::open(&config)?;
        Ok(Self { config, stream })
    }

    fn open(config: &CollectorConfig) -> SensorResult<TcpStream> {
        let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| {
                SensorError::Connection(format!(
                    "cannot resolve {}:{}: {}",
                    config.host, config.port, e
                ))
            })?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, config.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(config.write_timeout))
                        .map_err(|e| SensorError::Connection(e.to_string()))?;
                    stream.set_nodelay(true).ok();
                    tracing::info!("connected to collector at {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(SensorError::Connection(format!(
            "{}:{}: {}",
            config.host,
            config.port,
            last_err.map_or_else(|| "no addresses resolved".to_string(), |e| e.to_string())
        )))
    }

    /// Send the identification token, newline-terminated and flushed.
    /// Must be called exactly once per connection, before any reading.
    pub fn identify(&mut self) -> SensorResult<()> {
        self.write_line(IDENT_TOKEN)
    }

    /// Send one reading as an auto-flushed line
    pub fn send(&mut self, reading: &Reading) -> SensorResult<()> {
        self.write_line(&reading.encode_line())
    }

    fn write_line(&mut self, line: &str) -> SensorResult<()> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|_| self.stream.write_all(b"\n"))
            .and_then(|_| self.stream.flush())
            .map_err(|e| SensorError::Write(e.to_string()))
    }

    /// Tear down and re-establish the connection to the same collector
    pub fn reconnect(&mut self) -> SensorResult<()> {
        self.stream.shutdown(Shutdown::Both).ok();
        self.stream = Self::open(&self.config)?;
        Ok(())
    }

    pub fn close(self) {
        self.stream.shutdown(Shutdown::Both).ok();
    }
}

/// Bounded reconnect policy with exponential backoff
#[derive(Debug, Clone)]
pub struct ReconnectStrategy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// 0 = retry forever
    pub max_retries: usize,
    pub jitter: bool,
}

impl Default for ReconnectStrategy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            max_retries: 10,
            jitter: true,
        }
    }
}

impl ReconnectStrategy {
    /// Short backoffs and few retries, for tests
    pub fn testing() -> Self {
        Self {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            multiplier: 1.5,
            max_retries: 3,
            jitter: false,
        }
    }

    /// Backoff before the given attempt (1-based). Attempt 0 is immediate.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms =
            self.initial_backoff.as_millis() as f64 * self.multiplier.powi((attempt - 1) as i32);
        let capped = Duration::from_millis(delay_ms as u64).min(self.max_backoff);

        if self.jitter {
            // ±20% to avoid lockstep retries against a recovering collector
            let factor = rand::thread_rng().gen_range(0.8..=1.2);
            Duration::from_millis((capped.as_millis() as f64 * factor) as u64)
        } else {
            capped
        }
    }

    pub fn should_retry(&self, attempt: usize) -> bool {
        self.max_retries == 0 || attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn test_backoff_increases() {
        let strategy = ReconnectStrategy::testing();
        assert!(strategy.backoff_delay(2) > strategy.backoff_delay(1));
        assert!(strategy.backoff_delay(3) > strategy.backoff_delay(2));
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let strategy = ReconnectStrategy {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            max_retries: 0,
            jitter: false,
        };
        assert!(strategy.backoff_delay(100) <= Duration::from_secs(5));
    }

    #[test]
    fn test_retries_bounded_unless_infinite() {
        let bounded = ReconnectStrategy::testing();
        assert!(bounded.should_retry(0));
        assert!(bounded.should_retry(2));
        assert!(!bounded.should_retry(3));

        let infinite = ReconnectStrategy {
            max_retries: 0,
            ..ReconnectStrategy::testing()
        };
        assert!(infinite.should_retry(1000));
    }

    #[test]
    fn test_identify_then_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let mut lines = BufReader::new(socket).lines();
            let first = lines.next().unwrap().unwrap();
            let second = lines.next().unwrap().unwrap();
            (first, second)
        });

        let config = CollectorConfig::new(addr.ip().to_string(), addr.port());
        let mut link = CollectorLink::connect(config).unwrap();
        link.identify().unwrap();
        link.send(&Reading {
            intensity_mm_h: 4.2,
            timestamp: Utc::now(),
        })
        .unwrap();
        link.close();

        let (first, second) = server.join().unwrap();
        assert_eq!(first, IDENT_TOKEN);
        assert_eq!(second, "4.20");
    }

    #[test]
    fn test_send_fails_after_collector_drops() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let config = CollectorConfig::new(addr.ip().to_string(), addr.port());
        let mut link = CollectorLink::connect(config).unwrap();

        let (socket, _) = listener.accept().unwrap();
        drop(socket);
        drop(listener);

        // The first write after the peer closes may still land in the send
        // buffer; the failure must surface within a few sends.
        let reading = Reading {
            intensity_mm_h: 1.0,
            timestamp: Utc::now(),
        };
        let mut failed = false;
        for _ in 0..50 {
            if link.send(&reading).is_err() {
                failed = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(failed, "send never reported the broken connection");
    }

    #[test]
    fn test_connect_refused_is_connection_error() {
        // Bind-then-drop leaves a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = CollectorConfig::new(addr.ip().to_string(), addr.port());
        match CollectorLink::connect(config) {
            Err(SensorError::Connection(_)) => {}
            other => panic!("expected Connection error, got {:?}", other.map(|_| ())),
        }
    }
}
