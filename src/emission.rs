//! Emission loop
//!
//! The long-lived sensor thread: handshake once, then snapshot state, emit,
//! wait, repeat. `running == false` is the only cancellation signal; the
//! thread is never terminated from outside. All waits go through the state
//! condvar, so a pause/stop/interval change from a control handler takes
//! effect within one poll interval rather than after the current sleep.
//!
//! Lifecycle: Starting -> Running <-> Paused -> Stopped. Paused is
//! re-enterable; Stopped is terminal for the thread.

use crate::collector::{CollectorLink, ReconnectStrategy};
use crate::reading::ReadingGenerator;
use crate::state::SensorState;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the paused loop re-checks state. Any control mutation is
/// observed within one of these intervals.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct EmissionLoop {
    state: Arc<SensorState>,
    link: CollectorLink,
    generator: ReadingGenerator,
    reconnect: ReconnectStrategy,
}

impl EmissionLoop {
    pub fn new(
        state: Arc<SensorState>,
        link: CollectorLink,
        generator: ReadingGenerator,
        reconnect: ReconnectStrategy,
    ) -> Self {
        Self {
            state,
            link,
            generator,
            reconnect,
        }
    }

    /// Start the loop on its own named thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("emission".to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        tracing::info!("emission loop starting");

        // Identification precedes any reading on this connection
        if let Err(e) = self.link.identify() {
            tracing::warn!("handshake failed: {}", e);
            if !self.recover() {
                self.finish();
                return;
            }
        }

        let mut was_paused = false;
        loop {
            let (snapshot, epoch) = self.state.observe();

            if !snapshot.running {
                break;
            }

            if snapshot.paused {
                if !was_paused {
                    tracing::info!("emission paused");
                    was_paused = true;
                }
                self.state.wait_for_change(epoch, POLL_INTERVAL);
                continue;
            }
            if was_paused {
                tracing::info!("emission resumed");
                was_paused = false;
            }

            let reading = self.generator.next();
            match self.link.send(&reading) {
                Ok(()) => {
                    self.state.record_value(reading.intensity_mm_h);
                    tracing::debug!(intensity = reading.intensity_mm_h, "reading sent");
                }
                Err(e) => {
                    tracing::warn!("write failed: {}", e);
                    if !self.recover() {
                        break;
                    }
                    continue;
                }
            }

            self.state
                .wait_for_change(epoch, Duration::from_millis(snapshot.interval_ms));
        }

        self.finish();
    }

    /// Bounded reconnect-retry sequence after a broken connection.
    /// Re-handshakes on success. Returns false when retries are exhausted
    /// or a stop arrives mid-backoff.
    fn recover(&mut self) -> bool {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if !self.reconnect.should_retry(attempt) {
                tracing::error!("giving up on collector after {} attempts", attempt - 1);
                return false;
            }

            let (snapshot, epoch) = self.state.observe();
            if !snapshot.running {
                return false;
            }

            let delay = self.reconnect.backoff_delay(attempt);
            if !delay.is_zero() {
                self.state.wait_for_change(epoch, delay);
                if !self.state.snapshot().running {
                    return false;
                }
            }

            match self.link.reconnect().and_then(|_| self.link.identify()) {
                Ok(()) => {
                    tracing::info!("reconnected to collector on attempt {}", attempt);
                    return true;
                }
                Err(e) => {
                    tracing::warn!("reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    fn finish(self) {
        // Reflect the terminal state so /status reports it even when the
        // loop stopped on its own (exhausted retries)
        self.state.set_running(false);
        self.link.close();
        tracing::info!("emission loop stopped");
    }
}
