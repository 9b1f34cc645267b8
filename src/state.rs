//! Shared sensor state
//!
//! `SensorState` is the single record touched by both the emission thread and
//! the control handlers. All fields live behind one mutex so a snapshot is
//! always a consistent combination; mutations are lock-copy-unlock with no
//! I/O under the lock. A condvar paired with the mutex turns the emission
//! loop's sleep into an interruptible wait: any control mutation wakes the
//! loop immediately instead of after the current interval elapses.
//!
//! `paused` and `running` are independent flags and `running == false`
//! dominates: the loop exits regardless of `paused`, so a status snapshot may
//! legitimately show `paused: true, running: false`.

use crate::error::{SensorError, SensorResult};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default reporting interval when the node starts
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug)]
struct Inner {
    interval: Duration,
    paused: bool,
    running: bool,
    last_value: Option<f64>,
    last_sent_at: Option<DateTime<Utc>>,
    /// Bumped on every control mutation so a waiter can detect a change
    /// that lands between taking a snapshot and starting to wait.
    epoch: u64,
}

/// Consistent copy of the sensor state, as returned by `status()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub interval_ms: u64,
    pub paused: bool,
    pub running: bool,
    pub last_value: Option<f64>,
    pub last_sent_at: Option<DateTime<Utc>>,
}

pub struct SensorState {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl SensorState {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                interval,
                paused: false,
                running: true,
                last_value: None,
                last_sent_at: None,
                epoch: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Atomic snapshot of all fields
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        StateSnapshot {
            interval_ms: inner.interval.as_millis() as u64,
            paused: inner.paused,
            running: inner.running,
            last_value: inner.last_value,
            last_sent_at: inner.last_sent_at,
        }
    }

    /// Snapshot plus the change epoch it was taken at, for use with
    /// [`wait_for_change`](Self::wait_for_change)
    pub fn observe(&self) -> (StateSnapshot, u64) {
        let inner = self.inner.lock();
        let snapshot = StateSnapshot {
            interval_ms: inner.interval.as_millis() as u64,
            paused: inner.paused,
            running: inner.running,
            last_value: inner.last_value,
            last_sent_at: inner.last_sent_at,
        };
        (snapshot, inner.epoch)
    }

    /// Set the reporting interval. Zero is rejected with `InvalidArgument`
    /// and the previous interval stays in effect.
    pub fn set_interval(&self, interval: Duration) -> SensorResult<()> {
        if interval.is_zero() {
            return Err(SensorError::InvalidArgument(
                "interval must be strictly positive".to_string(),
            ));
        }
        let mut inner = self.inner.lock();
        inner.interval = interval;
        inner.epoch += 1;
        self.changed.notify_all();
        Ok(())
    }

    pub fn set_paused(&self, paused: bool) {
        let mut inner = self.inner.lock();
        inner.paused = paused;
        inner.epoch += 1;
        self.changed.notify_all();
    }

    pub fn set_running(&self, running: bool) {
        let mut inner = self.inner.lock();
        inner.running = running;
        inner.epoch += 1;
        self.changed.notify_all();
    }

    /// Record the most recent emitted value (emission-thread bookkeeping;
    /// does not bump the epoch, the loop would only wake itself)
    pub fn record_value(&self, value: f64) {
        let mut inner = self.inner.lock();
        inner.last_value = Some(value);
        inner.last_sent_at = Some(Utc::now());
    }

    /// Wait until a control mutation lands or `timeout` elapses.
    ///
    /// `since_epoch` is the epoch returned by [`observe`](Self::observe);
    /// a mutation between that observation and this call returns
    /// immediately. Returns `true` when a change was seen.
    pub fn wait_for_change(&self, since_epoch: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.epoch == since_epoch {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self
                .changed
                .wait_for(&mut inner, deadline - now)
                .timed_out()
            {
                return inner.epoch != since_epoch;
            }
        }
        true
    }
}
