//! Connection supervisor — the outer reconnect state machine.
//!
//! Opens a sensor session, runs the relay loop until the session is lost,
//! tears down, waits out the backoff, and tries again. Runs until the
//! process is stopped or the (optional) retry limit is reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::output::sink::FrameSink;
use crate::relay::forward::{run_relay_loop, RelayExit};
use crate::relay::stats::RelayStats;
use crate::sensor::api::SensorDriver;
use crate::sensor::session::SensorSession;

/// Reconnect behaviour after a sensor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between connection attempts.
    pub backoff: Duration,
    /// Consecutive failed attempts before giving up; `None` retries
    /// forever. A successful configure resets the counter.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Lifecycle state of the sensor connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Configuring,
    Streaming,
    TearingDown,
}

/// Why the supervisor returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The run flag was cleared.
    Stopped,
    /// `RetryPolicy::max_attempts` consecutive connection attempts failed.
    AttemptsExhausted,
}

/// Drives connect/configure/stream/teardown cycles over one sensor driver.
///
/// The destination sink is owned by the caller for the process lifetime and
/// is never reopened here — sensor connectivity and destination
/// availability are independent failure domains.
pub struct Supervisor<D: SensorDriver + ?Sized> {
    driver: Arc<D>,
    state: ConnectionState,
    stats: RelayStats,
}

impl<D: SensorDriver + ?Sized> Supervisor<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            state: ConnectionState::Disconnected,
            stats: RelayStats::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!("sensor connection: {:?} -> {next:?}", self.state);
            self.state = next;
        }
    }

    /// Run the reconnect loop until stopped.
    pub fn run(
        &mut self,
        config: &RelayConfig,
        sink: &mut dyn FrameSink,
        running: &AtomicBool,
    ) -> SupervisorExit {
        let mut failed_attempts: u32 = 0;

        loop {
            if !running.load(Ordering::Relaxed) {
                self.transition(ConnectionState::Disconnected);
                return SupervisorExit::Stopped;
            }

            self.transition(ConnectionState::Connecting);
            let mut session = match SensorSession::open(Arc::clone(&self.driver)) {
                Ok(session) => session,
                Err(err) => {
                    warn!("sensor connection failed: {err}; retrying in {:?}", config.retry.backoff);
                    failed_attempts += 1;
                    if attempts_exhausted(&config.retry, failed_attempts) {
                        return SupervisorExit::AttemptsExhausted;
                    }
                    self.transition(ConnectionState::Disconnected);
                    wait_backoff(config.retry.backoff, running);
                    continue;
                }
            };

            self.transition(ConnectionState::Configuring);
            if let Err(err) = session.configure(config.mode) {
                warn!("stream configuration failed: {err}; reconnecting in {:?}", config.retry.backoff);
                session.close();
                failed_attempts += 1;
                if attempts_exhausted(&config.retry, failed_attempts) {
                    return SupervisorExit::AttemptsExhausted;
                }
                self.transition(ConnectionState::Disconnected);
                wait_backoff(config.retry.backoff, running);
                continue;
            }
            failed_attempts = 0;

            info!(
                "sensor connected, streaming {} to {}",
                config.mode, config.loopback_path
            );
            self.transition(ConnectionState::Streaming);
            let exit = run_relay_loop(&mut session, sink, config, &mut self.stats, running);

            self.transition(ConnectionState::TearingDown);
            session.close();

            match exit {
                RelayExit::Stopped => {
                    self.transition(ConnectionState::Disconnected);
                    return SupervisorExit::Stopped;
                }
                RelayExit::SessionLost => {
                    warn!(
                        "sensor connection lost, reconnecting in {:?}",
                        config.retry.backoff
                    );
                    self.transition(ConnectionState::Disconnected);
                    wait_backoff(config.retry.backoff, running);
                }
            }
        }
    }
}

fn attempts_exhausted(policy: &RetryPolicy, failed_attempts: u32) -> bool {
    policy
        .max_attempts
        .is_some_and(|max| failed_attempts >= max)
}

/// Sleep out the backoff in small steps so a cleared run flag is noticed
/// promptly.
fn wait_backoff(backoff: Duration, running: &AtomicBool) {
    const STEP: Duration = Duration::from_millis(100);
    let mut remaining = backoff;
    while !remaining.is_zero() && running.load(Ordering::Relaxed) {
        let step = remaining.min(STEP);
        std::thread::sleep(step);
        remaining -= step;
    }
}
