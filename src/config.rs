//! Relay configuration, built once at startup from the CLI surface and
//! passed by reference into the supervisor.

use std::time::Duration;

use crate::relay::supervisor::RetryPolicy;
use crate::sensor::types::{FrameGeometry, StreamMode};

/// Default v4l2loopback device node.
pub const DEFAULT_LOOPBACK_DEVICE: &str = "/dev/video2";

/// Pause between relay loop iterations. Bounds CPU usage and the
/// forwarding duty cycle; not a real-time guarantee.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How often the relay loop logs a statistics snapshot.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Everything the relay pipeline needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Enabled capture streams.
    pub mode: StreamMode,
    /// Path of the destination loopback device.
    pub loopback_path: String,
    /// Capture and output geometry.
    pub geometry: FrameGeometry,
    /// Sleep between relay loop iterations.
    pub poll_interval: Duration,
    /// Interval between logged statistics snapshots.
    pub stats_interval: Duration,
    /// Reconnect behaviour after sensor failures.
    pub retry: RetryPolicy,
}

impl RelayConfig {
    pub fn new(mode: StreamMode, loopback_path: impl Into<String>) -> Self {
        Self {
            mode,
            loopback_path: loopback_path.into(),
            geometry: FrameGeometry::VGA,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stats_interval: DEFAULT_STATS_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_pipeline_parameters() {
        let config = RelayConfig::new(StreamMode::Color, DEFAULT_LOOPBACK_DEVICE);
        assert_eq!(config.geometry, FrameGeometry::VGA);
        assert_eq!(config.loopback_path, "/dev/video2");
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.retry.backoff, Duration::from_secs(5));
        assert!(config.retry.max_attempts.is_none());
    }
}
