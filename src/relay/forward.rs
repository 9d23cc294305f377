//! The steady-state forwarding loop for one open sensor session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::output::sink::FrameSink;
use crate::relay::convert::depth_to_gray8;
use crate::relay::stats::RelayStats;
use crate::sensor::api::SensorDriver;
use crate::sensor::session::SensorSession;

/// Why the relay loop returned control to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// The event pump failed — the session is gone, reconnect.
    SessionLost,
    /// The run flag was cleared — shut down cleanly.
    Stopped,
}

/// Pump sensor events and forward ready frames until the session is lost
/// or the run flag clears.
///
/// Destination write failures are logged and counted but never terminate
/// the loop: the sensor connection remains valid even when the destination
/// device is temporarily unwritable. The only session-fatal signal is a
/// `pump_events` failure.
pub fn run_relay_loop<D: SensorDriver + ?Sized>(
    session: &mut SensorSession<D>,
    sink: &mut dyn FrameSink,
    config: &RelayConfig,
    stats: &mut RelayStats,
    running: &AtomicBool,
) -> RelayExit {
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        if let Err(err) = session.pump_events() {
            warn!("sensor event pump failed: {err}");
            return RelayExit::SessionLost;
        }

        if config.mode.video_source().is_some() {
            if let Some(frame) = session.video_slot().take_if_fresh() {
                match sink.write_frame(&frame) {
                    Ok(written) => stats.record_video(written),
                    Err(err) => {
                        stats.record_write_failure();
                        debug!("dropping video frame, destination write failed: {err}");
                    }
                }
            }
        }

        if config.mode.depth_enabled() {
            if let Some(samples) = session.depth_slot().take_if_fresh() {
                let gray = depth_to_gray8(&samples);
                match sink.write_frame(&gray) {
                    Ok(written) => stats.record_depth(written),
                    Err(err) => {
                        stats.record_write_failure();
                        debug!("dropping depth frame, destination write failed: {err}");
                    }
                }
            }
        }

        if last_report.elapsed() >= config.stats_interval {
            let snapshot = stats.snapshot();
            info!(
                fps = snapshot.fps,
                video_frames = snapshot.video_frames,
                depth_frames = snapshot.depth_frames,
                write_failures = snapshot.write_failures,
                "relay statistics"
            );
            last_report = Instant::now();
        }

        std::thread::sleep(config.poll_interval);
    }

    RelayExit::Stopped
}
