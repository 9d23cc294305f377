//! One sensor connection lifetime: open, configure streams, pump events,
//! tear down.
//!
//! The session owns the frame slots that hand captured payloads from the
//! driver callbacks to the forwarding loop. Callbacks fire only inside
//! [`SensorSession::pump_events`], on the calling thread.

use std::sync::Arc;

use tracing::debug;

use crate::relay::slot::FrameSlot;
use crate::sensor::api::{SensorDriver, SensorHandle};
use crate::sensor::error::{Result, SensorError};
use crate::sensor::types::{SensorResolution, StreamMode};

/// An open connection to one sensor plus its capture state.
///
/// Created and destroyed by the supervisor on every reconnect; the
/// destination device outlives it.
pub struct SensorSession<D: SensorDriver + ?Sized> {
    driver: Arc<D>,
    device: SensorHandle,
    video_slot: Arc<FrameSlot<u8>>,
    depth_slot: Arc<FrameSlot<u16>>,
    video_active: bool,
    depth_active: bool,
    closed: bool,
}

impl<D: SensorDriver + ?Sized> SensorSession<D> {
    /// Initialise the driver context and open device 0.
    ///
    /// # Errors
    ///
    /// `DeviceNotFound` when the sensor stack does not come up,
    /// `DeviceOpenFailed` when a sensor responds but cannot be opened. The
    /// context is shut back down on either failure.
    pub fn open(driver: Arc<D>) -> Result<Self> {
        driver.init().map_err(|err| {
            debug!("sensor init failed: {err}");
            SensorError::DeviceNotFound
        })?;

        let device = match driver.open_device(0) {
            Ok(handle) => handle,
            Err(err) => {
                driver.shutdown();
                return Err(match err {
                    SensorError::DeviceNotFound => err,
                    other => SensorError::DeviceOpenFailed(other.to_string()),
                });
            }
        };

        Ok(Self {
            driver,
            device,
            video_slot: Arc::new(FrameSlot::new()),
            depth_slot: Arc::new(FrameSlot::new()),
            video_active: false,
            depth_active: false,
            closed: false,
        })
    }

    /// Select and activate the streams requested by `mode`.
    ///
    /// Partial activation is unwound before an error is reported: if the
    /// video stream started but depth setup fails, video is stopped again.
    pub fn configure(&mut self, mode: StreamMode) -> Result<()> {
        if let Some(source) = mode.video_source() {
            let slot = Arc::clone(&self.video_slot);
            self.driver
                .set_video_callback(self.device, Box::new(move |frame| slot.write(frame)))?;

            let video_mode = self
                .driver
                .find_video_mode(SensorResolution::Medium, source)
                .map_err(mode_error)?;
            self.driver
                .set_video_mode(self.device, video_mode)
                .map_err(mode_error)?;
            self.driver
                .start_video(self.device)
                .map_err(start_error)?;
            self.video_active = true;
        }

        if mode.depth_enabled() {
            if let Err(err) = self.configure_depth() {
                self.unwind_video();
                return Err(err);
            }
        }
        Ok(())
    }

    fn configure_depth(&mut self) -> Result<()> {
        let slot = Arc::clone(&self.depth_slot);
        self.driver
            .set_depth_callback(self.device, Box::new(move |samples| slot.write(samples)))?;

        let depth_mode = self
            .driver
            .find_depth_mode(SensorResolution::Medium)
            .map_err(mode_error)?;
        self.driver
            .set_depth_mode(self.device, depth_mode)
            .map_err(mode_error)?;
        self.driver
            .start_depth(self.device)
            .map_err(start_error)?;
        self.depth_active = true;
        Ok(())
    }

    fn unwind_video(&mut self) {
        if self.video_active {
            if let Err(err) = self.driver.stop_video(self.device) {
                debug!("stopping video during unwind failed: {err}");
            }
            self.video_active = false;
        }
    }

    /// Service one round of sensor events. Frame callbacks run synchronously
    /// inside this call.
    ///
    /// # Errors
    ///
    /// `SessionLost` when the connection is gone; the caller must tear the
    /// session down and reconnect.
    pub fn pump_events(&mut self) -> Result<()> {
        self.driver.process_events(self.device).map_err(|err| match err {
            SensorError::SessionLost(_) => err,
            other => SensorError::SessionLost(other.to_string()),
        })
    }

    /// Hand-off slot for the most recent video frame.
    pub fn video_slot(&self) -> &FrameSlot<u8> {
        &self.video_slot
    }

    /// Hand-off slot for the most recent depth frame.
    pub fn depth_slot(&self) -> &FrameSlot<u16> {
        &self.depth_slot
    }

    /// Stop active streams and release the device and context.
    ///
    /// Idempotent and safe to call after a partially failed configure.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.unwind_video();
        if self.depth_active {
            if let Err(err) = self.driver.stop_depth(self.device) {
                debug!("stopping depth during close failed: {err}");
            }
            self.depth_active = false;
        }
        if let Err(err) = self.driver.close_device(self.device) {
            debug!("closing sensor device failed: {err}");
        }
        self.driver.shutdown();
        self.closed = true;
    }
}

impl<D: SensorDriver + ?Sized> Drop for SensorSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn mode_error(err: SensorError) -> SensorError {
    match err {
        SensorError::Driver(msg) => SensorError::ModeUnsupported(msg),
        other => other,
    }
}

fn start_error(err: SensorError) -> SensorError {
    match err {
        SensorError::Driver(msg) => SensorError::StreamStartFailed(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::mock::MockSensor;

    #[test]
    fn open_without_device_reports_not_found() {
        let driver = Arc::new(MockSensor::new());
        let result = SensorSession::open(Arc::clone(&driver));
        assert!(matches!(result, Err(SensorError::DeviceNotFound)));
        // Context was brought up, so it must be torn down again
        assert_eq!(driver.shutdown_calls(), 1);
    }

    #[test]
    fn open_maps_driver_failure_to_open_failed() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("open_device", SensorError::Driver("usb stall".to_string())),
        );
        let result = SensorSession::open(Arc::clone(&driver));
        assert!(matches!(result, Err(SensorError::DeviceOpenFailed(_))));
        assert_eq!(driver.shutdown_calls(), 1);
    }

    #[test]
    fn init_failure_reports_device_not_found() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("init", SensorError::Driver("no usb stack".to_string())),
        );
        let result = SensorSession::open(Arc::clone(&driver));
        assert!(matches!(result, Err(SensorError::DeviceNotFound)));
    }

    #[test]
    fn configure_starts_requested_streams() {
        let driver = Arc::new(MockSensor::new().with_devices(1));
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        session.configure(StreamMode::InfraredDepth).unwrap();
        assert_eq!(driver.start_video_calls(), 1);
        assert_eq!(driver.start_depth_calls(), 1);
    }

    #[test]
    fn depth_only_mode_does_not_touch_video() {
        let driver = Arc::new(MockSensor::new().with_devices(1));
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        session.configure(StreamMode::DepthOnly).unwrap();
        assert_eq!(driver.start_video_calls(), 0);
        assert_eq!(driver.start_depth_calls(), 1);
    }

    #[test]
    fn depth_failure_unwinds_started_video() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("set_depth_mode", SensorError::ModeUnsupported("11-bit".to_string())),
        );
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();

        let result = session.configure(StreamMode::InfraredDepth);
        assert!(matches!(result, Err(SensorError::ModeUnsupported(_))));
        // Video had started and must have been stopped again
        assert_eq!(driver.start_video_calls(), 1);
        assert_eq!(driver.stop_video_calls(), 1);
    }

    #[test]
    fn video_mode_rejection_maps_to_mode_unsupported() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("set_video_mode", SensorError::Driver("bad mode".to_string())),
        );
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        let result = session.configure(StreamMode::Infrared);
        assert!(matches!(result, Err(SensorError::ModeUnsupported(_))));
    }

    #[test]
    fn start_failure_maps_to_stream_start_failed() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("start_video", SensorError::Driver("iso xfer".to_string())),
        );
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        let result = session.configure(StreamMode::Infrared);
        assert!(matches!(result, Err(SensorError::StreamStartFailed(_))));
    }

    #[test]
    fn captured_frames_land_in_the_slots() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_video_frame(vec![9u8; 640 * 480])
                .with_depth_frame(vec![2047u16; 640 * 480]),
        );
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        session.configure(StreamMode::InfraredDepth).unwrap();

        session.pump_events().unwrap();

        let video = session.video_slot().take_if_fresh().unwrap();
        assert_eq!(video.len(), 640 * 480);
        assert!(video.iter().all(|&b| b == 9));

        let depth = session.depth_slot().take_if_fresh().unwrap();
        assert_eq!(depth.len(), 640 * 480);
        assert!(depth.iter().all(|&s| s == 2047));
    }

    #[test]
    fn pump_failure_maps_to_session_lost() {
        let driver = Arc::new(
            MockSensor::new()
                .with_devices(1)
                .with_error("process_events", SensorError::Driver("usb died".to_string())),
        );
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        assert!(matches!(
            session.pump_events(),
            Err(SensorError::SessionLost(_))
        ));
    }

    #[test]
    fn close_is_idempotent_and_stops_streams() {
        let driver = Arc::new(MockSensor::new().with_devices(1));
        let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
        session.configure(StreamMode::InfraredDepth).unwrap();

        session.close();
        session.close();

        assert_eq!(driver.stop_video_calls(), 1);
        assert_eq!(driver.stop_depth_calls(), 1);
        assert_eq!(driver.close_calls(), 1);
        // One shutdown for the explicit close only
        assert_eq!(driver.shutdown_calls(), 1);
    }

    #[test]
    fn drop_closes_the_session() {
        let driver = Arc::new(MockSensor::new().with_devices(1));
        {
            let mut session = SensorSession::open(Arc::clone(&driver)).unwrap();
            session.configure(StreamMode::Infrared).unwrap();
        }
        assert_eq!(driver.stop_video_calls(), 1);
        assert_eq!(driver.close_calls(), 1);
        assert_eq!(driver.shutdown_calls(), 1);
    }
}
