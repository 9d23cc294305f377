//! kinect-relay — forwards Kinect video and depth frames to a v4l2loopback
//! virtual camera, reconnecting automatically when the sensor drops.

pub mod config;
pub mod output;
pub mod relay;
pub mod sensor;

use std::sync::Arc;

use output::sink::FrameSink;
use output::unsupported::UnsupportedSink;
use sensor::api::SensorDriver;
use sensor::dummy::DummySensor;

#[cfg(not(feature = "freenect"))]
use sensor::api::{DepthFrameCallback, SensorHandle, VideoFrameCallback};
#[cfg(not(feature = "freenect"))]
use sensor::error::{Result as SensorResult, SensorError};
#[cfg(not(feature = "freenect"))]
use sensor::types::{DepthMode, SensorResolution, VideoMode, VideoSource};

/// Create the sensor driver for this build.
///
/// When `DUMMY_SENSOR=1` is set, a simulated sensor is used instead of
/// real hardware.
pub fn create_sensor_driver() -> Arc<dyn SensorDriver> {
    if DummySensor::is_enabled() {
        tracing::info!("DUMMY_SENSOR=1 — using the simulated sensor");
        return Arc::new(DummySensor::new());
    }

    #[cfg(feature = "freenect")]
    {
        Arc::new(sensor::freenect::FreenectDriver::new())
    }

    #[cfg(not(feature = "freenect"))]
    {
        tracing::warn!(
            "built without the `freenect` feature and DUMMY_SENSOR is unset; \
             no sensor will ever be found"
        );
        Arc::new(NullDriver)
    }
}

/// Open the destination sink for the current platform.
///
/// Failures are deliberately non-fatal: the relay keeps running with a
/// sink whose writes fail individually, matching the best-effort policy
/// for destination availability.
pub fn open_sink(path: &str) -> Box<dyn FrameSink> {
    #[cfg(target_os = "linux")]
    {
        match output::v4l2::V4l2Loopback::open(path) {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                tracing::error!(
                    "could not open loopback device {path}: {err}; ensure the \
                     v4l2loopback device exists — frames will be dropped"
                );
                Box::new(UnsupportedSink::new(format!(
                    "loopback device {path} unavailable"
                )))
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = path;
        tracing::warn!("virtual camera output is not implemented on this platform");
        Box::new(UnsupportedSink::new(
            "virtual camera output is not implemented on this platform",
        ))
    }
}

/// No-op driver used when no sensor backend is built in.
#[cfg(not(feature = "freenect"))]
struct NullDriver;

#[cfg(not(feature = "freenect"))]
impl SensorDriver for NullDriver {
    fn init(&self) -> SensorResult<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn open_device(&self, _index: u32) -> SensorResult<SensorHandle> {
        Err(SensorError::DeviceNotFound)
    }

    fn close_device(&self, _device: SensorHandle) -> SensorResult<()> {
        Ok(())
    }

    fn set_video_callback(
        &self,
        _device: SensorHandle,
        _callback: VideoFrameCallback,
    ) -> SensorResult<()> {
        Ok(())
    }

    fn set_depth_callback(
        &self,
        _device: SensorHandle,
        _callback: DepthFrameCallback,
    ) -> SensorResult<()> {
        Ok(())
    }

    fn find_video_mode(
        &self,
        _resolution: SensorResolution,
        _source: VideoSource,
    ) -> SensorResult<VideoMode> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn find_depth_mode(&self, _resolution: SensorResolution) -> SensorResult<DepthMode> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn set_video_mode(&self, _device: SensorHandle, _mode: VideoMode) -> SensorResult<()> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn set_depth_mode(&self, _device: SensorHandle, _mode: DepthMode) -> SensorResult<()> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn start_video(&self, _device: SensorHandle) -> SensorResult<()> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn stop_video(&self, _device: SensorHandle) -> SensorResult<()> {
        Ok(())
    }

    fn start_depth(&self, _device: SensorHandle) -> SensorResult<()> {
        Err(SensorError::Driver("no sensor driver available".to_string()))
    }

    fn stop_depth(&self, _device: SensorHandle) -> SensorResult<()> {
        Ok(())
    }

    fn process_events(&self, _device: SensorHandle) -> SensorResult<()> {
        Err(SensorError::SessionLost("no sensor driver".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "freenect"))]
    #[test]
    fn null_driver_never_finds_a_device() {
        let driver = NullDriver;
        driver.init().unwrap();
        assert!(matches!(
            driver.open_device(0),
            Err(SensorError::DeviceNotFound)
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn open_sink_on_missing_node_degrades_to_failing_sink() {
        let mut sink = open_sink("/dev/video-does-not-exist");
        assert!(sink.write_frame(&[0u8; 4]).is_err());
    }
}
