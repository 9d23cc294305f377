//! `SensorDriver` trait — abstracts the sensor library for testability.
//!
//! The real `FreenectDriver`, the `DummySensor`, and the `MockSensor` all
//! implement this trait, allowing `SensorSession` to be generic over the
//! driver implementation.

use crate::sensor::error::Result;
use crate::sensor::types::{DepthMode, SensorResolution, VideoMode, VideoSource};

/// Opaque device handle used across the driver boundary.
///
/// For the real driver this indexes the opened libfreenect device; for the
/// mock it is an index into the mock's internal device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorHandle(pub usize);

/// Callback invoked with a completed video frame (IR or RGB bytes).
///
/// Fires synchronously inside [`SensorDriver::process_events`] on the
/// calling thread — never from a separate capture thread.
pub type VideoFrameCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Callback invoked with a completed depth frame (raw 11-bit samples).
pub type DepthFrameCallback = Box<dyn FnMut(&[u16]) + Send>;

/// Abstraction over the sensor library.
///
/// All methods take `&self` — implementations manage interior mutability
/// (e.g. via `Mutex` for the mock's state).
pub trait SensorDriver: Send + Sync {
    /// Initialise the driver context. Must be called before `open_device`.
    fn init(&self) -> Result<()>;

    /// Shut down the driver context and release all resources.
    fn shutdown(&self);

    /// Open the sensor at the given index (0 for the first device).
    fn open_device(&self, index: u32) -> Result<SensorHandle>;

    /// Close an opened device.
    fn close_device(&self, device: SensorHandle) -> Result<()>;

    /// Register the callback receiving completed video frames.
    fn set_video_callback(&self, device: SensorHandle, callback: VideoFrameCallback) -> Result<()>;

    /// Register the callback receiving completed depth frames.
    fn set_depth_callback(&self, device: SensorHandle, callback: DepthFrameCallback) -> Result<()>;

    /// Look up the capture mode for a resolution/source pair.
    fn find_video_mode(&self, resolution: SensorResolution, source: VideoSource)
        -> Result<VideoMode>;

    /// Look up the depth capture mode for a resolution.
    fn find_depth_mode(&self, resolution: SensorResolution) -> Result<DepthMode>;

    /// Select the video capture mode on an opened device.
    fn set_video_mode(&self, device: SensorHandle, mode: VideoMode) -> Result<()>;

    /// Select the depth capture mode on an opened device.
    fn set_depth_mode(&self, device: SensorHandle, mode: DepthMode) -> Result<()>;

    /// Start video capture.
    fn start_video(&self, device: SensorHandle) -> Result<()>;

    /// Stop video capture.
    fn stop_video(&self, device: SensorHandle) -> Result<()>;

    /// Start depth capture.
    fn start_depth(&self, device: SensorHandle) -> Result<()>;

    /// Stop depth capture.
    fn stop_depth(&self, device: SensorHandle) -> Result<()>;

    /// Service one round of pending hardware events, invoking any due frame
    /// callbacks synchronously before returning.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying connection is lost; the caller
    /// treats this as `SessionLost` and tears the session down.
    fn process_events(&self, device: SensorHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_handle_equality() {
        let a = SensorHandle(0);
        let b = SensorHandle(0);
        let c = SensorHandle(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    /// Verify the trait is object-safe (can be used as `dyn SensorDriver`).
    #[test]
    fn trait_is_object_safe() {
        fn _accepts_dyn(_driver: &dyn SensorDriver) {}
    }

    /// Verify Send + Sync bounds are satisfied.
    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<Box<dyn SensorDriver>>();
    }
}
