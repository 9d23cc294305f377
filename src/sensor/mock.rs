//! Mock sensor driver for testing without real hardware.
//!
//! Uses a builder pattern to configure devices, frame payloads, simulated
//! disconnects, and error injection.

use std::sync::Mutex;

use crate::sensor::api::{
    DepthFrameCallback, SensorDriver, SensorHandle, VideoFrameCallback,
};
use crate::sensor::error::{Result, SensorError};
use crate::sensor::types::{DepthMode, SensorResolution, VideoMode, VideoSource};

/// Configurable error injection for a specific operation.
#[derive(Debug)]
struct ErrorInjection {
    operation: &'static str,
    error: SensorError,
}

/// Call counters, exposed so tests can assert lifecycle ordering.
#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    init: u32,
    shutdown: u32,
    open: u32,
    close: u32,
    start_video: u32,
    stop_video: u32,
    start_depth: u32,
    stop_depth: u32,
    pump: u32,
}

struct MockState {
    devices: usize,
    video_callback: Option<VideoFrameCallback>,
    depth_callback: Option<DepthFrameCallback>,
    video_started: bool,
    depth_started: bool,
    video_frame: Option<Vec<u8>>,
    depth_frame: Option<Vec<u16>>,
    session_loss_after: Option<u32>,
    pump_successes: u32,
    error_injections: Vec<ErrorInjection>,
    counters: Counters,
}

/// Mock sensor driver.
///
/// All state is behind a `Mutex` so the mock satisfies `Send + Sync`.
pub struct MockSensor {
    state: Mutex<MockState>,
}

impl MockSensor {
    /// Create a new empty mock (no devices attached).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                devices: 0,
                video_callback: None,
                depth_callback: None,
                video_started: false,
                depth_started: false,
                video_frame: None,
                depth_frame: None,
                session_loss_after: None,
                pump_successes: 0,
                error_injections: Vec::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Attach N simulated sensors.
    pub fn with_devices(self, count: usize) -> Self {
        self.state.lock().unwrap().devices = count;
        self
    }

    /// Set the video payload delivered on every event pump while the video
    /// stream is started.
    pub fn with_video_frame(self, frame: Vec<u8>) -> Self {
        self.state.lock().unwrap().video_frame = Some(frame);
        self
    }

    /// Set the depth payload delivered on every event pump while the depth
    /// stream is started.
    pub fn with_depth_frame(self, samples: Vec<u16>) -> Self {
        self.state.lock().unwrap().depth_frame = Some(samples);
        self
    }

    /// Simulate a disconnect: the first `pumps` calls to `process_events`
    /// succeed, the next one fails with `SessionLost`.
    pub fn with_session_loss_after(self, pumps: u32) -> Self {
        self.state.lock().unwrap().session_loss_after = Some(pumps);
        self
    }

    /// Inject an error for a specific operation name, consumed on first use.
    ///
    /// Operation names: `"init"`, `"open_device"`, `"close_device"`,
    /// `"set_video_callback"`, `"set_depth_callback"`, `"find_video_mode"`,
    /// `"find_depth_mode"`, `"set_video_mode"`, `"set_depth_mode"`,
    /// `"start_video"`, `"stop_video"`, `"start_depth"`, `"stop_depth"`,
    /// `"process_events"`.
    pub fn with_error(self, operation: &'static str, error: SensorError) -> Self {
        self.state
            .lock()
            .unwrap()
            .error_injections
            .push(ErrorInjection { operation, error });
        self
    }

    pub fn init_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.init
    }

    pub fn shutdown_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.shutdown
    }

    pub fn open_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.open
    }

    pub fn close_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.close
    }

    pub fn start_video_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.start_video
    }

    pub fn stop_video_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.stop_video
    }

    pub fn start_depth_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.start_depth
    }

    pub fn stop_depth_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.stop_depth
    }

    pub fn pump_calls(&self) -> u32 {
        self.state.lock().unwrap().counters.pump
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Check for injected errors for the given operation.
    fn check_error(&mut self, operation: &str) -> Result<()> {
        if let Some(pos) = self
            .error_injections
            .iter()
            .position(|e| e.operation == operation)
        {
            let injection = self.error_injections.remove(pos);
            return Err(injection.error);
        }
        Ok(())
    }

    fn require_device(&self, handle: SensorHandle) -> Result<()> {
        if handle.0 < self.devices {
            Ok(())
        } else {
            Err(SensorError::Driver(format!(
                "mock device {} does not exist",
                handle.0
            )))
        }
    }
}

impl SensorDriver for MockSensor {
    fn init(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.init += 1;
        state.check_error("init")
    }

    fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.counters.shutdown += 1;
        state.video_callback = None;
        state.depth_callback = None;
        state.video_started = false;
        state.depth_started = false;
    }

    fn open_device(&self, index: u32) -> Result<SensorHandle> {
        let mut state = self.state.lock().unwrap();
        state.counters.open += 1;
        state.check_error("open_device")?;
        if (index as usize) < state.devices {
            Ok(SensorHandle(index as usize))
        } else {
            Err(SensorError::DeviceNotFound)
        }
    }

    fn close_device(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.close += 1;
        state.check_error("close_device")?;
        state.require_device(device)
    }

    fn set_video_callback(&self, device: SensorHandle, callback: VideoFrameCallback) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_error("set_video_callback")?;
        state.require_device(device)?;
        state.video_callback = Some(callback);
        Ok(())
    }

    fn set_depth_callback(&self, device: SensorHandle, callback: DepthFrameCallback) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_error("set_depth_callback")?;
        state.require_device(device)?;
        state.depth_callback = Some(callback);
        Ok(())
    }

    fn find_video_mode(
        &self,
        resolution: SensorResolution,
        source: VideoSource,
    ) -> Result<VideoMode> {
        let mut state = self.state.lock().unwrap();
        state.check_error("find_video_mode")?;
        let geometry = resolution.geometry();
        Ok(VideoMode {
            source,
            geometry,
            frame_len: geometry.pixel_count() * source.channels(),
        })
    }

    fn find_depth_mode(&self, resolution: SensorResolution) -> Result<DepthMode> {
        let mut state = self.state.lock().unwrap();
        state.check_error("find_depth_mode")?;
        let geometry = resolution.geometry();
        Ok(DepthMode {
            geometry,
            sample_count: geometry.pixel_count(),
        })
    }

    fn set_video_mode(&self, device: SensorHandle, _mode: VideoMode) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_error("set_video_mode")?;
        state.require_device(device)
    }

    fn set_depth_mode(&self, device: SensorHandle, _mode: DepthMode) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_error("set_depth_mode")?;
        state.require_device(device)
    }

    fn start_video(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.start_video += 1;
        state.check_error("start_video")?;
        state.require_device(device)?;
        state.video_started = true;
        Ok(())
    }

    fn stop_video(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.stop_video += 1;
        state.check_error("stop_video")?;
        state.require_device(device)?;
        state.video_started = false;
        Ok(())
    }

    fn start_depth(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.start_depth += 1;
        state.check_error("start_depth")?;
        state.require_device(device)?;
        state.depth_started = true;
        Ok(())
    }

    fn stop_depth(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.stop_depth += 1;
        state.check_error("stop_depth")?;
        state.require_device(device)?;
        state.depth_started = false;
        Ok(())
    }

    fn process_events(&self, device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counters.pump += 1;
        state.check_error("process_events")?;
        state.require_device(device)?;

        if let Some(limit) = state.session_loss_after {
            if state.pump_successes >= limit {
                return Err(SensorError::SessionLost(
                    "simulated sensor disconnect".to_string(),
                ));
            }
        }
        state.pump_successes += 1;

        // Deliver frames synchronously, as the real library does from
        // within its event pump.
        let video_frame = state.video_frame.clone();
        if state.video_started {
            if let (Some(callback), Some(frame)) =
                (state.video_callback.as_mut(), video_frame.as_ref())
            {
                callback(frame);
            }
        }
        let depth_frame = state.depth_frame.clone();
        if state.depth_started {
            if let (Some(callback), Some(frame)) =
                (state.depth_callback.as_mut(), depth_frame.as_ref())
            {
                callback(frame);
            }
        }
        Ok(())
    }
}
