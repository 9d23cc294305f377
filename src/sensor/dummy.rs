//! Simulated sensor for running the full relay without hardware.
//!
//! Enable via the `DUMMY_SENSOR=1` environment variable. Produces a moving
//! gradient for the video stream and a repeating ramp over the 11-bit range
//! for the depth stream.

use std::sync::Mutex;

use crate::sensor::api::{
    DepthFrameCallback, SensorDriver, SensorHandle, VideoFrameCallback,
};
use crate::sensor::error::{Result, SensorError};
use crate::sensor::types::{DepthMode, SensorResolution, VideoMode, VideoSource};

struct DummyState {
    opened: bool,
    video_callback: Option<VideoFrameCallback>,
    depth_callback: Option<DepthFrameCallback>,
    video_mode: Option<VideoMode>,
    depth_mode: Option<DepthMode>,
    video_started: bool,
    depth_started: bool,
    tick: u64,
}

/// A fake sensor that synthesises frames on every event pump.
pub struct DummySensor {
    state: Mutex<DummyState>,
}

impl DummySensor {
    /// Whether the simulated sensor was requested via `DUMMY_SENSOR=1`.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_SENSOR").map(|v| v == "1").unwrap_or(false)
    }

    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState {
                opened: false,
                video_callback: None,
                depth_callback: None,
                video_mode: None,
                depth_mode: None,
                video_started: false,
                depth_started: false,
                tick: 0,
            }),
        }
    }
}

impl Default for DummySensor {
    fn default() -> Self {
        Self::new()
    }
}

/// Horizontal gradient that scrolls with the frame counter.
fn synth_video_frame(mode: VideoMode, tick: u64) -> Vec<u8> {
    (0..mode.frame_len)
        .map(|i| ((i as u64 + tick * 7) % 256) as u8)
        .collect()
}

/// Repeating ramp across the 11-bit depth range, shifted per frame.
fn synth_depth_frame(mode: DepthMode, tick: u64) -> Vec<u16> {
    (0..mode.sample_count)
        .map(|i| ((i as u64 + tick * 16) % 2048) as u16)
        .collect()
}

impl SensorDriver for DummySensor {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.opened = false;
        state.video_callback = None;
        state.depth_callback = None;
        state.video_started = false;
        state.depth_started = false;
    }

    fn open_device(&self, index: u32) -> Result<SensorHandle> {
        let mut state = self.state.lock().unwrap();
        state.opened = true;
        Ok(SensorHandle(index as usize))
    }

    fn close_device(&self, _device: SensorHandle) -> Result<()> {
        self.state.lock().unwrap().opened = false;
        Ok(())
    }

    fn set_video_callback(&self, _device: SensorHandle, callback: VideoFrameCallback) -> Result<()> {
        self.state.lock().unwrap().video_callback = Some(callback);
        Ok(())
    }

    fn set_depth_callback(&self, _device: SensorHandle, callback: DepthFrameCallback) -> Result<()> {
        self.state.lock().unwrap().depth_callback = Some(callback);
        Ok(())
    }

    fn find_video_mode(
        &self,
        resolution: SensorResolution,
        source: VideoSource,
    ) -> Result<VideoMode> {
        let geometry = resolution.geometry();
        Ok(VideoMode {
            source,
            geometry,
            frame_len: geometry.pixel_count() * source.channels(),
        })
    }

    fn find_depth_mode(&self, resolution: SensorResolution) -> Result<DepthMode> {
        let geometry = resolution.geometry();
        Ok(DepthMode {
            geometry,
            sample_count: geometry.pixel_count(),
        })
    }

    fn set_video_mode(&self, _device: SensorHandle, mode: VideoMode) -> Result<()> {
        self.state.lock().unwrap().video_mode = Some(mode);
        Ok(())
    }

    fn set_depth_mode(&self, _device: SensorHandle, mode: DepthMode) -> Result<()> {
        self.state.lock().unwrap().depth_mode = Some(mode);
        Ok(())
    }

    fn start_video(&self, _device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.video_mode.is_none() {
            return Err(SensorError::StreamStartFailed(
                "video mode not set".to_string(),
            ));
        }
        state.video_started = true;
        Ok(())
    }

    fn stop_video(&self, _device: SensorHandle) -> Result<()> {
        self.state.lock().unwrap().video_started = false;
        Ok(())
    }

    fn start_depth(&self, _device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.depth_mode.is_none() {
            return Err(SensorError::StreamStartFailed(
                "depth mode not set".to_string(),
            ));
        }
        state.depth_started = true;
        Ok(())
    }

    fn stop_depth(&self, _device: SensorHandle) -> Result<()> {
        self.state.lock().unwrap().depth_started = false;
        Ok(())
    }

    fn process_events(&self, _device: SensorHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.opened {
            return Err(SensorError::SessionLost("dummy sensor closed".to_string()));
        }
        state.tick += 1;
        let tick = state.tick;

        if state.video_started {
            if let Some(mode) = state.video_mode {
                let frame = synth_video_frame(mode, tick);
                if let Some(callback) = state.video_callback.as_mut() {
                    callback(&frame);
                }
            }
        }
        if state.depth_started {
            if let Some(mode) = state.depth_mode {
                let frame = synth_depth_frame(mode, tick);
                if let Some(callback) = state.depth_callback.as_mut() {
                    callback(&frame);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn synth_depth_stays_in_sensor_range() {
        let mode = DepthMode {
            geometry: SensorResolution::Medium.geometry(),
            sample_count: 4096,
        };
        let frame = synth_depth_frame(mode, 99);
        assert_eq!(frame.len(), 4096);
        assert!(frame.iter().all(|&s| s <= 2047));
    }

    #[test]
    fn synth_video_varies_with_tick() {
        let mode = VideoMode {
            source: VideoSource::Infrared,
            geometry: SensorResolution::Medium.geometry(),
            frame_len: 64,
        };
        assert_ne!(synth_video_frame(mode, 1), synth_video_frame(mode, 2));
    }

    #[test]
    fn pump_delivers_synthesised_frames() {
        let dummy = DummySensor::new();
        let handle = dummy.open_device(0).unwrap();

        let frames = Arc::new(AtomicUsize::new(0));
        let frames_clone = Arc::clone(&frames);
        dummy
            .set_video_callback(
                handle,
                Box::new(move |frame| {
                    assert_eq!(frame.len(), 640 * 480);
                    frames_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let mode = dummy
            .find_video_mode(SensorResolution::Medium, VideoSource::Infrared)
            .unwrap();
        dummy.set_video_mode(handle, mode).unwrap();
        dummy.start_video(handle).unwrap();

        dummy.process_events(handle).unwrap();
        dummy.process_events(handle).unwrap();
        assert_eq!(frames.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn start_without_mode_fails() {
        let dummy = DummySensor::new();
        let handle = dummy.open_device(0).unwrap();
        assert!(matches!(
            dummy.start_video(handle),
            Err(SensorError::StreamStartFailed(_))
        ));
    }

    #[test]
    fn pump_after_close_reports_session_lost() {
        let dummy = DummySensor::new();
        let handle = dummy.open_device(0).unwrap();
        dummy.close_device(handle).unwrap();
        assert!(matches!(
            dummy.process_events(handle),
            Err(SensorError::SessionLost(_))
        ));
    }
}
