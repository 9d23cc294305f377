//! Safe libfreenect wrapper.
//!
//! Only compiled when the `freenect` feature is enabled and libfreenect is
//! available. Production code uses this; tests use `MockSensor` instead.

use std::os::raw::c_int;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::sensor::api::{
    DepthFrameCallback, SensorDriver, SensorHandle, VideoFrameCallback,
};
use crate::sensor::error::{Result, SensorError};
use crate::sensor::ffi;
use crate::sensor::types::{DepthMode, FrameGeometry, SensorResolution, VideoMode, VideoSource};

/// Whether a context is live (global, one sensor per process).
static SENSOR_INITIALISED: AtomicBool = AtomicBool::new(false);

struct RawHandles {
    ctx: ffi::FreenectContextRef,
    dev: ffi::FreenectDeviceRef,
}

// The context and device pointers are only touched from the relay thread;
// the Mutex enforces exclusive access for the trait's &self methods.
unsafe impl Send for RawHandles {}

/// Registered frame callbacks and their expected payload sizes.
///
/// libfreenect callbacks carry no user-data pointer on the API surface used
/// here, so the trampolines read this process-wide registry. A single
/// sensor per process is a stated non-goal boundary.
struct CallbackRegistry {
    video: Option<VideoFrameCallback>,
    depth: Option<DepthFrameCallback>,
    video_frame_len: usize,
    depth_sample_count: usize,
}

static CALLBACKS: Mutex<CallbackRegistry> = Mutex::new(CallbackRegistry {
    video: None,
    depth: None,
    video_frame_len: 0,
    depth_sample_count: 0,
});

unsafe extern "C" fn video_trampoline(
    _dev: ffi::FreenectDeviceRef,
    video: *mut std::os::raw::c_void,
    _timestamp: u32,
) {
    let Ok(mut registry) = CALLBACKS.lock() else {
        return;
    };
    let len = registry.video_frame_len;
    if len == 0 || video.is_null() {
        return;
    }
    let frame = std::slice::from_raw_parts(video as *const u8, len);
    if let Some(callback) = registry.video.as_mut() {
        callback(frame);
    }
}

unsafe extern "C" fn depth_trampoline(
    _dev: ffi::FreenectDeviceRef,
    depth: *mut std::os::raw::c_void,
    _timestamp: u32,
) {
    let Ok(mut registry) = CALLBACKS.lock() else {
        return;
    };
    let count = registry.depth_sample_count;
    if count == 0 || depth.is_null() {
        return;
    }
    let samples = std::slice::from_raw_parts(depth as *const u16, count);
    if let Some(callback) = registry.depth.as_mut() {
        callback(samples);
    }
}

fn resolution_constant(resolution: SensorResolution) -> c_int {
    match resolution {
        SensorResolution::Medium => ffi::FREENECT_RESOLUTION_MEDIUM,
    }
}

fn video_format_constant(source: VideoSource) -> i32 {
    match source {
        VideoSource::Infrared => ffi::FREENECT_VIDEO_IR_8BIT,
        VideoSource::Color => ffi::FREENECT_VIDEO_RGB,
    }
}

/// Driver for a physical Kinect via libfreenect.
///
/// Creates a fresh context per `init`/`shutdown` cycle so the supervisor
/// can fully re-establish the USB stack on every reconnect.
pub struct FreenectDriver {
    handles: Mutex<RawHandles>,
}

impl FreenectDriver {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(RawHandles {
                ctx: ptr::null_mut(),
                dev: ptr::null_mut(),
            }),
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, RawHandles> {
        // Poisoning cannot leave the pointers invalid, only torn state from
        // a panicking callback; recover the guard either way.
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for FreenectDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for FreenectDriver {
    fn init(&self) -> Result<()> {
        if SENSOR_INITIALISED.swap(true, Ordering::SeqCst) {
            return Err(SensorError::Driver(
                "freenect context already initialised".to_string(),
            ));
        }
        let mut handles = self.lock_handles();
        let mut ctx: ffi::FreenectContextRef = ptr::null_mut();
        let ret = unsafe { ffi::freenect_init(&mut ctx, ptr::null_mut()) };
        if ret < 0 {
            SENSOR_INITIALISED.store(false, Ordering::SeqCst);
            return Err(SensorError::DeviceNotFound);
        }
        handles.ctx = ctx;
        Ok(())
    }

    fn shutdown(&self) {
        let mut handles = self.lock_handles();
        if !handles.ctx.is_null() {
            unsafe {
                ffi::freenect_shutdown(handles.ctx);
            }
            handles.ctx = ptr::null_mut();
        }
        handles.dev = ptr::null_mut();
        if let Ok(mut registry) = CALLBACKS.lock() {
            registry.video = None;
            registry.depth = None;
            registry.video_frame_len = 0;
            registry.depth_sample_count = 0;
        }
        SENSOR_INITIALISED.store(false, Ordering::SeqCst);
    }

    fn open_device(&self, index: u32) -> Result<SensorHandle> {
        let mut handles = self.lock_handles();
        if handles.ctx.is_null() {
            return Err(SensorError::Driver("context not initialised".to_string()));
        }
        let mut dev: ffi::FreenectDeviceRef = ptr::null_mut();
        let ret = unsafe { ffi::freenect_open_device(handles.ctx, &mut dev, index as c_int) };
        if ret < 0 {
            return Err(SensorError::DeviceOpenFailed(format!(
                "freenect_open_device returned {ret}"
            )));
        }
        handles.dev = dev;
        Ok(SensorHandle(index as usize))
    }

    fn close_device(&self, _device: SensorHandle) -> Result<()> {
        let mut handles = self.lock_handles();
        if !handles.dev.is_null() {
            unsafe {
                ffi::freenect_close_device(handles.dev);
            }
            handles.dev = ptr::null_mut();
        }
        Ok(())
    }

    fn set_video_callback(&self, _device: SensorHandle, callback: VideoFrameCallback) -> Result<()> {
        let handles = self.lock_handles();
        if let Ok(mut registry) = CALLBACKS.lock() {
            registry.video = Some(callback);
        }
        unsafe {
            ffi::freenect_set_video_callback(handles.dev, Some(video_trampoline));
        }
        Ok(())
    }

    fn set_depth_callback(&self, _device: SensorHandle, callback: DepthFrameCallback) -> Result<()> {
        let handles = self.lock_handles();
        if let Ok(mut registry) = CALLBACKS.lock() {
            registry.depth = Some(callback);
        }
        unsafe {
            ffi::freenect_set_depth_callback(handles.dev, Some(depth_trampoline));
        }
        Ok(())
    }

    fn find_video_mode(
        &self,
        resolution: SensorResolution,
        source: VideoSource,
    ) -> Result<VideoMode> {
        let raw = unsafe {
            ffi::freenect_find_video_mode(
                resolution_constant(resolution),
                video_format_constant(source),
            )
        };
        if raw.is_valid == 0 {
            return Err(SensorError::ModeUnsupported(format!(
                "no video mode for {source:?} at {}",
                resolution.geometry()
            )));
        }
        Ok(VideoMode {
            source,
            geometry: FrameGeometry {
                width: raw.width as u32,
                height: raw.height as u32,
            },
            frame_len: raw.bytes as usize,
        })
    }

    fn find_depth_mode(&self, resolution: SensorResolution) -> Result<DepthMode> {
        let raw = unsafe {
            ffi::freenect_find_depth_mode(resolution_constant(resolution), ffi::FREENECT_DEPTH_11BIT)
        };
        if raw.is_valid == 0 {
            return Err(SensorError::ModeUnsupported(format!(
                "no 11-bit depth mode at {}",
                resolution.geometry()
            )));
        }
        let geometry = FrameGeometry {
            width: raw.width as u32,
            height: raw.height as u32,
        };
        Ok(DepthMode {
            geometry,
            sample_count: geometry.pixel_count(),
        })
    }

    fn set_video_mode(&self, _device: SensorHandle, mode: VideoMode) -> Result<()> {
        let handles = self.lock_handles();
        let raw = unsafe {
            ffi::freenect_find_video_mode(
                resolution_constant(SensorResolution::Medium),
                video_format_constant(mode.source),
            )
        };
        let ret = unsafe { ffi::freenect_set_video_mode(handles.dev, raw) };
        if ret < 0 {
            return Err(SensorError::ModeUnsupported(format!(
                "freenect_set_video_mode returned {ret}"
            )));
        }
        if let Ok(mut registry) = CALLBACKS.lock() {
            registry.video_frame_len = mode.frame_len;
        }
        Ok(())
    }

    fn set_depth_mode(&self, _device: SensorHandle, mode: DepthMode) -> Result<()> {
        let handles = self.lock_handles();
        let raw = unsafe {
            ffi::freenect_find_depth_mode(
                resolution_constant(SensorResolution::Medium),
                ffi::FREENECT_DEPTH_11BIT,
            )
        };
        let ret = unsafe { ffi::freenect_set_depth_mode(handles.dev, raw) };
        if ret < 0 {
            return Err(SensorError::ModeUnsupported(format!(
                "freenect_set_depth_mode returned {ret}"
            )));
        }
        if let Ok(mut registry) = CALLBACKS.lock() {
            registry.depth_sample_count = mode.sample_count;
        }
        Ok(())
    }

    fn start_video(&self, _device: SensorHandle) -> Result<()> {
        let handles = self.lock_handles();
        let ret = unsafe { ffi::freenect_start_video(handles.dev) };
        if ret < 0 {
            return Err(SensorError::StreamStartFailed(format!(
                "freenect_start_video returned {ret}"
            )));
        }
        Ok(())
    }

    fn stop_video(&self, _device: SensorHandle) -> Result<()> {
        let handles = self.lock_handles();
        let ret = unsafe { ffi::freenect_stop_video(handles.dev) };
        if ret < 0 {
            return Err(SensorError::Driver(format!(
                "freenect_stop_video returned {ret}"
            )));
        }
        Ok(())
    }

    fn start_depth(&self, _device: SensorHandle) -> Result<()> {
        let handles = self.lock_handles();
        let ret = unsafe { ffi::freenect_start_depth(handles.dev) };
        if ret < 0 {
            return Err(SensorError::StreamStartFailed(format!(
                "freenect_start_depth returned {ret}"
            )));
        }
        Ok(())
    }

    fn stop_depth(&self, _device: SensorHandle) -> Result<()> {
        let handles = self.lock_handles();
        let ret = unsafe { ffi::freenect_stop_depth(handles.dev) };
        if ret < 0 {
            return Err(SensorError::Driver(format!(
                "freenect_stop_depth returned {ret}"
            )));
        }
        Ok(())
    }

    fn process_events(&self, _device: SensorHandle) -> Result<()> {
        let handles = self.lock_handles();
        let ret = unsafe { ffi::freenect_process_events(handles.ctx) };
        if ret < 0 {
            return Err(SensorError::SessionLost(format!(
                "freenect_process_events returned {ret}"
            )));
        }
        Ok(())
    }
}
