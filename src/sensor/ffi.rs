//! Raw libfreenect FFI declarations.
//!
//! These are only compiled when the `freenect` feature is enabled AND
//! libfreenect is available for linking. All access goes through the safe
//! `FreenectDriver` wrapper — never call these directly.

use std::os::raw::{c_int, c_void};

/// Opaque handle to a freenect context.
pub type FreenectContextRef = *mut c_void;

/// Opaque handle to an opened Kinect device.
pub type FreenectDeviceRef = *mut c_void;

/// Opaque handle to the USB context (NULL selects the library default).
pub type FreenectUsbContextRef = *mut c_void;

/// Video frame callback type.
pub type FreenectVideoCallback =
    unsafe extern "C" fn(dev: FreenectDeviceRef, video: *mut c_void, timestamp: u32);

/// Depth frame callback type.
pub type FreenectDepthCallback =
    unsafe extern "C" fn(dev: FreenectDeviceRef, depth: *mut c_void, timestamp: u32);

/// Frame mode descriptor, by value as in `libfreenect.h`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FreenectFrameMode {
    pub reserved: u32,
    pub resolution: c_int,
    /// Union of the video/depth format enums.
    pub format: i32,
    /// Total frame size in bytes.
    pub bytes: i32,
    pub width: i16,
    pub height: i16,
    pub data_bits_per_pixel: i8,
    pub padding_bits_per_pixel: i8,
    pub framerate: i8,
    /// Nonzero when the mode lookup succeeded.
    pub is_valid: i8,
}

// --- Mode constants (values from libfreenect.h) ---

/// 640x480 capture resolution.
pub const FREENECT_RESOLUTION_MEDIUM: c_int = 1;
/// 24-bit RGB video.
pub const FREENECT_VIDEO_RGB: i32 = 0;
/// 8-bit infrared video.
pub const FREENECT_VIDEO_IR_8BIT: i32 = 2;
/// 11-bit depth samples in 16-bit words.
pub const FREENECT_DEPTH_11BIT: i32 = 0;

#[link(name = "freenect")]
extern "C" {
    /// Initialise a freenect context. Negative return means no sensor stack.
    pub fn freenect_init(ctx: *mut FreenectContextRef, usb_ctx: FreenectUsbContextRef) -> c_int;

    /// Shut down a context and release all resources.
    pub fn freenect_shutdown(ctx: FreenectContextRef) -> c_int;

    /// Open the device at `index`.
    pub fn freenect_open_device(
        ctx: FreenectContextRef,
        dev: *mut FreenectDeviceRef,
        index: c_int,
    ) -> c_int;

    /// Close an opened device.
    pub fn freenect_close_device(dev: FreenectDeviceRef) -> c_int;

    /// Register the video frame callback.
    pub fn freenect_set_video_callback(dev: FreenectDeviceRef, cb: Option<FreenectVideoCallback>);

    /// Register the depth frame callback.
    pub fn freenect_set_depth_callback(dev: FreenectDeviceRef, cb: Option<FreenectDepthCallback>);

    /// Look up the video mode for a resolution/format pair.
    pub fn freenect_find_video_mode(res: c_int, fmt: i32) -> FreenectFrameMode;

    /// Look up the depth mode for a resolution/format pair.
    pub fn freenect_find_depth_mode(res: c_int, fmt: i32) -> FreenectFrameMode;

    /// Select the video capture mode.
    pub fn freenect_set_video_mode(dev: FreenectDeviceRef, mode: FreenectFrameMode) -> c_int;

    /// Select the depth capture mode.
    pub fn freenect_set_depth_mode(dev: FreenectDeviceRef, mode: FreenectFrameMode) -> c_int;

    /// Start video capture.
    pub fn freenect_start_video(dev: FreenectDeviceRef) -> c_int;

    /// Stop video capture.
    pub fn freenect_stop_video(dev: FreenectDeviceRef) -> c_int;

    /// Start depth capture.
    pub fn freenect_start_depth(dev: FreenectDeviceRef) -> c_int;

    /// Stop depth capture.
    pub fn freenect_stop_depth(dev: FreenectDeviceRef) -> c_int;

    /// Service pending USB events, invoking due callbacks synchronously.
    /// Negative return means the connection is lost.
    pub fn freenect_process_events(ctx: FreenectContextRef) -> c_int;
}
