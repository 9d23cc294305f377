//! Stream modes, capture formats, and frame geometry.

use std::fmt;

use thiserror::Error;

/// Fixed capture geometry — the sensor's medium resolution.
pub const FRAME_WIDTH: u32 = 640;
/// Fixed capture geometry — the sensor's medium resolution.
pub const FRAME_HEIGHT: u32 = 480;

/// Upper bound of the sensor's 11-bit depth range.
pub const DEPTH_SAMPLE_MAX: u16 = 2047;

/// Width × height of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    /// The only geometry this relay captures and forwards.
    pub const VGA: Self = Self {
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
    };

    /// Number of pixels (= depth samples) per frame.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which video stream is active — infrared and color are mutually exclusive
/// on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    /// 8-bit grayscale infrared.
    Infrared,
    /// 24-bit RGB.
    Color,
}

impl VideoSource {
    /// Bytes per pixel delivered by the sensor for this source.
    pub fn channels(self) -> usize {
        match self {
            Self::Infrared => 1,
            Self::Color => 3,
        }
    }
}

/// Sensor resolution selector. Only the medium (VGA) resolution is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorResolution {
    Medium,
}

impl SensorResolution {
    pub fn geometry(self) -> FrameGeometry {
        match self {
            Self::Medium => FrameGeometry::VGA,
        }
    }
}

/// A negotiated video capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub source: VideoSource,
    pub geometry: FrameGeometry,
    /// Expected payload length in bytes for one frame.
    pub frame_len: usize,
}

/// A negotiated depth capture mode (11-bit samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthMode {
    pub geometry: FrameGeometry,
    /// Expected number of 16-bit samples for one frame.
    pub sample_count: usize,
}

/// Rejected stream-flag combinations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("cannot enable both infrared and color streaming at the same time")]
    ConflictingVideoSources,
    #[error("no streaming mode enabled; use --ir, --rgb and/or --depth")]
    NoStreamSelected,
}

/// The combination of enabled capture streams.
///
/// Infrared and color are mutually exclusive; depth can be toggled
/// independently. The enabled streams determine the destination pixel
/// format and channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Infrared,
    Color,
    DepthOnly,
    InfraredDepth,
    ColorDepth,
}

impl StreamMode {
    /// Build a stream mode from the CLI flags.
    ///
    /// # Errors
    ///
    /// Returns `ModeError::ConflictingVideoSources` when both `ir` and `rgb`
    /// are set, and `ModeError::NoStreamSelected` when nothing is enabled.
    pub fn from_flags(ir: bool, rgb: bool, depth: bool) -> Result<Self, ModeError> {
        match (ir, rgb, depth) {
            (true, true, _) => Err(ModeError::ConflictingVideoSources),
            (true, false, false) => Ok(Self::Infrared),
            (false, true, false) => Ok(Self::Color),
            (true, false, true) => Ok(Self::InfraredDepth),
            (false, true, true) => Ok(Self::ColorDepth),
            (false, false, true) => Ok(Self::DepthOnly),
            (false, false, false) => Err(ModeError::NoStreamSelected),
        }
    }

    /// The active video stream, if any.
    pub fn video_source(self) -> Option<VideoSource> {
        match self {
            Self::Infrared | Self::InfraredDepth => Some(VideoSource::Infrared),
            Self::Color | Self::ColorDepth => Some(VideoSource::Color),
            Self::DepthOnly => None,
        }
    }

    /// Whether depth streaming is enabled.
    pub fn depth_enabled(self) -> bool {
        matches!(self, Self::DepthOnly | Self::InfraredDepth | Self::ColorDepth)
    }

    /// Channel count of the video stream (0 when depth-only).
    pub fn video_channels(self) -> usize {
        self.video_source().map_or(0, VideoSource::channels)
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Infrared => "infrared",
            Self::Color => "color",
            Self::DepthOnly => "depth",
            Self::InfraredDepth => "infrared+depth",
            Self::ColorDepth => "color+depth",
        };
        f.write_str(name)
    }
}
