//! `FrameSink` trait — the destination device boundary.
//!
//! The Linux v4l2loopback backend and the unsupported-platform stub both
//! implement this trait; the relay loop only ever sees `dyn FrameSink`.

use crate::output::error::Result;
use crate::sensor::types::{FrameGeometry, StreamMode, VideoSource};

/// Pixel format of the destination device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale (infrared and converted depth).
    Gray8,
    /// 24-bit RGB.
    Rgb24,
}

impl PixelFormat {
    /// The V4L2 FourCC for this format.
    pub fn fourcc(self) -> &'static [u8; 4] {
        match self {
            Self::Gray8 => b"GREY",
            Self::Rgb24 => b"RGB3",
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb24 => 3,
        }
    }

    /// Destination format for a stream mode: the video stream's format when
    /// one is enabled, grayscale for depth-only output.
    pub fn for_mode(mode: StreamMode) -> Self {
        match mode.video_source() {
            Some(VideoSource::Color) => Self::Rgb24,
            Some(VideoSource::Infrared) | None => Self::Gray8,
        }
    }
}

/// A configured destination for forwarded frames.
///
/// Opened once for the process lifetime and reused across sensor
/// reconnects — destination availability and sensor connectivity are
/// independent failure domains.
pub trait FrameSink: Send {
    /// Apply the fixed geometry and pixel format. Called once at startup.
    fn configure(&mut self, geometry: FrameGeometry, format: PixelFormat) -> Result<()>;

    /// Write one complete frame, returning the number of bytes written.
    fn write_frame(&mut self, frame: &[u8]) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_table_matches_stream_modes() {
        assert_eq!(PixelFormat::for_mode(StreamMode::Infrared), PixelFormat::Gray8);
        assert_eq!(PixelFormat::for_mode(StreamMode::InfraredDepth), PixelFormat::Gray8);
        assert_eq!(PixelFormat::for_mode(StreamMode::Color), PixelFormat::Rgb24);
        assert_eq!(PixelFormat::for_mode(StreamMode::ColorDepth), PixelFormat::Rgb24);
        assert_eq!(PixelFormat::for_mode(StreamMode::DepthOnly), PixelFormat::Gray8);
    }

    #[test]
    fn bytes_per_pixel_match_channel_counts() {
        assert_eq!(PixelFormat::Gray8.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::Rgb24.bytes_per_pixel(), 3);
    }

    #[test]
    fn fourccs_are_v4l2_codes() {
        assert_eq!(PixelFormat::Gray8.fourcc(), b"GREY");
        assert_eq!(PixelFormat::Rgb24.fourcc(), b"RGB3");
    }

    #[test]
    fn trait_object_is_send() {
        fn assert_send<T: Send + ?Sized>() {}
        assert_send::<Box<dyn FrameSink>>();
    }
}
