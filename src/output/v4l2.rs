//! v4l2loopback destination backend.
//!
//! Opens the loopback node once, negotiates the output format, and feeds
//! frames through write-mode I/O on the device fd.

use tracing::info;
use v4l::video::Output;
use v4l::{Device, FourCC};

use crate::output::error::{Result, SinkError};
use crate::output::sink::{FrameSink, PixelFormat};
use crate::sensor::types::FrameGeometry;

/// An open v4l2loopback output device.
pub struct V4l2Loopback {
    device: Device,
    path: String,
}

impl V4l2Loopback {
    /// Open the loopback device at `path`.
    ///
    /// # Errors
    ///
    /// `OpenFailed` when the node does not exist or is not accessible —
    /// typically the v4l2loopback module is not loaded.
    pub fn open(path: &str) -> Result<Self> {
        let device = Device::with_path(path).map_err(|source| SinkError::OpenFailed {
            path: path.to_string(),
            source,
        })?;
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }
}

impl FrameSink for V4l2Loopback {
    fn configure(&mut self, geometry: FrameGeometry, format: PixelFormat) -> Result<()> {
        let fourcc = FourCC::new(format.fourcc());
        let mut fmt = Output::format(&self.device)
            .map_err(|err| SinkError::ConfigFailed(err.to_string()))?;
        fmt.width = geometry.width;
        fmt.height = geometry.height;
        fmt.fourcc = fourcc;

        let applied = Output::set_format(&self.device, &fmt)
            .map_err(|err| SinkError::ConfigFailed(err.to_string()))?;
        if applied.width != geometry.width
            || applied.height != geometry.height
            || applied.fourcc != fourcc
        {
            return Err(SinkError::ConfigFailed(format!(
                "device negotiated {}x{} {} instead of {} {}",
                applied.width, applied.height, applied.fourcc, geometry, fourcc
            )));
        }

        info!(
            "loopback device {} configured: {} {}",
            self.path, geometry, fourcc
        );
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<usize> {
        let fd = self.device.handle().fd();
        let written =
            unsafe { libc::write(fd, frame.as_ptr().cast(), frame.len()) };
        if written < 0 {
            return Err(SinkError::WriteFailed(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        let written = written as usize;
        if written != frame.len() {
            return Err(SinkError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        Ok(written)
    }
}
