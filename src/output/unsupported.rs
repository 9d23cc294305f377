//! Always-failing destination stub.
//!
//! Used on platforms without a virtual camera backend and as the
//! placeholder when the loopback device cannot be opened — the relay keeps
//! running and every forward attempt fails individually.

use crate::output::error::{Result, SinkError};
use crate::output::sink::{FrameSink, PixelFormat};
use crate::sensor::types::FrameGeometry;

/// A sink whose configure and write operations always fail.
pub struct UnsupportedSink {
    reason: String,
}

impl UnsupportedSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl FrameSink for UnsupportedSink {
    fn configure(&mut self, _geometry: FrameGeometry, _format: PixelFormat) -> Result<()> {
        Err(SinkError::Unavailable(self.reason.clone()))
    }

    fn write_frame(&mut self, _frame: &[u8]) -> Result<usize> {
        Err(SinkError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_always_fails() {
        let mut sink = UnsupportedSink::new("no backend");
        assert!(sink
            .configure(FrameGeometry::VGA, PixelFormat::Gray8)
            .is_err());
    }

    #[test]
    fn write_always_fails_with_the_reason() {
        let mut sink = UnsupportedSink::new("no backend");
        match sink.write_frame(&[0u8; 16]) {
            Err(SinkError::Unavailable(reason)) => assert_eq!(reason, "no backend"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
