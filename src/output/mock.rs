//! Recording sink for tests — no real device involved.

use std::sync::{Arc, Mutex};

use crate::output::error::{Result, SinkError};
use crate::output::sink::{FrameSink, PixelFormat};
use crate::sensor::types::FrameGeometry;

struct MockSinkState {
    configured: Vec<(FrameGeometry, PixelFormat)>,
    frames: Vec<Vec<u8>>,
    fail_next_writes: u32,
    fail_all_writes: bool,
    fail_configure: bool,
}

/// Records configure calls and written frames; write failures can be
/// scripted. Clones share state so a test can keep a handle for inspection
/// while the relay owns another.
#[derive(Clone)]
pub struct MockSink {
    state: Arc<Mutex<MockSinkState>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockSinkState {
                configured: Vec::new(),
                frames: Vec::new(),
                fail_next_writes: 0,
                fail_all_writes: false,
                fail_configure: false,
            })),
        }
    }

    /// Fail the next `count` writes, then succeed again.
    pub fn with_failing_writes(self, count: u32) -> Self {
        self.state.lock().unwrap().fail_next_writes = count;
        self
    }

    /// Fail every write.
    pub fn with_all_writes_failing(self) -> Self {
        self.state.lock().unwrap().fail_all_writes = true;
        self
    }

    /// Fail the configure call.
    pub fn with_failing_configure(self) -> Self {
        self.state.lock().unwrap().fail_configure = true;
        self
    }

    /// All successfully written frames, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().frames.clone()
    }

    /// All configure calls, in order.
    pub fn configured(&self) -> Vec<(FrameGeometry, PixelFormat)> {
        self.state.lock().unwrap().configured.clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for MockSink {
    fn configure(&mut self, geometry: FrameGeometry, format: PixelFormat) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_configure {
            return Err(SinkError::ConfigFailed("injected".to_string()));
        }
        state.configured.push((geometry, format));
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all_writes {
            return Err(SinkError::WriteFailed("injected".to_string()));
        }
        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(SinkError::WriteFailed("injected".to_string()));
        }
        state.frames.push(frame.to_vec());
        Ok(frame.len())
    }
}
