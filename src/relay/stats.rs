use serde::Serialize;
use std::time::Instant;

/// Collects forwarding statistics for the lifetime of the relay process.
pub struct RelayStats {
    video_frames: u64,
    depth_frames: u64,
    write_failures: u64,
    total_bytes: u64,
    start_time: Instant,
}

/// Snapshot of relay stats for periodic logging.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySnapshot {
    pub fps: f64,
    pub video_frames: u64,
    pub depth_frames: u64,
    pub write_failures: u64,
    pub bandwidth_bps: u64,
}

impl RelayStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            video_frames: 0,
            depth_frames: 0,
            write_failures: 0,
            total_bytes: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a successfully forwarded video frame.
    pub fn record_video(&mut self, bytes: usize) {
        self.video_frames += 1;
        self.total_bytes += bytes as u64;
    }

    /// Record a successfully forwarded depth frame.
    pub fn record_depth(&mut self, bytes: usize) {
        self.depth_frames += 1;
        self.total_bytes += bytes as u64;
    }

    /// Record a failed destination write.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    /// Forwarded frames per second across both streams.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        (self.video_frames + self.depth_frames) as f64 / elapsed
    }

    /// Bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn video_frames(&self) -> u64 {
        self.video_frames
    }

    pub fn depth_frames(&self) -> u64 {
        self.depth_frames
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            fps: self.fps(),
            video_frames: self.video_frames,
            depth_frames: self.depth_frames,
            write_failures: self.write_failures,
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialises_with_zero_values() {
        let stats = RelayStats::new();
        assert_eq!(stats.video_frames(), 0);
        assert_eq!(stats.depth_frames(), 0);
        assert_eq!(stats.write_failures(), 0);
    }

    #[test]
    fn record_video_increments_counters() {
        let mut stats = RelayStats::new();
        stats.record_video(640 * 480);
        stats.record_video(640 * 480);
        assert_eq!(stats.video_frames(), 2);
    }

    #[test]
    fn record_depth_is_tracked_separately() {
        let mut stats = RelayStats::new();
        stats.record_video(100);
        stats.record_depth(100);
        assert_eq!(stats.video_frames(), 1);
        assert_eq!(stats.depth_frames(), 1);
    }

    #[test]
    fn write_failures_accumulate() {
        let mut stats = RelayStats::new();
        stats.record_write_failure();
        stats.record_write_failure();
        assert_eq!(stats.write_failures(), 2);
    }

    #[test]
    fn fps_is_positive_after_frames() {
        let mut stats = RelayStats::new();
        for _ in 0..30 {
            stats.record_video(1000);
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(stats.fps() > 0.0);
    }

    #[test]
    fn snapshot_serialises_to_camel_case() {
        let mut stats = RelayStats::new();
        stats.record_video(5000);
        stats.record_write_failure();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["videoFrames"], 1);
        assert_eq!(json["writeFailures"], 1);
        assert!(json["bandwidthBps"].is_number());
    }
}
