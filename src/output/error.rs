use thiserror::Error;

/// Destination device errors.
///
/// Write failures are non-fatal by policy: the relay loop logs and skips
/// the frame, because the sensor connection stays valid even when the
/// destination is temporarily unwritable.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open destination device {path}: {source}")]
    OpenFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to configure destination device: {0}")]
    ConfigFailed(String),

    #[error("destination write failed: {0}")]
    WriteFailed(String),

    #[error("incomplete frame written: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("destination device unavailable: {0}")]
    Unavailable(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_human_readable_messages() {
        let err = SinkError::ShortWrite {
            written: 100,
            expected: 200,
        };
        assert_eq!(err.to_string(), "incomplete frame written: 100 of 200 bytes");

        let err = SinkError::Unavailable("no backend on this platform".to_string());
        assert_eq!(
            err.to_string(),
            "destination device unavailable: no backend on this platform"
        );
    }
}
