use thiserror::Error;

/// Sensor subsystem errors.
///
/// Everything here is recoverable at the supervisor level — none of these
/// escape the reconnect loop.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no sensor device found")]
    DeviceNotFound,

    #[error("sensor device could not be opened: {0}")]
    DeviceOpenFailed(String),

    #[error("requested capture mode is not supported: {0}")]
    ModeUnsupported(String),

    #[error("capture stream failed to start: {0}")]
    StreamStartFailed(String),

    #[error("sensor connection lost: {0}")]
    SessionLost(String),

    #[error("sensor driver error: {0}")]
    Driver(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_human_readable_messages() {
        assert_eq!(SensorError::DeviceNotFound.to_string(), "no sensor device found");
        assert_eq!(
            SensorError::SessionLost("usb transfer aborted".to_string()).to_string(),
            "sensor connection lost: usb transfer aborted"
        );
        assert_eq!(
            SensorError::ModeUnsupported("ir @ 1280x1024".to_string()).to_string(),
            "requested capture mode is not supported: ir @ 1280x1024"
        );
    }
}
