use std::fmt;
use std::io;

use crate::data_capture::types::Channel;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    ArgsError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::ArgsError(e) => write!(f, "Argument parsing error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    /// `start` was called on a session that is already capturing.
    AlreadyStarted,
    /// `start` was called on a session that has been stopped.
    AlreadyStopped,
    /// Another session currently holds the redirection for this channel.
    ChannelBusy(Channel),
    /// The wrapped real sink failed while a write was forwarded to it.
    PassthroughWriteFailed(io::Error),
    /// A logging handler's writer could not be located for substitution.
    RedirectionNotFound(String),
    SerializationError(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::AlreadyStarted => write!(f, "Capture session already started"),
            CaptureError::AlreadyStopped => {
                write!(f, "Capture session already stopped and cannot be restarted")
            }
            CaptureError::ChannelBusy(c) => {
                write!(f, "Channel {} is already captured by another session", c)
            }
            CaptureError::PassthroughWriteFailed(e) => write!(f, "Passthrough write failed: {}", e),
            CaptureError::RedirectionNotFound(e) => write!(f, "Redirection not found: {}", e),
            CaptureError::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::PassthroughWriteFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CaptureError> for io::Error {
    fn from(err: CaptureError) -> Self {
        let kind = match &err {
            CaptureError::PassthroughWriteFailed(e) => e.kind(),
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_failure_keeps_kind_across_io_boundary() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: io::Error = CaptureError::PassthroughWriteFailed(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let wrapped = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<CaptureError>())
            .expect("capture error inside io error");
        assert!(matches!(wrapped, CaptureError::PassthroughWriteFailed(_)));
    }

    #[test]
    fn display_names_the_busy_channel() {
        let msg = CaptureError::ChannelBusy(Channel::Error).to_string();
        assert!(msg.contains("stderr"));
    }
}
