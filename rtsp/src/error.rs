//! Crate-wide error type.

use std::fmt;
use std::io;

/// Errors produced by the RTSP server and pull client.
#[derive(Debug)]
pub enum RtspError {
    /// I/O failure on a control or media socket.
    Io(io::Error),
    /// Malformed or unparseable RTSP request/response.
    Protocol(String),
    /// Transport negotiation failed (unsupported `Transport:` header, bad Session id).
    Transport(String),
    /// SDP construction failed.
    Sdp(String),
    /// Invalid construction-time configuration.
    Config(String),
}

impl fmt::Display for RtspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtspError::Io(e) => write!(f, "I/O error: {}", e),
            RtspError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            RtspError::Transport(msg) => write!(f, "transport error: {}", msg),
            RtspError::Sdp(msg) => write!(f, "SDP error: {}", msg),
            RtspError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for RtspError {}

impl From<io::Error> for RtspError {
    fn from(err: io::Error) -> Self {
        RtspError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, RtspError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(ErrorKind::NotFound, "no such socket");
        let err: RtspError = io_err.into();
        assert!(matches!(err, RtspError::Io(_)));
    }

    #[test]
    fn test_display_variants() {
        assert_eq!(
            RtspError::Protocol("missing CSeq".into()).to_string(),
            "protocol error: missing CSeq"
        );
        assert_eq!(
            RtspError::Transport("unsupported profile".into()).to_string(),
            "transport error: unsupported profile"
        );
    }
}
