//! Construction-time server configuration.

/// Fixed-shape configuration for an [`crate::server::RtspServer`].
///
/// A plain struct with a hand-written [`Default`] rather than a
/// derive-heavy, dynamically loaded configuration document — this crate has
/// no REST/JSON control surface to justify one.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// RTSP control listener port.
    pub rtsp_port: u16,
    /// UDP port the server binds for RTP when a client negotiates `RTP/AVP/UDP`.
    pub rtp_port: u16,
    /// UDP port the server binds for RTCP (reserved, never read; see Non-goals).
    pub rtcp_port: u16,
    /// Publisher frame rate, used to derive the 90 kHz timestamp step.
    pub fps: f64,
    /// Maximum RTP payload size in bytes before FU-A fragmentation kicks in.
    pub max_payload_size: usize,
    /// Event loop poll cadence.
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            rtsp_port: 554,
            rtp_port: 20001,
            rtcp_port: 20002,
            fps: 25.0,
            max_payload_size: 1400,
            poll_interval_ms: 50,
        }
    }
}

impl ServerConfig {
    pub fn with_rtsp_port(mut self, port: u16) -> Self {
        self.rtsp_port = port;
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Overrides the RTP UDP port; pass `0` to let the OS pick one (tests
    /// running concurrently can't all bind the fixed default).
    pub fn with_rtp_port(mut self, port: u16) -> Self {
        self.rtp_port = port;
        self
    }

    /// Overrides the RTCP UDP port; pass `0` to let the OS pick one.
    pub fn with_rtcp_port(mut self, port: u16) -> Self {
        self.rtcp_port = port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_historical_ports() {
        let config = ServerConfig::default();
        assert_eq!(config.rtsp_port, 554);
        assert_eq!(config.rtp_port, 20001);
        assert_eq!(config.rtcp_port, 20002);
        assert_eq!(config.fps, 25.0);
        assert_eq!(config.max_payload_size, 1400);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::default().with_rtsp_port(8554).with_fps(30.0);
        assert_eq!(config.rtsp_port, 8554);
        assert_eq!(config.fps, 30.0);
    }
}
