//! SDP media description representation.

use crate::attribute::Attribute;

/// An `m=` line plus its trailing `a=` lines: `m=<media> <port> <proto> <fmt>...`.
#[derive(Debug, Clone)]
pub struct MediaDescription {
    pub media_type: String,
    pub port: u16,
    pub protocol: String,
    pub formats: Vec<String>,
    pub attributes: Vec<Attribute>,
}

impl MediaDescription {
    /// A single H.264/RTP video track, advertised as not carried over the
    /// SDP connection itself (port 0 — the real transport is negotiated by SETUP).
    pub fn h264_video(payload_type: u8, control: &str) -> Self {
        Self {
            media_type: "video".to_string(),
            port: 0,
            protocol: "RTP/AVP".to_string(),
            formats: vec![payload_type.to_string()],
            attributes: vec![
                Attribute::value("rtpmap", format!("{} H264/90000", payload_type)),
                Attribute::value("control", control),
            ],
        }
    }
}

impl std::fmt::Display for MediaDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "m={} {} {} {}\r\n",
            self.media_type,
            self.port,
            self.protocol,
            self.formats.join(" ")
        )?;
        for attr in &self.attributes {
            write!(f, "{}", attr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h264_video_display() {
        let media = MediaDescription::h264_video(96, "track0");
        let text = media.to_string();
        assert!(text.starts_with("m=video 0 RTP/AVP 96\r\n"));
        assert!(text.contains("a=rtpmap:96 H264/90000\r\n"));
        assert!(text.contains("a=control:track0\r\n"));
    }
}
