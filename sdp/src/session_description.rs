//! Top-level SDP session description, and its builder.

use crate::attribute::Attribute;
use crate::media_description::MediaDescription;
use crate::origin::Origin;
use crate::timing::Timing;

/// A complete SDP message body, in RFC 4566 field order: v, o, (s,) t, session
/// attributes, then media descriptions. `session_name` ("s=") is optional here:
/// the RTSP DESCRIBE body this crate's only caller builds never sets one.
#[derive(Debug, Clone)]
pub struct SessionDescription {
    pub version: u8,
    pub origin: Origin,
    pub session_name: Option<String>,
    pub timing: Timing,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaDescription>,
}

impl std::fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        write!(f, "{}", self.origin)?;
        if let Some(name) = &self.session_name {
            write!(f, "s={}\r\n", name)?;
        }
        write!(f, "{}", self.timing)?;

        for attr in &self.attributes {
            write!(f, "{}", attr)?;
        }
        for media in &self.media {
            write!(f, "{}", media)?;
        }

        Ok(())
    }
}

/// Builder for `SessionDescription`, a fluent chain of field setters; this
/// crate only emits SDP, so there is no offer/answer parsing half.
pub struct SessionDescriptionBuilder {
    session: SessionDescription,
}

impl SessionDescriptionBuilder {
    pub fn new() -> Self {
        Self {
            session: SessionDescription {
                version: 0,
                origin: Origin::anonymous(0, "0.0.0.0"),
                session_name: None,
                timing: Timing::default(),
                attributes: Vec::new(),
                media: Vec::new(),
            },
        }
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.session.origin = origin;
        self
    }

    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session.session_name = Some(name.into());
        self
    }

    pub fn timing(mut self, timing: Timing) -> Self {
        self.session.timing = timing;
        self
    }

    pub fn add_attribute(mut self, attr: Attribute) -> Self {
        self.session.attributes.push(attr);
        self
    }

    pub fn add_media(mut self, media: MediaDescription) -> Self {
        self.session.media.push(media);
        self
    }

    pub fn build(self) -> SessionDescription {
        self.session
    }
}

impl Default for SessionDescriptionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_body_shape() {
        let sdp = SessionDescriptionBuilder::new()
            .origin(Origin::anonymous(9123456789, "127.0.0.1"))
            .timing(Timing::default())
            .add_attribute(Attribute::value("control", "*"))
            .add_media(MediaDescription::h264_video(96, "track0"))
            .build();

        let text = sdp.to_string();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines[0], "v=0");
        assert!(lines[1].starts_with("o=- 9123456789 1 IN IP4 127.0.0.1"));
        assert_eq!(lines[2], "t=0 0");
        assert_eq!(lines[3], "a=control:*");
        assert_eq!(lines[4], "m=video 0 RTP/AVP 96");
    }

    #[test]
    fn test_session_name_line_is_omitted_when_unset() {
        let sdp = SessionDescriptionBuilder::new()
            .add_media(MediaDescription::h264_video(96, "track0"))
            .build();
        assert!(!sdp.to_string().contains("s="));
    }

    #[test]
    fn test_builder_default_is_empty_session() {
        let sdp = SessionDescriptionBuilder::default()
            .session_name("x")
            .add_media(MediaDescription::h264_video(96, "track0"))
            .build();
        assert!(sdp.media.len() == 1);
        assert_eq!(sdp.session_name.as_deref(), Some("x"));
    }
}
