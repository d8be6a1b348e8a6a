//! SDP Module - Session Description Protocol
//!
//! Emit-only implementation of the subset of RFC 4566 needed for an RTSP
//! DESCRIBE response body: origin, timing, session-level attributes and a
//! single video media description. There is no parser here; this server
//! never receives SDP, only produces it.

pub mod attribute;
pub mod media_description;
pub mod origin;
pub mod session_description;
pub mod timing;

pub use attribute::Attribute;
pub use media_description::MediaDescription;
pub use origin::Origin;
pub use session_description::SessionDescription;
pub use session_description::SessionDescriptionBuilder;
pub use timing::Timing;
