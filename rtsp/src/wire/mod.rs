//! Byte-level wire codecs: the RTP header/packet and the RTSP interleaved envelope.

pub mod interleaved;
pub mod rtp;

pub use interleaved::InterleavedHeader;
pub use rtp::{RtpHeader, RtpPacket};
