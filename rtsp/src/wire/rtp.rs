//! RTP packet structure and serialization (RFC 3550 §5.1).
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           SSRC (Synchronization Source)                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::{Result, RtspError};

pub(crate) fn parse_u16_be(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn parse_u32_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// RTP packet header according to RFC 3550.
#[derive(Debug, Clone)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Fixed size of the RTP header in bytes.
    pub const HEADER_SIZE: usize = 12;

    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        RtpHeader {
            version: 2,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: false,
            payload_type,
            sequence_number: 0,
            timestamp: 0,
            ssrc,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::HEADER_SIZE);

        let byte0 = (self.version << 6)
            | ((self.padding as u8) << 5)
            | ((self.extension as u8) << 4)
            | self.csrc_count;
        bytes.push(byte0);

        let byte1 = ((self.marker as u8) << 7) | self.payload_type;
        bytes.push(byte1);

        bytes.extend_from_slice(&self.sequence_number.to_be_bytes());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.ssrc.to_be_bytes());

        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(RtspError::Protocol("RTP header too short".to_string()));
        }

        let version = (data[0] >> 6) & 0x03;
        let padding = ((data[0] >> 5) & 0x01) == 1;
        let extension = ((data[0] >> 4) & 0x01) == 1;
        let csrc_count = data[0] & 0x0F;

        let marker = ((data[1] >> 7) & 0x01) == 1;
        let payload_type = data[1] & 0x7F;

        let sequence_number = parse_u16_be(data, 2);
        let timestamp = parse_u32_be(data, 4);
        let ssrc = parse_u32_be(data, 8);

        Ok(RtpHeader {
            version,
            padding,
            extension,
            csrc_count,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
        })
    }
}

/// Complete RTP packet: header plus payload bytes.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Vec<u8>,
}

impl RtpPacket {
    pub fn new(header: RtpHeader, payload: Vec<u8>) -> Self {
        RtpPacket { header, payload }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = RtpHeader::from_bytes(data)?;
        let payload = data[RtpHeader::HEADER_SIZE..].to_vec();
        Ok(RtpPacket { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtp_header_roundtrip() {
        let header = RtpHeader {
            version: 2,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: true,
            payload_type: 96,
            sequence_number: 1234,
            timestamp: 5678,
            ssrc: 9999,
        };

        let bytes = header.to_bytes();
        let decoded = RtpHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.marker, decoded.marker);
        assert_eq!(header.payload_type, decoded.payload_type);
        assert_eq!(header.sequence_number, decoded.sequence_number);
        assert_eq!(header.timestamp, decoded.timestamp);
        assert_eq!(header.ssrc, decoded.ssrc);
    }

    #[test]
    fn test_rtp_header_size_is_twelve_bytes() {
        let header = RtpHeader::new(96, 1000);
        assert_eq!(header.to_bytes().len(), 12);
    }

    #[test]
    fn test_from_bytes_rejects_short_input() {
        let short = vec![0x80, 0x60, 0x12, 0x34];
        assert!(RtpHeader::from_bytes(&short).is_err());
    }

    #[test]
    fn test_marker_and_payload_type_bit_positions() {
        let mut header = RtpHeader::new(127, 1000);
        header.marker = true;
        let bytes = header.to_bytes();
        assert_eq!((bytes[1] >> 7) & 0x01, 1);
        assert_eq!(bytes[1] & 0x7F, 127);
    }

    #[test]
    fn test_packet_roundtrip_with_payload() {
        let mut header = RtpHeader::new(96, 12345);
        header.sequence_number = 999;
        header.timestamp = 90000;
        header.marker = true;

        let payload = vec![1, 2, 3, 4, 5];
        let packet = RtpPacket::new(header, payload.clone());
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), 12 + payload.len());

        let decoded = RtpPacket::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.header.sequence_number, 999);
        assert_eq!(decoded.header.timestamp, 90000);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_sequence_number_wraps_at_u16_max() {
        let mut header = RtpHeader::new(96, 1000);
        header.sequence_number = 65535;
        let bytes = header.to_bytes();
        assert_eq!(RtpHeader::from_bytes(&bytes).unwrap().sequence_number, 65535);
    }
}
