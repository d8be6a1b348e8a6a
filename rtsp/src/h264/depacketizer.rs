//! H.264 RTP depacketizer: reassembles NAL units from RTP packets (RFC 6184).
//!
//! Single NAL unit mode packets are returned immediately with an Annex-B
//! start code prepended. FU-A fragments are reassembled across packets by
//! Start/End bit; a timestamp change while a reassembly is in progress
//! discards the stale partial buffer rather than stitching unrelated data.

use crate::wire::rtp::RtpPacket;

const FU_A_TYPE: u8 = 28;
const NAL_START_CODE: &[u8] = &[0x00, 0x00, 0x00, 0x01];

pub struct H264Depacketizer {
    current_timestamp: Option<u32>,
    nal_buffer: Vec<u8>,
}

impl H264Depacketizer {
    pub fn new() -> Self {
        H264Depacketizer {
            current_timestamp: None,
            nal_buffer: Vec::new(),
        }
    }

    /// Processes one RTP packet, returning a complete Annex-B NAL unit
    /// (start code included) when one becomes available.
    pub fn process_packet(&mut self, packet: &RtpPacket) -> Option<Vec<u8>> {
        let timestamp = packet.header.timestamp;
        let payload = &packet.payload;

        if payload.is_empty() {
            return None;
        }

        if let Some(current_ts) = self.current_timestamp
            && timestamp != current_ts
            && !self.nal_buffer.is_empty()
        {
            self.nal_buffer.clear();
        }

        let nal_type = payload[0] & 0x1F;

        if nal_type == FU_A_TYPE {
            self.process_fu_a(payload, timestamp)
        } else {
            Some(self.process_single_nal(payload, timestamp))
        }
    }

    pub fn reset(&mut self) {
        self.current_timestamp = None;
        self.nal_buffer.clear();
    }

    pub fn has_pending_data(&self) -> bool {
        !self.nal_buffer.is_empty()
    }

    fn process_single_nal(&mut self, payload: &[u8], timestamp: u32) -> Vec<u8> {
        let mut complete_nal = Vec::with_capacity(NAL_START_CODE.len() + payload.len());
        complete_nal.extend_from_slice(NAL_START_CODE);
        complete_nal.extend_from_slice(payload);
        self.current_timestamp = Some(timestamp);
        complete_nal
    }

    fn process_fu_a(&mut self, payload: &[u8], timestamp: u32) -> Option<Vec<u8>> {
        if payload.len() < 2 {
            return None;
        }

        let fu_indicator = payload[0];
        let fu_header = payload[1];
        let (is_start, is_end, nal_type) = parse_fu_header(fu_header);

        if is_start {
            self.start_new_fragment(timestamp, fu_indicator, nal_type);
        }

        self.nal_buffer.extend_from_slice(&payload[2..]);

        if is_end {
            Some(std::mem::take(&mut self.nal_buffer))
        } else {
            None
        }
    }

    fn start_new_fragment(&mut self, timestamp: u32, fu_indicator: u8, nal_type: u8) {
        self.current_timestamp = Some(timestamp);
        self.nal_buffer.clear();
        self.nal_buffer.extend_from_slice(NAL_START_CODE);

        let nri = (fu_indicator >> 5) & 0x03;
        self.nal_buffer.push((nri << 5) | nal_type);
    }
}

fn parse_fu_header(fu_header: u8) -> (bool, bool, u8) {
    let is_start = (fu_header & 0x80) != 0;
    let is_end = (fu_header & 0x40) != 0;
    let nal_type = fu_header & 0x1F;
    (is_start, is_end, nal_type)
}

impl Default for H264Depacketizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::rtp::RtpHeader;

    #[test]
    fn test_single_nal_unit() {
        let mut depacketizer = H264Depacketizer::new();

        let mut header = RtpHeader::new(96, 12345);
        header.timestamp = 1000;
        header.marker = true;

        let packet = RtpPacket::new(header, vec![0x67, 0x01, 0x02, 0x03]);
        let nal = depacketizer.process_packet(&packet).unwrap();

        assert_eq!(&nal[0..4], NAL_START_CODE);
        assert_eq!(&nal[4..], &[0x67, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_fu_a_reassembly() {
        let mut depacketizer = H264Depacketizer::new();
        let timestamp = 2000;
        let nri = 3u8;
        let fu_indicator = (nri << 5) | FU_A_TYPE;
        let original_nal_type = 0x05;

        let mut header1 = RtpHeader::new(96, 54321);
        header1.timestamp = timestamp;
        let payload1 = vec![fu_indicator, 0x80 | original_nal_type, 0xAA, 0xAA];
        assert!(
            depacketizer
                .process_packet(&RtpPacket::new(header1, payload1))
                .is_none()
        );

        let mut header2 = RtpHeader::new(96, 54321);
        header2.timestamp = timestamp;
        let payload2 = vec![fu_indicator, original_nal_type, 0xBB, 0xBB];
        assert!(
            depacketizer
                .process_packet(&RtpPacket::new(header2, payload2))
                .is_none()
        );

        let mut header3 = RtpHeader::new(96, 54321);
        header3.timestamp = timestamp;
        header3.marker = true;
        let payload3 = vec![fu_indicator, 0x40 | original_nal_type, 0xCC, 0xCC];
        let nal = depacketizer
            .process_packet(&RtpPacket::new(header3, payload3))
            .unwrap();

        assert_eq!(&nal[0..4], NAL_START_CODE);
        assert_eq!(nal[4], (nri << 5) | original_nal_type);
        assert_eq!(&nal[5..], &[0xAA, 0xAA, 0xBB, 0xBB, 0xCC, 0xCC]);
    }

    #[test]
    fn test_timestamp_change_discards_incomplete_reassembly() {
        let mut depacketizer = H264Depacketizer::new();

        let mut header1 = RtpHeader::new(96, 12345);
        header1.timestamp = 1000;
        let payload1 = vec![(3 << 5) | FU_A_TYPE, 0x80 | 0x05, 0xAA, 0xBB];
        depacketizer.process_packet(&RtpPacket::new(header1, payload1));
        assert!(depacketizer.has_pending_data());

        let mut header2 = RtpHeader::new(96, 12345);
        header2.timestamp = 2000;
        header2.marker = true;
        let payload2 = vec![0x67, 0x01, 0x02];
        let nal = depacketizer
            .process_packet(&RtpPacket::new(header2, payload2))
            .unwrap();

        assert_eq!(&nal[4..], &[0x67, 0x01, 0x02]);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut depacketizer = H264Depacketizer::new();
        let mut header = RtpHeader::new(96, 1);
        header.timestamp = 1000;
        let payload = vec![(3 << 5) | FU_A_TYPE, 0x80 | 0x05, 0xAA];
        depacketizer.process_packet(&RtpPacket::new(header, payload));
        assert!(depacketizer.has_pending_data());

        depacketizer.reset();
        assert!(!depacketizer.has_pending_data());
    }
}
