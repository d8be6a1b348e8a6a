//! H.264 RTP packetizer (RFC 6184): single NAL unit mode and FU-A fragmentation.
//!
//! FU Indicator (1 byte): `F | NRI | Type=28`. FU Header (1 byte): `S | E | R | original type`.
//!
//! Unlike a batch packetizer that receives a whole frame at once and marks its
//! last NAL unconditionally, this one only learns an access unit has ended when
//! the *next* NAL unit arrives (or the stream is flushed), so it buffers one NAL
//! unit of lookahead before emitting packets with a correctly placed marker bit.

use crate::wire::rtp::{RtpHeader, RtpPacket};
use rand::Rng;

const FU_A_TYPE: u8 = 28;

/// RFC 6184 H.264 RTP packetizer with one NAL unit of lookahead for marker-bit
/// placement and a configurable frame rate for the 90 kHz timestamp step.
pub struct H264Packetizer {
    ssrc: u32,
    sequence_number: u16,
    timestamp: u32,
    payload_type: u8,
    max_payload_size: usize,
    timestamp_increment: u32,
    pending: Option<Vec<u8>>,
}

impl H264Packetizer {
    /// `fps` drives `timestamp_increment = round(90000 / fps)`.
    pub fn new(payload_type: u8, max_payload_size: usize, fps: f64) -> Self {
        let mut rng = rand::thread_rng();
        let timestamp_increment = (90000.0 / fps).round() as u32;

        H264Packetizer {
            ssrc: rng.gen_range(0..=u32::MAX),
            sequence_number: rng.gen_range(0..=u16::MAX),
            timestamp: 0,
            payload_type,
            max_payload_size,
            timestamp_increment,
            pending: None,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Feeds one NAL unit (as produced by [`crate::nal::NalFramer`]). Packets
    /// for the *previous* NAL unit are returned once it's known whether `nal`
    /// starts a new access unit.
    pub fn push_nal(&mut self, nal: Vec<u8>) -> Vec<RtpPacket> {
        let starts_new_au = starts_access_unit(&nal);
        let packets = self.flush_pending(starts_new_au);
        self.pending = Some(nal);
        packets
    }

    /// Emits packets for any buffered NAL unit, marking it as the end of its
    /// access unit. Call when the publisher signals end of stream.
    pub fn flush(&mut self) -> Vec<RtpPacket> {
        self.flush_pending(true)
    }

    fn flush_pending(&mut self, is_last_in_access_unit: bool) -> Vec<RtpPacket> {
        let Some(prev) = self.pending.take() else {
            return Vec::new();
        };

        let packets = if prev.len() <= self.max_payload_size {
            self.packetize_single_nal(&prev, is_last_in_access_unit)
        } else {
            self.packetize_fu_a(&prev, is_last_in_access_unit)
        };

        let nal_type = prev.first().map(|b| b & 0x1F).unwrap_or(0);
        if nal_type != 7 && nal_type != 8 {
            self.timestamp = self.timestamp.wrapping_add(self.timestamp_increment);
        }

        packets
    }

    fn packetize_single_nal(&mut self, nal_unit: &[u8], is_last: bool) -> Vec<RtpPacket> {
        vec![self.create_rtp_packet(nal_unit.to_vec(), is_last)]
    }

    fn packetize_fu_a(&mut self, nal_unit: &[u8], is_last_nal: bool) -> Vec<RtpPacket> {
        if nal_unit.is_empty() {
            return Vec::new();
        }

        let (nal_type, nri) = parse_nal_header(nal_unit[0]);
        let fu_indicator = (nri << 5) | FU_A_TYPE;
        let payload = &nal_unit[1..];

        // Chunks are sized off the NAL body directly (not body-minus-header),
        // so `ceil((size-1) / max_payload_size)` fragments come out, matching
        // the single-NAL-mode threshold on the same `size` measurement.
        let fragments: Vec<&[u8]> = payload.chunks(self.max_payload_size).collect();
        let mut packets = Vec::with_capacity(fragments.len());

        for (i, fragment) in fragments.iter().enumerate() {
            let is_first = i == 0;
            let is_last_fragment = i == fragments.len() - 1;
            let fu_header = build_fu_header(nal_type, is_first, is_last_fragment);
            let rtp_payload = build_fu_a_payload(fu_indicator, fu_header, fragment);
            packets.push(self.create_rtp_packet(rtp_payload, is_last_nal && is_last_fragment));
        }

        packets
    }

    fn create_rtp_packet(&mut self, payload: Vec<u8>, marker: bool) -> RtpPacket {
        let mut header = RtpHeader::new(self.payload_type, self.ssrc);
        header.sequence_number = self.sequence_number;
        header.timestamp = self.timestamp;
        header.marker = marker;

        self.sequence_number = self.sequence_number.wrapping_add(1);
        RtpPacket::new(header, payload)
    }
}

/// An access unit boundary in H.264 falls at the start of a slice NAL
/// (type 1, non-IDR, or type 5, IDR) — SPS/PPS/SEI never start one themselves.
fn starts_access_unit(nal: &[u8]) -> bool {
    match nal.first() {
        Some(b) => matches!(b & 0x1F, 1 | 5),
        None => false,
    }
}

fn parse_nal_header(nal_header: u8) -> (u8, u8) {
    let nal_type = nal_header & 0x1F;
    let nri = (nal_header >> 5) & 0x03;
    (nal_type, nri)
}

fn build_fu_header(nal_type: u8, is_first: bool, is_last: bool) -> u8 {
    let mut fu_header = nal_type;
    if is_first {
        fu_header |= 0x80;
    }
    if is_last {
        fu_header |= 0x40;
    }
    fu_header
}

fn build_fu_a_payload(fu_indicator: u8, fu_header: u8, fragment: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(fragment.len() + 2);
    payload.push(fu_indicator);
    payload.push(fu_header);
    payload.extend_from_slice(fragment);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sps() -> Vec<u8> {
        let mut nal = vec![0x67];
        nal.extend(vec![0x01, 0x02, 0x03]);
        nal
    }

    fn idr(size: usize) -> Vec<u8> {
        let mut nal = vec![0x65];
        nal.extend(vec![0xAA; size]);
        nal
    }

    #[test]
    fn test_single_nal_unit_mode_emits_on_next_push() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        assert!(p.push_nal(sps()).is_empty()); // buffered, no lookahead yet
        let packets = p.push_nal(idr(10));
        assert_eq!(packets.len(), 1);
        assert!(!packets[0].header.marker); // sps is not last of AU: idr starts new AU
        assert_eq!(packets[0].payload[0] & 0x1F, 7);
    }

    #[test]
    fn test_marker_set_when_next_nal_starts_access_unit() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        p.push_nal(sps());
        let packets = p.push_nal(idr(10)); // flushes sps, not marked (idr starts AU, not sps ending one)
        assert!(!packets[0].header.marker);

        let packets2 = p.push_nal(vec![0x01, 0x09]); // some non-AU-start NAL follows idr
        assert_eq!(packets2.len(), 1);
        assert!(!packets2[0].header.marker);

        let final_packets = p.flush();
        assert_eq!(final_packets.len(), 1);
        assert!(final_packets[0].header.marker);
    }

    #[test]
    fn test_fu_a_fragmentation_start_and_end_bits() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        p.push_nal(idr(2000));
        let packets = p.flush();

        assert!(packets.len() > 1);
        assert_eq!(packets[0].payload[0] & 0x1F, FU_A_TYPE);
        assert_eq!((packets[0].payload[0] >> 5) & 0x03, 3); // NRI preserved from 0x65
        assert!(packets[0].payload[1] & 0x80 != 0); // start bit
        assert_eq!(packets[0].payload[1] & 0x1F, 5); // original NAL type

        let last = packets.last().unwrap();
        assert!(last.payload[1] & 0x40 != 0); // end bit
        assert!(last.header.marker);

        for mid in &packets[1..packets.len() - 1] {
            assert_eq!(mid.payload[1] & 0xC0, 0); // neither start nor end
        }
    }

    #[test]
    fn test_fragment_count_matches_ceiling_formula() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        let size = 3000;
        p.push_nal(idr(size - 1)); // total NAL size including header == size
        let packets = p.flush();
        let expected = ((size - 1) as f64 / 1000.0).ceil() as usize;
        assert_eq!(packets.len(), expected);
    }

    #[test]
    fn test_scenario_3000_byte_nal_fragment_sizes() {
        // 3000-byte NAL, header 0x65 (type 5, NRI 3), RTP_MAX_PAYLOAD=1400.
        // FU header carries only the original type (nal_header & 0x1F) plus
        // S/E bits; NRI lives in the FU indicator's top bits, not here.
        let mut p = H264Packetizer::new(96, 1400, 30.0);
        p.push_nal(idr(3000 - 1));
        let packets = p.flush();

        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].payload[0], 0x7C); // FU indicator
        assert_eq!(packets[0].payload[1], 0x85); // FU header, start bit
        assert_eq!(packets[1].payload[1], 0x05); // FU header, middle
        assert_eq!(packets[2].payload[1], 0x45); // FU header, end bit

        assert_eq!(packets[0].payload.len() - 2, 1400);
        assert_eq!(packets[1].payload.len() - 2, 1400);
        assert_eq!(packets[2].payload.len() - 2, 199);
    }

    #[test]
    fn test_timestamp_advances_only_for_non_parameter_set_nals() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        p.push_nal(sps()); // buffered; timestamp unaffected so far
        assert_eq!(p.timestamp(), 0);
        p.push_nal(idr(10)); // flushes sps (type 7), no advance
        assert_eq!(p.timestamp(), 0);
        p.push_nal(idr(10)); // flushes first idr (type 5), advances
        assert_eq!(p.timestamp(), 3000); // 90000 / 30 fps
    }

    #[test]
    fn test_sequence_number_increments_per_packet() {
        let mut p = H264Packetizer::new(96, 1000, 30.0);
        let start_seq = p.sequence_number();
        p.push_nal(sps());
        p.push_nal(idr(10));
        assert_eq!(p.sequence_number(), start_seq.wrapping_add(1));
    }
}
