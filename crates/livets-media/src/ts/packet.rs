//! Slicing PES packets into 188-byte TS packets.

use super::pes::{build_pes, CLOCK_MASK};
use super::{ElementaryStream, MAX_PID, SYNC_BYTE, TS_PACKET_SIZE};
use crate::bits::BitWriter;
use crate::frame::{Frame, StreamKind};
use bytes::{BufMut, BytesMut};

/// Payload bytes in a packet without adaptation field.
pub const MAX_PAYLOAD: usize = TS_PACKET_SIZE - 4;

/// Adaptation field carrying only a PCR: length byte, flags, 6 PCR bytes.
const PCR_ADAPTATION_LEN: usize = 8;

/// Payload bytes left in the first packet of a PES.
pub const FIRST_PACKET_PAYLOAD: usize = MAX_PAYLOAD - PCR_ADAPTATION_LEN;

/// Added to every PCR base, in 90 kHz ticks.
pub const PCR_OFFSET: u64 = 63_000;

/// Random access indicator and PCR flag.
const AF_FLAGS_RANDOM_ACCESS_PCR: u8 = 0x50;

/// Program clock reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Pcr {
    /// 33 bits, 90 kHz.
    pub base: u64,
    /// 9 bits, 27 MHz remainder.
    pub extension: u16,
}

impl Pcr {
    pub fn from_millis(timestamp_ms: u32) -> Self {
        let ms = timestamp_ms as u64;
        Self {
            base: (ms * 90 + PCR_OFFSET) & CLOCK_MASK,
            extension: ((ms * 270) % 300) as u16,
        }
    }

    /// 48-bit wire form: base, 6 reserved one bits, extension.
    pub fn encode(&self) -> [u8; 6] {
        let mut w = BitWriter::with_capacity(6);
        w.put(33, self.base);
        w.put(6, 0b11_1111);
        w.put(9, self.extension as u64);
        let mut out = [0u8; 6];
        out.copy_from_slice(&w.finish());
        out
    }

    pub fn decode(bytes: &[u8; 6]) -> Self {
        let base = ((bytes[0] as u64) << 25)
            | ((bytes[1] as u64) << 17)
            | ((bytes[2] as u64) << 9)
            | ((bytes[3] as u64) << 1)
            | ((bytes[4] as u64) >> 7);
        let extension = (((bytes[4] & 0x01) as u16) << 8) | bytes[5] as u16;
        Self { base, extension }
    }
}

/// One 4-bit continuity counter per elementary stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityCounters {
    video: u8,
    audio: u8,
}

impl ContinuityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `kind`.
    pub fn get(&self, kind: StreamKind) -> u8 {
        match kind {
            StreamKind::Video => self.video,
            StreamKind::Audio => self.audio,
        }
    }

    /// Return the counter for `kind` and advance it mod 16.
    pub fn next(&mut self, kind: StreamKind) -> u8 {
        let slot = match kind {
            StreamKind::Video => &mut self.video,
            StreamKind::Audio => &mut self.audio,
        };
        let cc = *slot;
        *slot = (cc + 1) & 0x0f;
        cc
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Writes frames as PES-in-TS packets.
#[derive(Debug, Default)]
pub struct Packetizer {
    counters: ContinuityCounters,
}

impl Packetizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> &ContinuityCounters {
        &self.counters
    }

    /// Restart both continuity counters at 0.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Append the TS packets for one frame, returning how many were written.
    pub fn write_frame(&mut self, frame: &Frame, out: &mut BytesMut) -> usize {
        let es = ElementaryStream::for_kind(frame.kind);
        let pes = build_pes(frame);
        let pcr = Pcr::from_millis(frame.timestamp);
        out.reserve((pes.len() / MAX_PAYLOAD + 2) * TS_PACKET_SIZE);

        // First packet: PUSI, PCR adaptation field, stuffing if the PES is short.
        let cc = self.counters.next(frame.kind);
        write_header(out, es.pid, true, 0x30 | cc);
        let take = pes.len().min(FIRST_PACKET_PAYLOAD);
        let stuffing = FIRST_PACKET_PAYLOAD - take;
        out.put_u8((PCR_ADAPTATION_LEN - 1 + stuffing) as u8);
        out.put_u8(AF_FLAGS_RANDOM_ACCESS_PCR);
        out.put_slice(&pcr.encode());
        out.put_bytes(0xff, stuffing);
        out.put_slice(&pes[..take]);

        let mut rest = &pes[take..];
        let mut packets = 1;
        while !rest.is_empty() {
            let cc = self.counters.next(frame.kind);
            if rest.len() >= MAX_PAYLOAD {
                write_header(out, es.pid, false, 0x10 | cc);
                out.put_slice(&rest[..MAX_PAYLOAD]);
                rest = &rest[MAX_PAYLOAD..];
            } else {
                write_header(out, es.pid, false, 0x30 | cc);
                let af_len = MAX_PAYLOAD - 1 - rest.len();
                out.put_u8(af_len as u8);
                if af_len > 0 {
                    out.put_u8(0x00);
                    out.put_bytes(0xff, af_len - 1);
                }
                out.put_slice(rest);
                rest = &[];
            }
            packets += 1;
        }

        tracing::trace!(
            kind = %frame.kind,
            timestamp = frame.timestamp,
            pes_len = pes.len(),
            packets,
            "packetized frame"
        );
        packets
    }
}

/// Sync byte, PUSI and PID, then the control byte (scrambling, AFC, CC).
///
/// # Panics
///
/// Panics if `pid` does not fit 13 bits.
fn write_header(out: &mut BytesMut, pid: u16, unit_start: bool, control: u8) {
    assert!(pid <= MAX_PID, "PID 0x{pid:04x} does not fit 13 bits");
    out.put_u8(SYNC_BYTE);
    out.put_u16(if unit_start { 0x4000 | pid } else { pid });
    out.put_u8(control);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::pes::PesHeader;
    use crate::ts::{AUDIO_PID, VIDEO_PID};

    fn packets(out: &[u8]) -> Vec<&[u8]> {
        assert_eq!(out.len() % TS_PACKET_SIZE, 0);
        out.chunks(TS_PACKET_SIZE).collect()
    }

    #[test]
    fn test_pcr_fields() {
        let pcr = Pcr::from_millis(1000);
        assert_eq!(pcr.base, 153_000);
        assert_eq!(pcr.extension, 0);
        assert_eq!(Pcr::from_millis(1).extension, 270);
        assert_eq!(Pcr::from_millis(2).extension, 240);
        assert_eq!(Pcr::decode(&pcr.encode()), pcr);
    }

    #[test]
    fn test_pcr_reserved_bits() {
        let bytes = Pcr::from_millis(0).encode();
        assert_eq!(bytes[4] & 0x7e, 0x7e);
    }

    #[test]
    fn test_counters_wrap_and_reset() {
        let mut cc = ContinuityCounters::new();
        let seq: Vec<u8> = (0..18).map(|_| cc.next(StreamKind::Video)).collect();
        assert_eq!(&seq[..3], &[0, 1, 2]);
        assert_eq!(seq[15], 15);
        assert_eq!(seq[16], 0);
        assert_eq!(cc.get(StreamKind::Audio), 0);
        cc.reset();
        assert_eq!(cc.get(StreamKind::Video), 0);
    }

    #[test]
    fn test_short_frame_single_packet() {
        let mut p = Packetizer::new();
        let mut out = BytesMut::new();
        let frame = Frame::audio(0, vec![0x11; 20]);
        assert_eq!(p.write_frame(&frame, &mut out), 1);

        let pkt = packets(&out)[0];
        assert_eq!(&pkt[..4], &[0x47, 0x41, 0x01, 0x30]);
        let pes_len = 14 + 20;
        let stuffing = FIRST_PACKET_PAYLOAD - pes_len;
        assert_eq!(pkt[4] as usize, 7 + stuffing);
        assert_eq!(pkt[5], 0x50);
        assert!(pkt[12..12 + stuffing].iter().all(|&b| b == 0xff));
        assert_eq!(&pkt[12 + stuffing..12 + stuffing + 3], &[0, 0, 1]);
        assert_eq!(&pkt[TS_PACKET_SIZE - 20..], &[0x11; 20][..]);
        assert_eq!(p.counters().get(StreamKind::Audio), 1);
    }

    #[test]
    fn test_exact_first_packet_fill() {
        let mut p = Packetizer::new();
        let mut out = BytesMut::new();
        // 19-byte video header fills the first packet exactly.
        let frame = Frame::video(0, true, vec![0x22; FIRST_PACKET_PAYLOAD - 19]);
        assert_eq!(p.write_frame(&frame, &mut out), 1);
        assert_eq!(out[4], 7);
    }

    #[test]
    fn test_multi_packet_layout() {
        let mut p = Packetizer::new();
        let mut out = BytesMut::new();
        let payload: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let frame = Frame::video(40, false, payload.clone());
        let pes_len = 19 + payload.len();
        let count = p.write_frame(&frame, &mut out);

        // 176 + 184 + 184 = 544, then 75 bytes in the last packet.
        assert_eq!(count, 4);
        let pkts = packets(&out);
        assert_eq!(&pkts[0][..4], &[0x47, 0x41, 0x00, 0x30]);
        assert_eq!(&pkts[1][..4], &[0x47, 0x01, 0x00, 0x11]);
        assert_eq!(&pkts[2][..4], &[0x47, 0x01, 0x00, 0x12]);
        assert_eq!(&pkts[3][..4], &[0x47, 0x01, 0x00, 0x33]);

        let last_len = pes_len - FIRST_PACKET_PAYLOAD - 2 * MAX_PAYLOAD;
        assert_eq!(pkts[3][4] as usize, 183 - last_len);
        assert_eq!(pkts[3][5], 0x00);
        assert!(pkts[3][6..TS_PACKET_SIZE - last_len].iter().all(|&b| b == 0xff));

        // Reassembling the payloads yields the PES.
        let mut pes = pkts[0][12..].to_vec();
        pes.extend_from_slice(&pkts[1][4..]);
        pes.extend_from_slice(&pkts[2][4..]);
        pes.extend_from_slice(&pkts[3][TS_PACKET_SIZE - last_len..]);
        let (header, offset) = PesHeader::parse(&pes).unwrap();
        assert_eq!(header.dts, Some(header.pts - 63_000));
        assert_eq!(&pes[offset..], &payload[..]);
    }

    #[test]
    fn test_one_byte_remainder_has_empty_adaptation_field() {
        let mut p = Packetizer::new();
        let mut out = BytesMut::new();
        // PES = 176 + 183 bytes: the last packet carries 183 bytes and af_len 0.
        let frame = Frame::video(0, false, vec![0; FIRST_PACKET_PAYLOAD + 183 - 19]);
        assert_eq!(p.write_frame(&frame, &mut out), 2);
        let pkts = packets(&out);
        assert_eq!(pkts[1][3] & 0x30, 0x30);
        assert_eq!(pkts[1][4], 0);
    }

    #[test]
    fn test_counters_run_per_pid() {
        let mut p = Packetizer::new();
        let mut out = BytesMut::new();
        for i in 0..20 {
            p.write_frame(&Frame::audio(i, vec![0; 10]), &mut out);
        }
        p.write_frame(&Frame::video(0, true, vec![0; 10]), &mut out);

        let ccs: Vec<u8> = packets(&out)
            .iter()
            .filter(|pkt| u16::from_be_bytes([pkt[1], pkt[2]]) & 0x1fff == AUDIO_PID)
            .map(|pkt| pkt[3] & 0x0f)
            .collect();
        let expected: Vec<u8> = (0..20u8).map(|i| i % 16).collect();
        assert_eq!(ccs, expected);

        let video = packets(&out)[20];
        assert_eq!(u16::from_be_bytes([video[1], video[2]]) & 0x1fff, VIDEO_PID);
        assert_eq!(video[3] & 0x0f, 0);
    }
}
