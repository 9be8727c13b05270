//! PES headers and 90 kHz timestamps.

use super::ElementaryStream;
use crate::bits::{BitWriter, ByteReader};
use crate::frame::{Frame, StreamKind};
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// 33-bit clock mask.
pub const CLOCK_MASK: u64 = (1 << 33) - 1;

/// Added to every PTS, in 90 kHz ticks.
pub const PTS_OFFSET: u64 = 126_000;

/// DTS trails PTS by this much on video, in 90 kHz ticks.
pub const DTS_DELAY: u64 = 63_000;

/// Timestamp field prefix for a PTS without DTS.
pub const PREFIX_PTS_ONLY: u8 = 0b0010;
/// Timestamp field prefix for the PTS of a PTS/DTS pair.
pub const PREFIX_PTS_WITH_DTS: u8 = 0b0011;
/// Timestamp field prefix for a DTS.
pub const PREFIX_DTS: u8 = 0b0001;

/// PES packet start code prefix.
const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// Convert milliseconds to a 90 kHz PTS.
pub fn presentation_time(timestamp_ms: u32) -> u64 {
    (timestamp_ms as u64 * 90 + PTS_OFFSET) & CLOCK_MASK
}

/// DTS paired with `pts` on video frames.
pub fn decode_time(pts: u64) -> u64 {
    pts.wrapping_sub(DTS_DELAY) & CLOCK_MASK
}

/// Encode a 33-bit timestamp into the 5-byte marker-interleaved form.
pub fn encode_timestamp(prefix: u8, value: u64) -> [u8; 5] {
    let value = value & CLOCK_MASK;
    let mut w = BitWriter::with_capacity(5);
    w.put(4, prefix as u64);
    w.put(3, value >> 30);
    w.put(1, 1);
    w.put(15, value >> 15);
    w.put(1, 1);
    w.put(15, value);
    w.put(1, 1);

    let mut out = [0u8; 5];
    out.copy_from_slice(&w.finish());
    out
}

/// Decode a 5-byte timestamp field, ignoring prefix and marker bits.
pub fn decode_timestamp(bytes: &[u8; 5]) -> u64 {
    let high = ((bytes[0] >> 1) & 0x07) as u64;
    let mid = (u16::from_be_bytes([bytes[1], bytes[2]]) >> 1) as u64;
    let low = (u16::from_be_bytes([bytes[3], bytes[4]]) >> 1) as u64;
    (high << 30) | (mid << 15) | low
}

/// Header of one PES packet as written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesHeader {
    pub stream_id: u8,
    /// 0 means unbounded.
    pub packet_length: u16,
    pub pts: u64,
    pub dts: Option<u64>,
}

impl PesHeader {
    /// Header for `frame`: PTS on audio, PTS and DTS on video.
    ///
    /// # Panics
    ///
    /// Panics if an audio payload overflows the 16-bit PES packet length.
    /// Decoded ADTS frames and coalescing keep audio far below it.
    pub fn for_frame(frame: &Frame) -> Self {
        let es = ElementaryStream::for_kind(frame.kind);
        let pts = presentation_time(frame.timestamp);
        let dts = match frame.kind {
            StreamKind::Video => Some(decode_time(pts)),
            StreamKind::Audio => None,
        };

        let length = frame.payload.len() + Self::optional_len(dts.is_some());
        let packet_length = match u16::try_from(length) {
            Ok(len) => len,
            // Unbounded length is allowed for video carried in TS.
            Err(_) if frame.kind == StreamKind::Video => 0,
            Err(_) => panic!("audio PES of {length} bytes overflows the packet length field"),
        };

        Self {
            stream_id: es.stream_id,
            packet_length,
            pts,
            dts,
        }
    }

    /// Bytes after the packet length field, excluding payload.
    fn optional_len(has_dts: bool) -> usize {
        if has_dts {
            3 + 10
        } else {
            3 + 5
        }
    }

    /// Total header size in bytes.
    pub fn encoded_len(&self) -> usize {
        6 + Self::optional_len(self.dts.is_some())
    }

    pub fn write(&self, out: &mut BytesMut) {
        out.put_slice(&START_CODE_PREFIX);
        out.put_u8(self.stream_id);
        out.put_u16(self.packet_length);
        out.put_u8(0x80); // marker bits, no scrambling
        match self.dts {
            Some(dts) => {
                out.put_u8(0xc0);
                out.put_u8(0x0a);
                out.put_slice(&encode_timestamp(PREFIX_PTS_WITH_DTS, self.pts));
                out.put_slice(&encode_timestamp(PREFIX_DTS, dts));
            }
            None => {
                out.put_u8(0x80);
                out.put_u8(0x05);
                out.put_slice(&encode_timestamp(PREFIX_PTS_ONLY, self.pts));
            }
        }
    }

    /// Parse a PES header, returning it and the offset of the payload.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let mut r = ByteReader::new(data);
        if r.read_bytes(3)? != START_CODE_PREFIX {
            return Err(Error::malformed("missing PES start code"));
        }
        let stream_id = r.read_uint8()?;
        let packet_length = r.read_uint16()?;
        r.skip(1)?;
        let flags = r.read_uint8()?;
        let header_data_length = r.read_uint8()? as usize;
        let payload_offset = r.position() + header_data_length;

        let mut pts = None;
        let mut dts = None;
        if flags & 0x80 != 0 {
            pts = Some(read_timestamp(&mut r)?);
        }
        if flags & 0x40 != 0 {
            dts = Some(read_timestamp(&mut r)?);
        }
        let pts = pts.ok_or_else(|| Error::malformed("PES without PTS"))?;
        if payload_offset > data.len() {
            return Err(Error::EndOfInput {
                need: payload_offset,
                have: data.len(),
            });
        }

        Ok((
            Self {
                stream_id,
                packet_length,
                pts,
                dts,
            },
            payload_offset,
        ))
    }
}

fn read_timestamp(r: &mut ByteReader<'_>) -> Result<u64> {
    let mut field = [0u8; 5];
    field.copy_from_slice(r.read_bytes(5)?);
    Ok(decode_timestamp(&field))
}

/// Build the full PES packet for a frame.
pub fn build_pes(frame: &Frame) -> BytesMut {
    let header = PesHeader::for_frame(frame);
    let mut out = BytesMut::with_capacity(header.encoded_len() + frame.payload.len());
    header.write(&mut out);
    out.put_slice(&frame.payload);
    out
}
