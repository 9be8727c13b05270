//! Program Association and Program Map tables.
//!
//! Both tables are fixed for a session: one program carrying one H.264 and
//! one AAC stream, with the PCR on the video PID. They are built once and
//! prepended to every segment.

use super::crc::crc32_mpeg2;
use super::{
    ElementaryStream, PAT_PID, PMT_PID, PROGRAM_NUMBER, SYNC_BYTE, TRANSPORT_STREAM_ID,
    TS_PACKET_SIZE,
};
use crate::bits::BitWriter;
use bytes::{BufMut, BytesMut};

pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

/// Elementary streams advertised in the PMT, in order.
const PROGRAM_STREAMS: [ElementaryStream; 2] = [ElementaryStream::VIDEO, ElementaryStream::AUDIO];

/// Pre-built PAT and PMT packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psi {
    pat: [u8; TS_PACKET_SIZE],
    pmt: [u8; TS_PACKET_SIZE],
}

impl Default for Psi {
    fn default() -> Self {
        Self::new()
    }
}

impl Psi {
    pub fn new() -> Self {
        Self {
            pat: section_packet(PAT_PID, &pat_section()),
            pmt: section_packet(PMT_PID, &pmt_section()),
        }
    }

    pub fn pat(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.pat
    }

    pub fn pmt(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.pmt
    }

    /// Append the PAT packet then the PMT packet.
    pub fn write_to(&self, out: &mut BytesMut) {
        out.put_slice(&self.pat);
        out.put_slice(&self.pmt);
    }
}

/// Table id, section syntax flags and 12-bit section length.
fn section_header(w: &mut BitWriter, table_id: u8, section_length: u16) {
    w.put(8, table_id as u64);
    w.put(1, 1); // section syntax indicator
    w.put(1, 0);
    w.put(2, 0b11); // reserved
    w.put(12, section_length as u64);
}

/// Version 0, current, single section.
fn section_version(w: &mut BitWriter) {
    w.put(2, 0b11); // reserved
    w.put(5, 0); // version
    w.put(1, 1); // current_next
    w.put(8, 0); // section number
    w.put(8, 0); // last section number
}

fn pat_section() -> Vec<u8> {
    // 5 fixed bytes after the length, one program entry, CRC.
    let section_length = 5 + 4 + 4;
    let mut w = BitWriter::with_capacity(3 + section_length as usize);
    section_header(&mut w, TABLE_ID_PAT, section_length);
    w.put(16, TRANSPORT_STREAM_ID as u64);
    section_version(&mut w);
    w.put(16, PROGRAM_NUMBER as u64);
    w.put(3, 0b111);
    w.put(13, PMT_PID as u64);
    with_crc(w.finish())
}

fn pmt_section() -> Vec<u8> {
    // 5 fixed bytes, PCR PID and program info length, 5 bytes per stream, CRC.
    let section_length = 5 + 4 + 5 * PROGRAM_STREAMS.len() as u16 + 4;
    let mut w = BitWriter::with_capacity(3 + section_length as usize);
    section_header(&mut w, TABLE_ID_PMT, section_length);
    w.put(16, PROGRAM_NUMBER as u64);
    section_version(&mut w);
    w.put(3, 0b111);
    w.put(13, ElementaryStream::VIDEO.pid as u64); // PCR PID
    w.put(4, 0b1111);
    w.put(12, 0); // program info length
    for es in &PROGRAM_STREAMS {
        w.put(8, es.stream_type as u64);
        w.put(3, 0b111);
        w.put(13, es.pid as u64);
        w.put(4, 0b1111);
        w.put(12, 0); // ES info length
    }
    with_crc(w.finish())
}

fn with_crc(mut section: Vec<u8>) -> Vec<u8> {
    let crc = crc32_mpeg2(&section);
    section.extend_from_slice(&crc.to_be_bytes());
    section
}

/// Wrap a section in one TS packet: PUSI set, payload only, CC 0, pointer 0.
fn section_packet(pid: u16, section: &[u8]) -> [u8; TS_PACKET_SIZE] {
    let mut packet = [0xffu8; TS_PACKET_SIZE];
    packet[0] = SYNC_BYTE;
    packet[1] = 0x40 | (pid >> 8) as u8;
    packet[2] = (pid & 0xff) as u8;
    packet[3] = 0x10;
    packet[4] = 0x00; // pointer field
    packet[5..5 + section.len()].copy_from_slice(section);
    packet
}
