//! Verification demuxer.
//!
//! Reads back what the packetizer writes: PAT and PMT with CRC checks, PES
//! reassembly per PID, PCR/PTS/DTS decoding and continuity tracking. It is
//! not a general purpose demuxer; sections must fit in one packet.

use super::crc::crc32_mpeg2;
use super::packet::Pcr;
use super::pes::PesHeader;
use super::psi::{TABLE_ID_PAT, TABLE_ID_PMT};
use super::{ElementaryStream, PAT_PID, SYNC_BYTE, TS_PACKET_SIZE};
use crate::bits::ByteReader;
use crate::frame::StreamKind;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Program described by the PAT and PMT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ProgramInfo {
    pub transport_stream_id: u16,
    pub program_number: u16,
    pub pmt_pid: u16,
    pub pcr_pid: Option<u16>,
    pub streams: Vec<StreamInfo>,
}

/// One PMT elementary stream entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamInfo {
    pub stream_type: u8,
    pub pid: u16,
}

/// One reassembled PES packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PesRecord {
    pub pid: u16,
    pub kind: Option<StreamKind>,
    pub stream_id: u8,
    pub pts: u64,
    pub dts: Option<u64>,
    /// PCR carried by the packet that started this PES.
    pub pcr: Option<Pcr>,
    /// Index of the packet that started this PES.
    pub start_packet: usize,
    /// False when fewer payload bytes arrived than the header declares.
    pub complete: bool,
    pub payload_len: usize,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub payload: Vec<u8>,
}

/// A packet whose continuity counter did not follow its predecessor on the same PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ContinuityError {
    pub packet_index: usize,
    pub pid: u16,
    pub expected: u8,
    pub found: u8,
}

/// Everything the demuxer learned from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct DemuxReport {
    pub packets: usize,
    pub program: Option<ProgramInfo>,
    pub pes: Vec<PesRecord>,
    pub continuity_errors: Vec<ContinuityError>,
    /// Packet count per PID.
    pub pid_packets: BTreeMap<u16, usize>,
}

impl DemuxReport {
    /// PES records on one stream, in stream order.
    pub fn stream(&self, kind: StreamKind) -> impl Iterator<Item = &PesRecord> {
        self.pes.iter().filter(move |p| p.kind == Some(kind))
    }
}

struct PendingPes {
    data: Vec<u8>,
    pcr: Option<Pcr>,
    start_packet: usize,
}

/// Incremental TS demuxer.
#[derive(Default)]
pub struct TsDemuxer {
    report: DemuxReport,
    pmt_pid: Option<u16>,
    pending: HashMap<u16, PendingPes>,
    last_cc: HashMap<u16, u8>,
}

impl TsDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a buffer of whole packets.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        if data.len() % TS_PACKET_SIZE != 0 {
            return Err(Error::malformed(format!(
                "{} bytes is not a whole number of TS packets",
                data.len()
            )));
        }
        data.chunks(TS_PACKET_SIZE)
            .try_for_each(|packet| self.push_packet(packet))
    }

    /// Feed one 188-byte packet.
    pub fn push_packet(&mut self, packet: &[u8]) -> Result<()> {
        let index = self.report.packets;
        let offset = index * TS_PACKET_SIZE;
        if packet.len() != TS_PACKET_SIZE {
            return Err(Error::malformed(format!(
                "packet {index} is {} bytes",
                packet.len()
            )));
        }
        if packet[0] != SYNC_BYTE {
            return Err(Error::BadSyncByte {
                offset,
                found: packet[0],
            });
        }

        let unit_start = packet[1] & 0x40 != 0;
        let pid = u16::from_be_bytes([packet[1] & 0x1f, packet[2]]);
        let afc = (packet[3] >> 4) & 0x03;
        let cc = packet[3] & 0x0f;

        self.report.packets += 1;
        *self.report.pid_packets.entry(pid).or_default() += 1;

        let mut payload_start = 4;
        let mut pcr = None;
        if afc & 0x02 != 0 {
            let af_len = packet[4] as usize;
            if 5 + af_len > TS_PACKET_SIZE {
                return Err(Error::malformed(format!(
                    "adaptation field of {af_len} bytes in packet {index}"
                )));
            }
            if af_len >= 7 && packet[5] & 0x10 != 0 {
                let mut field = [0u8; 6];
                field.copy_from_slice(&packet[6..12]);
                pcr = Some(Pcr::decode(&field));
            }
            payload_start = 5 + af_len;
        }

        if afc & 0x01 == 0 {
            return Ok(());
        }
        self.check_continuity(index, pid, cc);
        let payload = &packet[payload_start..];

        if pid == PAT_PID {
            self.read_pat(section_from(payload, unit_start)?)
        } else if Some(pid) == self.pmt_pid {
            self.read_pmt(section_from(payload, unit_start)?)
        } else {
            if unit_start {
                self.flush(pid)?;
                self.pending.insert(
                    pid,
                    PendingPes {
                        data: payload.to_vec(),
                        pcr,
                        start_packet: index,
                    },
                );
            } else if let Some(pending) = self.pending.get_mut(&pid) {
                pending.data.extend_from_slice(payload);
            }
            Ok(())
        }
    }

    /// Flush PES packets still being assembled and return the report.
    pub fn finish(mut self) -> Result<DemuxReport> {
        let pids: Vec<u16> = self.pending.keys().copied().collect();
        for pid in pids {
            self.flush(pid)?;
        }
        self.report.pes.sort_by_key(|p| p.start_packet);
        Ok(self.report)
    }

    fn check_continuity(&mut self, packet_index: usize, pid: u16, cc: u8) {
        if let Some(last) = self.last_cc.insert(pid, cc) {
            let expected = (last + 1) & 0x0f;
            if cc != expected {
                self.report.continuity_errors.push(ContinuityError {
                    packet_index,
                    pid,
                    expected,
                    found: cc,
                });
            }
        }
    }

    fn flush(&mut self, pid: u16) -> Result<()> {
        let Some(pending) = self.pending.remove(&pid) else {
            return Ok(());
        };
        let (header, offset) = PesHeader::parse(&pending.data)?;
        let mut payload = pending.data[offset..].to_vec();
        let mut complete = true;
        if header.packet_length != 0 {
            let declared = (header.packet_length as usize + 6).saturating_sub(offset);
            complete = declared <= payload.len();
            payload.truncate(declared);
        }
        self.report.pes.push(PesRecord {
            pid,
            kind: ElementaryStream::kind_of_pid(pid),
            stream_id: header.stream_id,
            pts: header.pts,
            dts: header.dts,
            pcr: pending.pcr,
            start_packet: pending.start_packet,
            complete,
            payload_len: payload.len(),
            payload,
        });
        Ok(())
    }

    fn read_pat(&mut self, section: &[u8]) -> Result<()> {
        let body = verify_section(section, TABLE_ID_PAT)?;
        let mut r = ByteReader::new(body);
        let transport_stream_id = r.read_uint16()?;
        r.skip(3)?;
        while r.available() >= 4 {
            let program_number = r.read_uint16()?;
            let pid = r.read_uint16()? & 0x1fff;
            if program_number == 0 {
                continue; // network PID
            }
            self.pmt_pid = Some(pid);
            let program = self.report.program.get_or_insert_with(ProgramInfo::default);
            program.transport_stream_id = transport_stream_id;
            program.program_number = program_number;
            program.pmt_pid = pid;
            break;
        }
        Ok(())
    }

    fn read_pmt(&mut self, section: &[u8]) -> Result<()> {
        let body = verify_section(section, TABLE_ID_PMT)?;
        let mut r = ByteReader::new(body);
        r.skip(5)?;
        let pcr_pid = r.read_uint16()? & 0x1fff;
        let info_len = (r.read_uint16()? & 0x0fff) as usize;
        r.skip(info_len)?;

        let mut streams = Vec::new();
        while r.available() >= 5 {
            let stream_type = r.read_uint8()?;
            let pid = r.read_uint16()? & 0x1fff;
            let es_info_len = (r.read_uint16()? & 0x0fff) as usize;
            r.skip(es_info_len)?;
            streams.push(StreamInfo { stream_type, pid });
        }

        let program = self.report.program.get_or_insert_with(ProgramInfo::default);
        program.pcr_pid = Some(pcr_pid);
        program.streams = streams;
        Ok(())
    }
}

/// Strip the pointer field from a section-carrying payload.
fn section_from(payload: &[u8], unit_start: bool) -> Result<&[u8]> {
    if !unit_start {
        return Err(Error::malformed("PSI section spanning packets"));
    }
    let mut r = ByteReader::new(payload);
    let pointer = r.read_uint8()? as usize;
    r.skip(pointer)?;
    Ok(r.remaining())
}

/// Check table id and CRC; return the bytes between the length field and the CRC.
fn verify_section(section: &[u8], table_id: u8) -> Result<&[u8]> {
    let mut r = ByteReader::new(section);
    let found = r.read_uint8()?;
    if found != table_id {
        return Err(Error::malformed(format!(
            "expected table 0x{table_id:02x}, found 0x{found:02x}"
        )));
    }
    let section_length = (r.read_uint16()? & 0x0fff) as usize;
    if section_length < 4 {
        return Err(Error::malformed("section shorter than its CRC"));
    }
    r.skip(section_length)?;

    let full = &section[..3 + section_length];
    let (data, crc) = full.split_at(full.len() - 4);
    let stored = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
    let computed = crc32_mpeg2(data);
    if stored != computed {
        return Err(Error::CrcMismatch {
            table_id,
            stored,
            computed,
        });
    }
    Ok(&data[3..])
}

/// Demux a complete buffer.
pub fn demux(data: &[u8]) -> Result<DemuxReport> {
    let mut demuxer = TsDemuxer::new();
    demuxer.push(data)?;
    demuxer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::ts::{Packetizer, Psi, AUDIO_PID, PMT_PID, VIDEO_PID};
    use assert_matches::assert_matches;
    use bytes::BytesMut;

    fn sample_stream() -> BytesMut {
        let mut out = BytesMut::new();
        Psi::new().write_to(&mut out);
        let mut p = Packetizer::new();
        p.write_frame(&Frame::video(0, true, vec![0x65; 1000]), &mut out);
        p.write_frame(&Frame::audio(10, vec![0xaa; 30]), &mut out);
        p.write_frame(&Frame::video(40, false, vec![0x41; 10]), &mut out);
        out
    }

    #[test]
    fn test_reads_program() {
        let report = demux(&sample_stream()).unwrap();
        let program = report.program.unwrap();
        assert_eq!(program.transport_stream_id, 1);
        assert_eq!(program.program_number, 1);
        assert_eq!(program.pmt_pid, PMT_PID);
        assert_eq!(program.pcr_pid, Some(VIDEO_PID));
        assert_eq!(
            program.streams,
            vec![
                StreamInfo {
                    stream_type: 0x1b,
                    pid: VIDEO_PID
                },
                StreamInfo {
                    stream_type: 0x0f,
                    pid: AUDIO_PID
                },
            ]
        );
    }

    #[test]
    fn test_reassembles_pes() {
        let report = demux(&sample_stream()).unwrap();
        assert!(report.continuity_errors.is_empty());

        let video: Vec<&PesRecord> = report.stream(StreamKind::Video).collect();
        assert_eq!(video.len(), 2);
        assert_eq!(video[0].payload, vec![0x65; 1000]);
        assert_eq!(video[0].pts, 126_000);
        assert_eq!(video[0].dts, Some(63_000));
        assert_eq!(video[0].pcr.unwrap().base, 63_000);
        assert_eq!(video[1].pts, 126_000 + 40 * 90);

        assert!(video.iter().all(|p| p.complete));
        assert!(video[0].start_packet < video[1].start_packet);

        let audio: Vec<&PesRecord> = report.stream(StreamKind::Audio).collect();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].stream_id, 0xc0);
        assert_eq!(audio[0].dts, None);
        assert_eq!(audio[0].payload_len, 30);
    }

    #[test]
    fn test_bad_sync_byte() {
        let mut data = sample_stream();
        data[TS_PACKET_SIZE] = 0x48;
        assert_matches!(
            demux(&data),
            Err(Error::BadSyncByte {
                offset: 188,
                found: 0x48
            })
        );
    }

    #[test]
    fn test_crc_mismatch() {
        let mut data = sample_stream();
        // Flip a bit in the PAT transport_stream_id.
        data[9] ^= 0x01;
        assert_matches!(
            demux(&data),
            Err(Error::CrcMismatch {
                table_id: 0x00,
                ..
            })
        );
    }

    #[test]
    fn test_detects_continuity_gap() {
        let data = sample_stream();
        // Drop the second video packet.
        let mut cut = data[..3 * TS_PACKET_SIZE].to_vec();
        cut.extend_from_slice(&data[4 * TS_PACKET_SIZE..]);
        let report = demux(&cut).unwrap();
        assert_eq!(
            report.continuity_errors,
            vec![ContinuityError {
                packet_index: 3,
                pid: VIDEO_PID,
                expected: 1,
                found: 2
            }]
        );
        let video: Vec<&PesRecord> = report.stream(StreamKind::Video).collect();
        assert!(!video[0].complete);
        assert!(video[1].complete);
    }

    #[test]
    fn test_partial_packet_buffer() {
        assert_matches!(demux(&[0x47; 100]), Err(Error::MalformedPacket(_)));
    }
}
