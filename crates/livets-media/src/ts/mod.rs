//! MPEG transport stream synthesis.
//!
//! - [`crc`] - CRC-32/MPEG-2 for PSI sections
//! - [`psi`] - fixed PAT and PMT packets
//! - [`pes`] - PES headers and 33-bit timestamps
//! - [`packet`] - slicing PES packets into 188-byte TS packets
//! - [`demux`] - verification demuxer, the inverse of the above

pub mod crc;
pub mod demux;
pub mod packet;
pub mod pes;
pub mod psi;

pub use demux::{DemuxReport, TsDemuxer};
pub use packet::{ContinuityCounters, Packetizer};
pub use psi::Psi;

use crate::frame::StreamKind;

/// Size of every TS packet.
pub const TS_PACKET_SIZE: usize = 188;

/// First byte of every TS packet.
pub const SYNC_BYTE: u8 = 0x47;

/// Largest representable PID.
pub const MAX_PID: u16 = 0x1fff;

pub const PAT_PID: u16 = 0x0000;
pub const PMT_PID: u16 = 0x1000;
pub const VIDEO_PID: u16 = 0x0100;
pub const AUDIO_PID: u16 = 0x0101;

pub const PROGRAM_NUMBER: u16 = 1;
pub const TRANSPORT_STREAM_ID: u16 = 1;

/// PID, PES stream id and PMT stream type of one elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementaryStream {
    pub pid: u16,
    pub stream_id: u8,
    pub stream_type: u8,
}

impl ElementaryStream {
    pub const VIDEO: Self = Self {
        pid: VIDEO_PID,
        stream_id: 0xe0,
        stream_type: 0x1b,
    };

    pub const AUDIO: Self = Self {
        pid: AUDIO_PID,
        stream_id: 0xc0,
        stream_type: 0x0f,
    };

    pub fn for_kind(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Video => Self::VIDEO,
            StreamKind::Audio => Self::AUDIO,
        }
    }

    /// Stream kind carried on `pid`, if it is one of ours.
    pub fn kind_of_pid(pid: u16) -> Option<StreamKind> {
        match pid {
            VIDEO_PID => Some(StreamKind::Video),
            AUDIO_PID => Some(StreamKind::Audio),
            _ => None,
        }
    }
}
