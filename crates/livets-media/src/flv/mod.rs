//! FLV tag parsing.
//!
//! - [`TagHeader`] - the 11-byte header in front of every tag
//! - [`aac`] - AAC audio tags to ADTS frames
//! - [`avc`] - H.264 video tags to Annex B NALUs
//! - [`FlvReader`] - splits an FLV file into complete tag buffers

pub mod aac;
pub mod avc;
mod file;

pub use aac::AacContext;
pub use avc::{AvcContext, AvcOptions};
pub use file::{FlvHeader, FlvReader};

use crate::bits::ByteReader;
use crate::{Error, Result};

/// Size of an FLV tag header in bytes.
pub const TAG_HEADER_SIZE: usize = 11;

/// Annex B start code prepended to every emitted NALU.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// FLV tag type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Audio,
    Video,
    Script,
    Other(u8),
}

impl TagType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            8 => TagType::Audio,
            9 => TagType::Video,
            18 => TagType::Script,
            other => TagType::Other(other),
        }
    }
}

/// Parsed FLV tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub tag_type: TagType,
    /// Declared body size. Not used to bound the body.
    pub data_size: u32,
    /// Milliseconds, with the extension byte as the high 8 bits.
    pub timestamp: u32,
    pub stream_id: u32,
}

impl TagHeader {
    /// Read the 11-byte tag header.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        // Reject truncated headers before consuming anything.
        if reader.available() < TAG_HEADER_SIZE {
            return Err(Error::EndOfInput {
                need: TAG_HEADER_SIZE,
                have: reader.available(),
            });
        }

        // Upper bits are the filter/reserved flags.
        let tag_type = TagType::from_u8(reader.read_uint8()? & 0x1f);
        let data_size = reader.read_uint24()?;
        let low = reader.read_uint24()?;
        let ext = reader.read_uint8()?;
        let stream_id = reader.read_uint24()?;

        Ok(Self {
            tag_type,
            data_size,
            timestamp: ((ext as u32) << 24) | low,
            stream_id,
        })
    }
}
