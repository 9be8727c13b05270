//! AAC audio tags to ADTS frames.

use crate::bits::{BitWriter, ByteReader};
use crate::frame::{Frame, StreamKind};
use crate::{Error, Result};

/// FLV sound format for AAC.
pub const SOUND_FORMAT_AAC: u8 = 10;

/// Size of an ADTS header without CRC.
pub const ADTS_HEADER_SIZE: usize = 7;

/// Largest frame the 13-bit ADTS frame length can describe.
pub const MAX_ADTS_FRAME_SIZE: usize = 0x1fff;

/// Object type written into every ADTS header (AAC LC).
const FORCED_OBJECT_TYPE: u8 = 1;

/// Fields decoded from an AudioSpecificConfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Object type as signalled; ADTS output always uses LC.
    pub object_type: u8,
    pub sampling_index: u8,
    pub channel_config: u8,
}

impl AudioSpecificConfig {
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let b1 = reader.read_uint8()?;
        let b2 = reader.read_uint8()?;
        Ok(Self {
            object_type: (b1 & 0xf8) >> 3,
            sampling_index: ((b1 & 0x07) << 1) | ((b2 & 0x80) >> 7),
            channel_config: (b2 & 0x78) >> 3,
        })
    }

    /// Build the ADTS header template with a zero frame length.
    fn adts_template(&self) -> [u8; ADTS_HEADER_SIZE] {
        let mut w = BitWriter::with_capacity(ADTS_HEADER_SIZE);
        w.put(12, 0xfff); // syncword
        w.put(1, 0); // MPEG-4
        w.put(2, 0); // layer
        w.put(1, 1); // protection absent
        w.put(2, FORCED_OBJECT_TYPE as u64);
        w.put(4, self.sampling_index as u64);
        w.put(1, 0); // private
        w.put(3, self.channel_config as u64);
        w.put(4, 0); // original, home, copyright id, copyright start
        w.put(13, 0); // frame length, patched per frame
        w.put(11, 0x7ff); // buffer fullness
        w.put(2, 0); // raw data blocks - 1

        let bytes = w.finish();
        let mut template = [0u8; ADTS_HEADER_SIZE];
        template.copy_from_slice(&bytes);
        template
    }
}

/// Per-stream AAC decoder state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AacContext {
    config: Option<AudioSpecificConfig>,
    adts_template: Option<[u8; ADTS_HEADER_SIZE]>,
}

impl AacContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sequence header has been seen.
    pub fn is_configured(&self) -> bool {
        self.adts_template.is_some()
    }

    pub fn config(&self) -> Option<&AudioSpecificConfig> {
        self.config.as_ref()
    }

    pub fn adts_template(&self) -> Option<&[u8; ADTS_HEADER_SIZE]> {
        self.adts_template.as_ref()
    }
}

/// Decode one AAC tag body.
///
/// Sequence headers update `ctx` and yield no frame. Raw frames yield one
/// ADTS frame stamped with `timestamp`. On error `ctx` is unchanged.
pub fn decode_tag(
    ctx: &mut AacContext,
    timestamp: u32,
    reader: &mut ByteReader<'_>,
) -> Result<Option<Frame>> {
    let sound = reader.read_uint8()?;
    let format = sound >> 4;
    if format != SOUND_FORMAT_AAC {
        return Err(Error::UnsupportedCodec {
            kind: StreamKind::Audio,
            codec_id: format,
        });
    }

    let packet_type = reader.read_uint8()?;
    if packet_type == 0 {
        let config = AudioSpecificConfig::parse(reader)?;
        tracing::debug!(
            object_type = config.object_type,
            sampling_index = config.sampling_index,
            channels = config.channel_config,
            "AAC sequence header"
        );
        ctx.adts_template = Some(config.adts_template());
        ctx.config = Some(config);
        return Ok(None);
    }

    let template = ctx.adts_template.ok_or(Error::MissingSequenceHeader)?;
    let raw = reader.remaining();
    let frame_size = ADTS_HEADER_SIZE + raw.len();
    if frame_size > MAX_ADTS_FRAME_SIZE {
        return Err(Error::AdtsFrameTooLarge { size: frame_size });
    }
    let raw = reader.read_bytes(raw.len())?;

    let mut payload = Vec::with_capacity(frame_size);
    payload.extend_from_slice(&template);
    patch_frame_length(&mut payload[..ADTS_HEADER_SIZE], frame_size);
    payload.extend_from_slice(raw);

    tracing::trace!(timestamp, size = frame_size, "AAC frame");
    Ok(Some(Frame::audio(timestamp, payload)))
}

/// Write a 13-bit frame length into bytes 3..=5 of an ADTS header.
fn patch_frame_length(header: &mut [u8], size: usize) {
    let size = size as u16;
    header[3] = (header[3] & 0xfc) | ((size & 0x1800) >> 11) as u8;
    header[4] = ((size & 0x07f8) >> 3) as u8;
    header[5] = (header[5] & 0x1f) | (((size & 0x07) << 5) as u8);
}

/// Read the 13-bit frame length back out of an ADTS header.
pub fn adts_frame_length(header: &[u8]) -> usize {
    (((header[3] & 0x03) as usize) << 11) | ((header[4] as usize) << 3) | ((header[5] >> 5) as usize)
}
