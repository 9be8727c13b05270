//! H.264 video tags to Annex B NALUs.
//!
//! FLV carries H.264 in AVCC form: an AVCDecoderConfigurationRecord with the
//! parameter sets, then length-prefixed NALUs. Transport streams want Annex B,
//! where every NALU is introduced by a `00 00 00 01` start code.

use super::START_CODE;
use crate::bits::ByteReader;
use crate::frame::{Frame, StreamKind};
use crate::{Error, Result};

/// FLV video codec id for AVC.
pub const CODEC_ID_AVC: u8 = 7;

/// FLV video frame type for keyframes.
const FRAME_TYPE_KEY: u8 = 1;

const PACKET_CONFIG_RECORD: u8 = 0;
const PACKET_NALU: u8 = 1;
const PACKET_END_OF_SEQUENCE: u8 = 2;

/// Optional behaviors of the H.264 decoder. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvcOptions {
    /// Treat a NALU tag body as a run of length-prefixed NALUs instead of
    /// exactly one.
    pub multi_nalu: bool,
    /// Prefix keyframes with the stored SPS and PPS.
    pub repeat_parameter_sets: bool,
}

/// Per-stream H.264 decoder state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvcContext {
    options: AvcOptions,
    /// Width of NALU length fields; 0 until a config record arrives.
    nalu_length_size: usize,
    /// Start-code prefixed.
    sps: Vec<Vec<u8>>,
    /// Start-code prefixed.
    pps: Vec<Vec<u8>>,
}

impl AvcContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: AvcOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Whether a config record has been seen.
    pub fn is_configured(&self) -> bool {
        self.nalu_length_size != 0
    }

    pub fn nalu_length_size(&self) -> usize {
        self.nalu_length_size
    }

    /// All SPS followed by all PPS, each with a start code.
    pub fn parameter_sets(&self) -> Vec<u8> {
        self.sps.iter().chain(self.pps.iter()).flatten().copied().collect()
    }
}

struct ConfigRecord {
    profile: u8,
    level: u8,
    nalu_length_size: usize,
    sps: Vec<Vec<u8>>,
    pps: Vec<Vec<u8>>,
}

impl ConfigRecord {
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let version = reader.read_uint8()?;
        if version != 1 {
            return Err(Error::BadConfigVersion(version));
        }
        let profile = reader.read_uint8()?;
        reader.skip(1)?; // profile compatibility
        let level = reader.read_uint8()?;
        let nalu_length_size = (reader.read_uint8()? & 0x03) as usize + 1;

        let sps_count = reader.read_uint8()? & 0x1f;
        let sps = read_parameter_sets(reader, sps_count)?;
        let pps_count = reader.read_uint8()?;
        let pps = read_parameter_sets(reader, pps_count)?;

        Ok(Self {
            profile,
            level,
            nalu_length_size,
            sps,
            pps,
        })
    }
}

fn read_parameter_sets(reader: &mut ByteReader<'_>, count: u8) -> Result<Vec<Vec<u8>>> {
    (0..count)
        .map(|_| {
            let len = reader.read_uint16()? as usize;
            let nalu = reader.read_bytes(len)?;
            let mut out = Vec::with_capacity(START_CODE.len() + len);
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nalu);
            Ok(out)
        })
        .collect()
}

/// Decode one H.264 tag body.
///
/// Config records replace the context and yield one keyframe holding the
/// parameter sets. NALU tags yield one frame, or nothing when a multi-NALU
/// body is empty. End-of-sequence tags yield nothing. On error `ctx` is
/// unchanged.
pub fn decode_tag(
    ctx: &mut AvcContext,
    timestamp: u32,
    reader: &mut ByteReader<'_>,
) -> Result<Option<Frame>> {
    let flags = reader.read_uint8()?;
    let codec_id = flags & 0x0f;
    if codec_id != CODEC_ID_AVC {
        return Err(Error::UnsupportedCodec {
            kind: StreamKind::Video,
            codec_id,
        });
    }
    let is_keyframe = flags >> 4 == FRAME_TYPE_KEY;

    let packet_type = reader.read_uint8()?;
    let raw_cts = reader.read_uint24()?;
    let composition_time = ((raw_cts << 8) as i32) >> 8;

    match packet_type {
        PACKET_CONFIG_RECORD => {
            let record = ConfigRecord::parse(reader)?;
            tracing::debug!(
                profile = record.profile,
                level = record.level,
                nalu_length_size = record.nalu_length_size,
                sps = record.sps.len(),
                pps = record.pps.len(),
                "AVC decoder configuration record"
            );
            ctx.nalu_length_size = record.nalu_length_size;
            ctx.sps = record.sps;
            ctx.pps = record.pps;
            Ok(Some(Frame::video(timestamp, true, ctx.parameter_sets())))
        }
        PACKET_NALU => {
            if ctx.nalu_length_size == 0 {
                return Err(Error::MissingConfigRecord);
            }
            let mut payload = if is_keyframe && ctx.options.repeat_parameter_sets {
                ctx.parameter_sets()
            } else {
                Vec::with_capacity(START_CODE.len() + reader.available())
            };
            if ctx.options.multi_nalu {
                if reader.available() == 0 {
                    tracing::trace!(timestamp, "empty AVC NALU tag");
                    return Ok(None);
                }
                while reader.available() > 0 {
                    read_nalu(reader, ctx.nalu_length_size, false, &mut payload)?;
                }
            } else {
                read_nalu(reader, ctx.nalu_length_size, true, &mut payload)?;
            }
            tracing::trace!(
                timestamp,
                composition_time,
                is_keyframe,
                size = payload.len(),
                "AVC frame"
            );
            Ok(Some(Frame::video(timestamp, is_keyframe, payload)))
        }
        PACKET_END_OF_SEQUENCE => {
            tracing::debug!(timestamp, "AVC end of sequence");
            Ok(None)
        }
        other => Err(Error::BadAvcPacketType(other)),
    }
}

/// Read one length-prefixed NALU and append it with a start code.
///
/// With `exact`, the NALU must consume the rest of the input.
fn read_nalu(
    reader: &mut ByteReader<'_>,
    length_size: usize,
    exact: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    let declared = reader.read_uint_n(length_size)? as usize;
    let available = reader.available();
    if declared > available || (exact && declared != available) {
        return Err(Error::BadNaluLength {
            declared,
            available,
        });
    }
    out.extend_from_slice(&START_CODE);
    out.extend_from_slice(reader.read_bytes(declared)?);
    Ok(())
}
