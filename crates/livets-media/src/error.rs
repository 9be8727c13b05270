//! Error types for livets-media.

use crate::frame::StreamKind;
use std::io;
use thiserror::Error;

/// Result type for livets-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for livets-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading an FLV file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read requested more bytes than remain in the buffer.
    #[error("Unexpected end of input: need {need} bytes, have {have}")]
    EndOfInput { need: usize, have: usize },

    /// Audio format nibble is not AAC, or video codec id is not AVC.
    #[error("Unsupported {kind} codec id: {codec_id}")]
    UnsupportedCodec { kind: StreamKind, codec_id: u8 },

    /// AVCDecoderConfigurationRecord with a version other than 1.
    #[error("Bad AVCDecoderConfigurationRecord version: {0}")]
    BadConfigVersion(u8),

    /// Raw AAC data arrived before any AAC sequence header.
    #[error("Raw AAC frame before AAC sequence header")]
    MissingSequenceHeader,

    /// NALU data arrived before any AVCDecoderConfigurationRecord.
    #[error("NALU data before AVCDecoderConfigurationRecord")]
    MissingConfigRecord,

    /// Declared NALU length does not match the bytes left in the tag.
    #[error("Bad NALU length: declared {declared}, available {available}")]
    BadNaluLength { declared: usize, available: usize },

    /// AVC packet type other than config record, NALU data, or end of sequence.
    #[error("Unsupported AVC packet type: {0}")]
    BadAvcPacketType(u8),

    /// FLV tag type other than audio, video, or script data.
    #[error("Unsupported FLV tag type: {0}")]
    UnsupportedTagType(u8),

    /// Raw AAC payload too large for the 13-bit ADTS frame length.
    #[error("AAC frame of {size} bytes does not fit an ADTS header")]
    AdtsFrameTooLarge { size: usize },

    /// FLV file does not start with the `FLV` signature.
    #[error("Bad FLV signature: {0:02x?}")]
    BadFlvSignature([u8; 3]),

    /// TS packet does not start with 0x47.
    #[error("Bad TS sync byte 0x{found:02x} at offset {offset}")]
    BadSyncByte { offset: usize, found: u8 },

    /// PSI section CRC does not match its contents.
    #[error("CRC mismatch in table 0x{table_id:02x}: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    CrcMismatch {
        table_id: u8,
        stored: u32,
        computed: u32,
    },

    /// Structurally invalid TS packet, PES, or PSI section.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),
}

impl Error {
    /// Create a malformed packet error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPacket(msg.into())
    }
}

/// A tag rejected by the transmuxer, with the position it was rejected at.
///
/// The codec contexts and frame buffer are left exactly as they were before
/// the tag arrived.
#[derive(Debug, Error)]
#[error("{} tag #{index} rejected at byte {offset}: {source}", kind_label(.kind))]
pub struct TagError {
    /// Zero-based index of the tag within the stream.
    pub index: u64,
    /// Stream the tag belongs to, when the tag type was recognized.
    pub kind: Option<StreamKind>,
    /// Byte offset within the tag buffer where decoding stopped.
    pub offset: usize,
    #[source]
    pub source: Error,
}

fn kind_label(kind: &Option<StreamKind>) -> &'static str {
    match kind {
        Some(StreamKind::Audio) => "audio",
        Some(StreamKind::Video) => "video",
        None => "unknown",
    }
}
