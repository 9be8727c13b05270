//! One live stream's FLV-to-TS pipeline.

use crate::bits::ByteReader;
use crate::error::TagError;
use crate::flv::{aac, avc, AacContext, AvcContext, AvcOptions, TagHeader, TagType};
use crate::frame::StreamKind;
use crate::segmenter::{Segment, Segmenter, DEFAULT_SEGMENT_INTERVAL_MS};
use crate::Error;

/// Construction parameters for a [`Transmuxer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmuxOptions {
    pub segment_interval_ms: u32,
    pub avc: AvcOptions,
}

impl Default for TransmuxOptions {
    fn default() -> Self {
        Self {
            segment_interval_ms: DEFAULT_SEGMENT_INTERVAL_MS,
            avc: AvcOptions::default(),
        }
    }
}

/// Turns FLV tags, in arrival order, into TS segments.
///
/// Each live stream gets its own instance; nothing is shared between
/// instances.
#[derive(Debug)]
pub struct Transmuxer {
    audio: AacContext,
    video: AvcContext,
    segmenter: Segmenter,
    tags: u64,
}

impl Default for Transmuxer {
    fn default() -> Self {
        Self::new(TransmuxOptions::default())
    }
}

impl Transmuxer {
    pub fn new(options: TransmuxOptions) -> Self {
        Self {
            audio: AacContext::new(),
            video: AvcContext::with_options(options.avc),
            segmenter: Segmenter::new(options.segment_interval_ms),
            tags: 0,
        }
    }

    /// Tags submitted so far, including rejected ones.
    pub fn tags_seen(&self) -> u64 {
        self.tags
    }

    pub fn audio_context(&self) -> &AacContext {
        &self.audio
    }

    pub fn video_context(&self) -> &AvcContext {
        &self.video
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Decode one complete FLV tag (11-byte header plus body).
    ///
    /// Returns the segment this tag closed, if any. A rejected tag leaves
    /// the pipeline as it was; the caller may log it and keep going.
    pub fn push_tag(&mut self, tag: &[u8]) -> Result<Option<Segment>, TagError> {
        let index = self.tags;
        self.tags += 1;

        let mut reader = ByteReader::new(tag);
        let header = TagHeader::read(&mut reader).map_err(|source| TagError {
            index,
            kind: None,
            offset: reader.position(),
            source,
        })?;

        let (kind, decoded) = match header.tag_type {
            TagType::Audio => (
                StreamKind::Audio,
                aac::decode_tag(&mut self.audio, header.timestamp, &mut reader),
            ),
            TagType::Video => (
                StreamKind::Video,
                avc::decode_tag(&mut self.video, header.timestamp, &mut reader),
            ),
            TagType::Script => {
                tracing::trace!(index, "skipping script data tag");
                return Ok(None);
            }
            TagType::Other(tag_type) => {
                return Err(TagError {
                    index,
                    kind: None,
                    offset: reader.position(),
                    source: Error::UnsupportedTagType(tag_type),
                });
            }
        };

        let frame = decoded.map_err(|source| TagError {
            index,
            kind: Some(kind),
            offset: reader.position(),
            source,
        })?;
        Ok(frame.and_then(|frame| self.segmenter.push(frame)))
    }

    /// End of stream: flush the final segment.
    pub fn finish(&mut self) -> Option<Segment> {
        tracing::debug!(tags = self.tags, "end of stream");
        self.segmenter.finish()
    }
}
