//! Normalized media frames and the coalescing frame buffer.

use std::fmt;

/// Combined payload size a coalesced entry must stay below.
pub const COALESCE_LIMIT: usize = 4100;

/// Elementary stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum StreamKind {
    Audio,
    Video,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Audio => f.write_str("audio"),
            StreamKind::Video => f.write_str("video"),
        }
    }
}

/// One media unit ready for transport: an ADTS frame, or Annex B NALUs.
///
/// Audio frames are always independently decodable and carry
/// `is_keyframe = true`. Only video keyframes split coalesced runs and open
/// segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: StreamKind,
    pub is_keyframe: bool,
    /// Milliseconds.
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn audio(timestamp: u32, payload: Vec<u8>) -> Self {
        Self {
            kind: StreamKind::Audio,
            is_keyframe: true,
            timestamp,
            payload,
        }
    }

    pub fn video(timestamp: u32, is_keyframe: bool, payload: Vec<u8>) -> Self {
        Self {
            kind: StreamKind::Video,
            is_keyframe,
            timestamp,
            payload,
        }
    }

    /// Whether this frame is a video keyframe.
    pub fn is_video_keyframe(&self) -> bool {
        self.kind == StreamKind::Video && self.is_keyframe
    }
}

/// Append-and-coalesce buffer of frames awaiting packetization.
///
/// A non-keyframe is merged into the most recent entry when that entry has
/// the same stream kind and the merged payload stays below
/// [`COALESCE_LIMIT`]. Entries are never reordered.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    entries: Vec<Frame>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a frame, coalescing it into the last entry when allowed.
    pub fn append(&mut self, frame: Frame) {
        if !frame.is_video_keyframe() {
            if let Some(last) = self.entries.last_mut() {
                if last.kind == frame.kind
                    && last.payload.len() + frame.payload.len() < COALESCE_LIMIT
                {
                    last.payload.extend_from_slice(&frame.payload);
                    return;
                }
            }
        }
        self.entries.push(frame);
    }

    /// Remove and return every entry with `timestamp <= through`, in append order.
    pub fn drain_through(&mut self, through: u32) -> Vec<Frame> {
        let (drained, kept): (Vec<Frame>, Vec<Frame>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|f| f.timestamp <= through);
        self.entries = kept;
        drained
    }

    /// Remove and return every entry.
    pub fn drain_all(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.entries.iter().map(|f| f.payload.len()).sum()
    }

    /// Buffered entries, oldest first.
    pub fn entries(&self) -> &[Frame] {
        &self.entries
    }
}
