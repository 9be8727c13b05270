//! Keyframe-aligned segmenting.
//!
//! Frames accumulate in a [`FrameBuffer`] until a video keyframe arrives at
//! least one segment interval after the keyframe that opened the current
//! segment. Everything buffered up to that keyframe's timestamp is then
//! packetized behind a fresh PAT and PMT, and the keyframe opens the next
//! segment.

use crate::frame::{Frame, FrameBuffer, StreamKind};
use crate::ts::{Packetizer, Psi, TS_PACKET_SIZE};
use bytes::{Bytes, BytesMut};

/// Default segment interval in milliseconds.
pub const DEFAULT_SEGMENT_INTERVAL_MS: u32 = 3000;

/// A finished transport stream segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based position in the stream.
    pub sequence: u64,
    /// Milliseconds.
    pub start_timestamp: u32,
    /// Milliseconds. The keyframe that closed the segment. For the final
    /// segment, the latest frame plus its stream's last frame interval.
    pub end_timestamp: u32,
    /// Buffered entries drained into this segment.
    pub frame_count: usize,
    /// TS packets including PAT and PMT.
    pub packet_count: usize,
    pub data: Bytes,
}

impl Segment {
    pub fn duration_ms(&self) -> u32 {
        self.end_timestamp.saturating_sub(self.start_timestamp)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }
}

/// Last timestamp and frame spacing seen on one stream.
#[derive(Debug, Clone, Copy, Default)]
struct StreamClock {
    last: Option<u32>,
    interval: Option<u32>,
}

impl StreamClock {
    fn observe(&mut self, timestamp: u32) {
        match self.last {
            Some(last) if timestamp > last => {
                self.interval = Some(timestamp - last);
                self.last = Some(timestamp);
            }
            Some(_) => {}
            None => self.last = Some(timestamp),
        }
    }

    /// When the latest frame stops presenting, if known.
    fn end(&self) -> Option<u32> {
        let last = self.last?;
        Some(last.saturating_add(self.interval.unwrap_or(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingFirstKeyframe,
    Accumulating { segment_start: u32 },
}

/// Splits a frame sequence into keyframe-aligned TS segments.
#[derive(Debug)]
pub struct Segmenter {
    interval_ms: u32,
    buffer: FrameBuffer,
    packetizer: Packetizer,
    psi: Psi,
    state: State,
    next_sequence: u64,
    audio_clock: StreamClock,
    video_clock: StreamClock,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_INTERVAL_MS)
    }
}

impl Segmenter {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            buffer: FrameBuffer::new(),
            packetizer: Packetizer::new(),
            psi: Psi::new(),
            state: State::AwaitingFirstKeyframe,
            next_sequence: 0,
            audio_clock: StreamClock::default(),
            video_clock: StreamClock::default(),
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Timestamp of the keyframe that opened the current segment.
    pub fn segment_start(&self) -> Option<u32> {
        match self.state {
            State::AwaitingFirstKeyframe => None,
            State::Accumulating { segment_start } => Some(segment_start),
        }
    }

    /// Entries waiting for the next segment.
    pub fn buffered(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Buffer a frame, returning a segment when the frame closes one.
    pub fn push(&mut self, frame: Frame) -> Option<Segment> {
        match frame.kind {
            StreamKind::Audio => self.audio_clock.observe(frame.timestamp),
            StreamKind::Video => self.video_clock.observe(frame.timestamp),
        }

        let mut finished = None;
        if frame.is_video_keyframe() {
            match self.state {
                State::AwaitingFirstKeyframe => {
                    tracing::debug!(timestamp = frame.timestamp, "first keyframe");
                    self.state = State::Accumulating {
                        segment_start: frame.timestamp,
                    };
                }
                State::Accumulating { segment_start }
                    if frame.timestamp.saturating_sub(segment_start) >= self.interval_ms =>
                {
                    tracing::debug!(
                        start = segment_start,
                        boundary = frame.timestamp,
                        "segment boundary"
                    );
                    let frames = self.buffer.drain_through(frame.timestamp);
                    finished = self.build(frames, segment_start, frame.timestamp);
                    self.state = State::Accumulating {
                        segment_start: frame.timestamp,
                    };
                }
                State::Accumulating { .. } => {}
            }
        }
        self.buffer.append(frame);
        finished
    }

    /// Flush everything still buffered as a final segment.
    ///
    /// No later keyframe bounds the final segment, so its end is the latest
    /// frame extended by that stream's last observed frame interval.
    pub fn finish(&mut self) -> Option<Segment> {
        let frames = self.buffer.drain_all();
        let latest = frames.iter().map(|f| f.timestamp).max()?;
        let start = match self.state {
            State::Accumulating { segment_start } => segment_start,
            State::AwaitingFirstKeyframe => frames.iter().map(|f| f.timestamp).min()?,
        };
        let end = [self.audio_clock.end(), self.video_clock.end()]
            .into_iter()
            .flatten()
            .fold(latest, u32::max);

        self.state = State::AwaitingFirstKeyframe;
        self.audio_clock = StreamClock::default();
        self.video_clock = StreamClock::default();
        self.build(frames, start.min(latest), end)
    }

    fn build(&mut self, frames: Vec<Frame>, start: u32, end: u32) -> Option<Segment> {
        if frames.is_empty() {
            return None;
        }
        let payload: usize = frames.iter().map(|f| f.payload.len()).sum();
        let mut data = BytesMut::with_capacity(payload + payload / 8 + 4 * TS_PACKET_SIZE);

        self.psi.write_to(&mut data);
        self.packetizer.reset_counters();
        let mut packet_count = 2;
        for frame in &frames {
            packet_count += self.packetizer.write_frame(frame, &mut data);
        }

        let segment = Segment {
            sequence: self.next_sequence,
            start_timestamp: start,
            end_timestamp: end,
            frame_count: frames.len(),
            packet_count,
            data: data.freeze(),
        };
        self.next_sequence += 1;

        tracing::info!(
            sequence = segment.sequence,
            duration_ms = segment.duration_ms(),
            frames = segment.frame_count,
            packets = segment.packet_count,
            bytes = segment.data.len(),
            "segment ready"
        );
        Some(segment)
    }
}
