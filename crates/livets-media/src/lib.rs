//! Livets-Media: FLV tag decoding, MPEG-TS packetization and live segmenting
//!
//! This crate is the transmuxer core of livets. It takes FLV tags as an RTMP
//! ingest delivers them and produces MPEG transport stream segments ready for
//! segmented HTTP delivery. It performs no network or file output; finished
//! segments are handed back to the caller as byte buffers.
//!
//! # Modules
//!
//! - `bits` - Bounds-checked byte reader and MSB-first bit writer
//! - `flv` - FLV tag headers, AAC and H.264 tag decoders, FLV file reader
//! - `frame` - Normalized frames and the coalescing frame buffer
//! - `ts` - CRC-32, PAT/PMT, PES and TS packet synthesis, verification demuxer
//! - `segmenter` - Keyframe-aligned segment boundaries
//! - `transmux` - Per-stream pipeline tying the above together
//!
//! # Architecture
//!
//! Each live stream owns one [`Transmuxer`]. For every tag:
//!
//! 1. The 11-byte tag header is parsed and the body is dispatched on tag type
//! 2. AAC bodies become ADTS frames; H.264 bodies become Annex B NALUs
//! 3. Frames are buffered, coalescing small runs of same-stream frames
//! 4. A video keyframe one interval past the segment start closes the
//!    segment: buffered frames are drained, wrapped in PES, sliced into TS
//!    packets behind a PAT and PMT, and returned as a [`Segment`]
//!
//! ```
//! use livets_media::{Transmuxer, TransmuxOptions};
//!
//! let mut transmuxer = Transmuxer::new(TransmuxOptions::default());
//! // AAC sequence header: LC, 44.1 kHz, stereo.
//! let tag = [8, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0xaf, 0x00, 0x12, 0x10];
//! assert!(transmuxer.push_tag(&tag).unwrap().is_none());
//! assert!(transmuxer.finish().is_none());
//! ```

pub mod bits;
pub mod error;
pub mod flv;
pub mod frame;
pub mod segmenter;
pub mod transmux;
pub mod ts;

pub use error::{Error, Result, TagError};
pub use flv::{AvcOptions, FlvReader};
pub use frame::{Frame, FrameBuffer, StreamKind};
pub use segmenter::{Segment, Segmenter, DEFAULT_SEGMENT_INTERVAL_MS};
pub use transmux::{TransmuxOptions, Transmuxer};
pub use ts::{DemuxReport, TsDemuxer};
