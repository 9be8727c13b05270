use livets_media::{AvcOptions, TransmuxOptions, DEFAULT_SEGMENT_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Core pipeline options derived from the segmenter and decoder sections.
    pub fn transmux_options(&self) -> TransmuxOptions {
        TransmuxOptions {
            segment_interval_ms: self.segmenter.interval_ms,
            avc: AvcOptions {
                multi_nalu: self.decoder.multi_nalu,
                repeat_parameter_sets: self.segmenter.repeat_parameter_sets,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmenterConfig {
    /// Minimum segment length in milliseconds; segments close on the first
    /// video keyframe past it.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u32,

    /// Prepend SPS/PPS to every keyframe.
    #[serde(default)]
    pub repeat_parameter_sets: bool,
}

fn default_interval_ms() -> u32 {
    DEFAULT_SEGMENT_INTERVAL_MS
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            repeat_parameter_sets: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecoderConfig {
    /// Accept several length-prefixed NALUs per video tag.
    #[serde(default = "default_true")]
    pub multi_nalu: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { multi_nalu: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_segment_prefix")]
    pub segment_prefix: String,

    /// Write an HLS media playlist next to the segments
    #[serde(default = "default_true")]
    pub playlist: bool,

    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,
}

fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./segments")
}
fn default_segment_prefix() -> String {
    "segment".to_string()
}
fn default_playlist_name() -> String {
    "index.m3u8".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            segment_prefix: default_segment_prefix(),
            playlist: true,
            playlist_name: default_playlist_name(),
        }
    }
}
