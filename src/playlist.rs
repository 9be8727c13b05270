//! HLS media playlist for TS segments.

use std::fmt::Write;

/// A segment entry in the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI, relative to the playlist.
    pub uri: String,
}

/// EVENT media playlist for one live stream. Entries are only ever
/// appended, so the media sequence stays 0.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    pub segments: Vec<SegmentEntry>,
    /// Whether the stream has ended.
    pub ended: bool,
}

impl MediaPlaylist {
    /// Create an open playlist for a stream that is still running.
    pub fn event() -> Self {
        Self {
            segments: Vec::new(),
            ended: false,
        }
    }

    pub fn push(&mut self, duration: f64, uri: impl Into<String>) {
        self.segments.push(SegmentEntry {
            duration,
            uri: uri.into(),
        });
    }

    /// Close the playlist; players stop polling once they see the end tag.
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Longest segment rounded up to whole seconds, at least 1.
    pub fn target_duration(&self) -> u32 {
        self.segments
            .iter()
            .map(|s| s.duration.ceil() as u32)
            .max()
            .unwrap_or(0)
            .max(1)
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "#EXTM3U").unwrap();
        writeln!(out, "#EXT-X-VERSION:3").unwrap();
        writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration()).unwrap();
        writeln!(out, "#EXT-X-MEDIA-SEQUENCE:0").unwrap();
        writeln!(out, "#EXT-X-PLAYLIST-TYPE:EVENT").unwrap();

        for segment in &self.segments {
            writeln!(out, "#EXTINF:{:.3},", segment.duration).unwrap();
            writeln!(out, "{}", segment.uri).unwrap();
        }

        if self.ended {
            writeln!(out, "#EXT-X-ENDLIST").unwrap();
        }

        out
    }
}
