//! Where finished segments go.

use crate::config::OutputConfig;
use crate::playlist::MediaPlaylist;
use anyhow::{Context, Result};
use livets_media::Segment;
use std::path::{Path, PathBuf};

/// Receives the segments of one stream, in order.
pub trait SegmentSink {
    fn write_segment(&mut self, segment: &Segment) -> Result<()>;

    /// Called once after the final segment.
    fn finish(&mut self) -> Result<()>;
}

/// Writes `<prefix>_<sequence>.ts` files into a directory and keeps a live
/// HLS playlist next to them.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    segment_prefix: String,
    playlist_path: Option<PathBuf>,
    playlist: MediaPlaylist,
}

impl DirectorySink {
    /// Create the stream directory `<output.dir>/<stream>`.
    pub fn create(output: &OutputConfig, stream: &str) -> Result<Self> {
        let dir = output.dir.join(stream);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let playlist_path = output
            .playlist
            .then(|| dir.join(&output.playlist_name));

        Ok(Self {
            dir,
            segment_prefix: output.segment_prefix.clone(),
            playlist_path,
            playlist: MediaPlaylist::event(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segment_file_name(&self, sequence: u64) -> String {
        format!("{}_{:05}.ts", self.segment_prefix, sequence)
    }

    fn write_playlist(&self) -> Result<()> {
        match &self.playlist_path {
            Some(path) => write_atomic(path, self.playlist.render().as_bytes()),
            None => Ok(()),
        }
    }
}

impl SegmentSink for DirectorySink {
    fn write_segment(&mut self, segment: &Segment) -> Result<()> {
        let name = self.segment_file_name(segment.sequence);
        let path = self.dir.join(&name);
        write_atomic(&path, &segment.data)?;

        self.playlist.push(segment.duration_secs(), name);
        self.write_playlist()?;

        tracing::debug!(
            "Wrote {:?} ({} bytes, {:.3}s)",
            path,
            segment.data.len(),
            segment.duration_secs()
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.playlist.end();
        self.write_playlist()
    }
}

/// Write through a temporary file so readers never see a partial file.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data).with_context(|| format!("Failed to write {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to rename {:?}", tmp))?;
    Ok(())
}
