//! Per-stream transmux workers.
//!
//! Each input gets its own [`Transmuxer`] on its own blocking task; nothing
//! is shared between streams.

use crate::config::Config;
use crate::storage::{DirectorySink, SegmentSink};
use anyhow::{Context, Result};
use livets_media::{FlvReader, TransmuxOptions, Transmuxer};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// What one stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub name: String,
    pub tags: u64,
    pub dropped_tags: u64,
    pub segments: u64,
    pub bytes: u64,
    pub duration_ms: u64,
}

/// Feed tags through a fresh transmuxer into `sink`.
///
/// Rejected tags are logged and skipped. An error reading the tag source
/// ends the stream early but still flushes what was buffered.
pub fn transmux_stream<I, S>(
    name: &str,
    tags: I,
    options: TransmuxOptions,
    sink: &mut S,
) -> Result<StreamSummary>
where
    I: IntoIterator<Item = livets_media::Result<Vec<u8>>>,
    S: SegmentSink,
{
    let mut transmuxer = Transmuxer::new(options);
    let mut summary = StreamSummary {
        name: name.to_string(),
        ..StreamSummary::default()
    };

    for tag in tags {
        let tag = match tag {
            Ok(tag) => tag,
            Err(e) => {
                tracing::warn!(stream = name, "Input ended early: {}", e);
                break;
            }
        };
        match transmuxer.push_tag(&tag) {
            Ok(Some(segment)) => {
                summary.segments += 1;
                summary.bytes += segment.data.len() as u64;
                summary.duration_ms += segment.duration_ms() as u64;
                sink.write_segment(&segment)?;
            }
            Ok(None) => {}
            Err(e) => {
                summary.dropped_tags += 1;
                tracing::warn!(
                    stream = name,
                    index = e.index,
                    kind = ?e.kind,
                    offset = e.offset,
                    "Dropping tag: {}",
                    e.source
                );
            }
        }
    }

    tracing::debug!(
        stream = name,
        audio_configured = transmuxer.audio_context().is_configured(),
        video_configured = transmuxer.video_context().is_configured(),
        "End of input"
    );
    if let Some(segment) = transmuxer.finish() {
        summary.segments += 1;
        summary.bytes += segment.data.len() as u64;
        summary.duration_ms += segment.duration_ms() as u64;
        sink.write_segment(&segment)?;
    }
    sink.finish()?;

    summary.tags = transmuxer.tags_seen();
    Ok(summary)
}

/// Stream name for an input file: its stem.
pub fn stream_name(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("Cannot derive a stream name from {:?}", input))
}

/// Transmux one FLV file into `<output.dir>/<stem>/`.
pub fn run_file(input: &Path, config: &Config) -> Result<StreamSummary> {
    let name = stream_name(input)?;
    let file = File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
    let reader = FlvReader::new(BufReader::new(file))
        .with_context(|| format!("Not an FLV file: {:?}", input))?;
    tracing::info!(
        stream = %name,
        audio = reader.header().has_audio,
        video = reader.header().has_video,
        "Transmuxing {:?}",
        input
    );

    let mut sink = DirectorySink::create(&config.output, &name)?;
    let summary = transmux_stream(&name, reader, config.transmux_options(), &mut sink)?;
    tracing::info!(
        stream = %name,
        segments = summary.segments,
        dropped = summary.dropped_tags,
        "Finished {:?}",
        sink.dir()
    );
    Ok(summary)
}

/// Run one blocking worker per input and collect the results in input order.
pub async fn run_all(inputs: Vec<PathBuf>, config: Config) -> Result<Vec<StreamSummary>> {
    let mut names = HashSet::new();
    for input in &inputs {
        let name = stream_name(input)?;
        if !names.insert(name.clone()) {
            anyhow::bail!("Two inputs share the stream name '{}'", name);
        }
    }

    let mut handles = Vec::with_capacity(inputs.len());
    for input in inputs {
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            run_file(&input, &config)
        }));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        summaries.push(handle.await.context("Stream worker panicked")??);
    }
    Ok(summaries)
}
