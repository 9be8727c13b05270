//! Shared helpers for CLI tests.
//!
//! Builds small but well-formed FLV files in a temporary directory so tests
//! don't depend on binary fixtures.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

fn tag(tag_type: u8, timestamp: u32, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag_type];
    out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(&timestamp.to_be_bytes()[1..]);
    out.push((timestamp >> 24) as u8);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(body);
    out
}

fn video_tag(timestamp: u32, keyframe: bool) -> Vec<u8> {
    let nalu: &[u8] = if keyframe {
        &[0x65, 0x88, 0x84, 0x00, 0x33]
    } else {
        &[0x41, 0x9a, 0x02, 0x11]
    };
    let mut body = vec![if keyframe { 0x17 } else { 0x27 }, 0x01, 0, 0, 0];
    body.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
    body.extend_from_slice(nalu);
    tag(9, timestamp, &body)
}

/// Tags of an A/V stream: 25 fps video with a keyframe every second and
/// AAC every 23 ms.
pub fn stream_tags(duration_ms: u32) -> Vec<Vec<u8>> {
    let mut tags = vec![
        tag(8, 0, &[0xaf, 0x00, 0x12, 0x10]),
        tag(
            9,
            0,
            &[
                0x17, 0x00, 0, 0, 0, 0x01, 0x64, 0x00, 0x1f, 0xff, 0xe1, 0x00, 0x04, 0x67, 0x64,
                0x00, 0x1f, 0x01, 0x00, 0x03, 0x68, 0xeb, 0xe3,
            ],
        ),
    ];

    let (mut video_ts, mut audio_ts) = (0u32, 0u32);
    while video_ts < duration_ms || audio_ts < duration_ms {
        if video_ts <= audio_ts && video_ts < duration_ms {
            tags.push(video_tag(video_ts, video_ts % 1000 == 0));
            video_ts += 40;
        } else if audio_ts < duration_ms {
            tags.push(tag(8, audio_ts, &[0xaf, 0x01, 0x21, 0x10, 0x04, 0x60]));
            audio_ts += 23;
        } else {
            break;
        }
    }
    tags
}

/// Wrap tags in an FLV file body.
pub fn flv_file(tags: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"FLV\x01\x05\x00\x00\x00\x09".to_vec();
    out.extend_from_slice(&[0, 0, 0, 0]);
    for t in tags {
        out.extend_from_slice(t);
        out.extend_from_slice(&(t.len() as u32).to_be_bytes());
    }
    out
}

/// Write an FLV file named `name` into `dir`.
pub fn write_flv(dir: &Path, name: &str, duration_ms: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, flv_file(&stream_tags(duration_ms))).unwrap();
    path
}
