//! Shared FLV tag builders for integration tests.
//!
//! [`SyntheticStream`] produces an interleaved AAC + H.264 tag sequence with
//! known payloads so tests can check exactly what comes out the other end.

#![allow(dead_code)]

/// Build a complete FLV tag: 11-byte header plus body.
pub fn tag(tag_type: u8, timestamp: u32, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag_type];
    out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(&timestamp.to_be_bytes()[1..]);
    out.push((timestamp >> 24) as u8);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(body);
    out
}

/// AAC LC, 44.1 kHz, stereo.
pub fn aac_sequence_header(timestamp: u32) -> Vec<u8> {
    tag(8, timestamp, &[0xaf, 0x00, 0x12, 0x10])
}

pub fn aac_raw(timestamp: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![0xaf, 0x01];
    body.extend_from_slice(payload);
    tag(8, timestamp, &body)
}

pub const SPS: [u8; 4] = [0x67, 0x64, 0x00, 0x1f];
pub const PPS: [u8; 3] = [0x68, 0xeb, 0xe3];

/// Config record with one SPS, one PPS and `length_size`-byte NALU lengths.
pub fn avc_config(timestamp: u32, length_size: usize) -> Vec<u8> {
    let mut body = vec![0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x64, 0x00, 0x1f];
    body.push(0xfc | (length_size as u8 - 1));
    body.push(0xe1);
    body.extend_from_slice(&(SPS.len() as u16).to_be_bytes());
    body.extend_from_slice(&SPS);
    body.push(0x01);
    body.extend_from_slice(&(PPS.len() as u16).to_be_bytes());
    body.extend_from_slice(&PPS);
    tag(9, timestamp, &body)
}

/// NALU data tag carrying one NALU with a `length_size`-byte length.
pub fn avc_nalu(timestamp: u32, keyframe: bool, length_size: usize, nalu: &[u8]) -> Vec<u8> {
    let mut body = vec![if keyframe { 0x17 } else { 0x27 }, 0x01, 0x00, 0x00, 0x00];
    let len = (nalu.len() as u64).to_be_bytes();
    body.extend_from_slice(&len[8 - length_size..]);
    body.extend_from_slice(nalu);
    tag(9, timestamp, &body)
}

/// One video frame as sent.
#[derive(Debug, Clone)]
pub struct SentVideo {
    pub timestamp: u32,
    pub keyframe: bool,
    pub nalu: Vec<u8>,
}

/// An interleaved stream: 25 fps video, one AAC frame every 23 ms.
pub struct SyntheticStream {
    pub tags: Vec<Vec<u8>>,
    pub audio: Vec<Vec<u8>>,
    pub video: Vec<SentVideo>,
}

impl SyntheticStream {
    /// `duration_ms` of media with a keyframe every `gop_ms`.
    pub fn new(duration_ms: u32, gop_ms: u32) -> Self {
        let mut events: Vec<(u32, bool)> = Vec::new();
        events.extend((0..duration_ms).step_by(40).map(|ts| (ts, true)));
        events.extend((0..duration_ms).step_by(23).map(|ts| (ts, false)));
        events.sort_by_key(|&(ts, is_video)| (ts, !is_video));

        let mut tags = vec![aac_sequence_header(0), avc_config(0, 4)];
        let mut audio = Vec::new();
        let mut video = Vec::new();
        for (ts, is_video) in events {
            if is_video {
                let keyframe = ts % gop_ms == 0;
                let seq = video.len();
                // Non-zero filler so start codes cannot appear inside a NALU.
                let mut nalu = vec![if keyframe { 0x65 } else { 0x41 }];
                nalu.extend((0..300 + seq % 200).map(|i| (i % 250) as u8 + 1));
                tags.push(avc_nalu(ts, keyframe, 4, &nalu));
                video.push(SentVideo {
                    timestamp: ts,
                    keyframe,
                    nalu,
                });
            } else {
                let seq = audio.len();
                let payload: Vec<u8> = (0..120 + seq % 50).map(|i| (seq + i) as u8).collect();
                tags.push(aac_raw(ts, &payload));
                audio.push(payload);
            }
        }

        Self { tags, audio, video }
    }
}

/// Split concatenated ADTS frames into raw payloads.
pub fn split_adts(mut data: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while !data.is_empty() {
        assert_eq!(&data[..2], &[0xff, 0xf1], "ADTS sync lost");
        let len = livets_media::flv::aac::adts_frame_length(data);
        frames.push(data[7..len].to_vec());
        data = &data[len..];
    }
    frames
}

/// Split Annex B data on 4-byte start codes.
pub fn split_annex_b(data: &[u8]) -> Vec<Vec<u8>> {
    assert!(data.starts_with(&[0, 0, 0, 1]), "missing leading start code");
    let mut nalus = Vec::new();
    let mut start = 4;
    let mut i = 4;
    while i + 4 <= data.len() {
        if data[i..i + 4] == [0, 0, 0, 1] {
            nalus.push(data[start..i].to_vec());
            start = i + 4;
            i += 4;
        } else {
            i += 1;
        }
    }
    nalus.push(data[start..].to_vec());
    nalus
}
