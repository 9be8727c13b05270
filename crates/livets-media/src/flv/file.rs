//! FLV file reader yielding complete tag buffers.

use super::TAG_HEADER_SIZE;
use crate::{Error, Result};
use std::io::{self, Read};

/// Parsed FLV file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Reads an FLV file and yields each tag as one buffer: the 11-byte tag
/// header followed by its body. Previous-tag-size fields are skipped.
#[derive(Debug)]
pub struct FlvReader<R> {
    reader: R,
    header: FlvHeader,
    tags_read: u64,
}

impl<R: Read> FlvReader<R> {
    /// Read the file header and position the reader at the first tag.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut head = [0u8; 9];
        read_exact_or_eof(&mut reader, &mut head)?;
        if &head[..3] != b"FLV" {
            return Err(Error::BadFlvSignature([head[0], head[1], head[2]]));
        }
        let header = FlvHeader {
            version: head[3],
            has_audio: head[4] & 0x04 != 0,
            has_video: head[4] & 0x01 != 0,
        };

        // Data offset may exceed 9 if the header carries extra bytes.
        let data_offset = u32::from_be_bytes([head[5], head[6], head[7], head[8]]) as u64;
        let extra = data_offset.saturating_sub(head.len() as u64);
        io::copy(&mut (&mut reader).take(extra), &mut io::sink())?;

        // PreviousTagSize0
        let mut prev = [0u8; 4];
        read_exact_or_eof(&mut reader, &mut prev)?;

        Ok(Self {
            reader,
            header,
            tags_read: 0,
        })
    }

    pub fn header(&self) -> &FlvHeader {
        &self.header
    }

    /// Number of tags returned so far.
    pub fn tags_read(&self) -> u64 {
        self.tags_read
    }

    /// Read the next tag, or `None` at a clean end of file.
    pub fn next_tag(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; TAG_HEADER_SIZE];
        let got = read_full(&mut self.reader, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < TAG_HEADER_SIZE {
            return Err(Error::EndOfInput {
                need: TAG_HEADER_SIZE,
                have: got,
            });
        }

        let body_size = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
        let mut tag = Vec::with_capacity(TAG_HEADER_SIZE + body_size);
        tag.extend_from_slice(&header);
        tag.resize(TAG_HEADER_SIZE + body_size, 0);
        let got = read_full(&mut self.reader, &mut tag[TAG_HEADER_SIZE..])?;
        if got < body_size {
            return Err(Error::EndOfInput {
                need: body_size,
                have: got,
            });
        }

        // A missing trailing previous-tag-size is tolerated.
        let mut prev = [0u8; 4];
        read_full(&mut self.reader, &mut prev)?;

        self.tags_read += 1;
        Ok(Some(tag))
    }
}

impl<R: Read> Iterator for FlvReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag().transpose()
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let got = read_full(reader, buf)?;
    if got < buf.len() {
        return Err(Error::EndOfInput {
            need: buf.len(),
            have: got,
        });
    }
    Ok(())
}
