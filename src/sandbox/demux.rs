//! Output stream demultiplexing
//!
//! The runtime delivers stdout and stderr over one stream. Raw frames
//! carry an 8-byte header whose first byte tags the stream (1 = stdout,
//! 2 = stderr); every chunk is assumed to hold exactly one frame, so no
//! state is carried between chunks.

use crate::sandbox::runtime::LogChunk;

const HEADER_LEN: usize = 8;
const STDERR_TAG: u8 = 2;

/// Append-only stdout/stderr accumulator
#[derive(Debug, Default, Clone)]
pub struct Demultiplexer {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one inbound chunk
    pub fn push(&mut self, chunk: LogChunk) {
        match chunk {
            LogChunk::Frame(frame) => self.push_frame(&frame),
            LogChunk::Stdout(bytes) => self.stdout.extend_from_slice(&bytes),
            LogChunk::Stderr(bytes) => self.stderr.extend_from_slice(&bytes),
        }
    }

    /// Route one raw frame. The header's length field is not trusted: the
    /// payload is everything after the header. Chunks too short to carry a
    /// payload are kept verbatim on stdout rather than dropped.
    pub fn push_frame(&mut self, frame: &[u8]) {
        if frame.len() <= HEADER_LEN {
            self.stdout.extend_from_slice(frame);
            return;
        }

        let payload = &frame[HEADER_LEN..];
        if frame[0] == STDERR_TAG {
            self.stderr.extend_from_slice(payload);
        } else {
            self.stdout.extend_from_slice(payload);
        }
    }

    /// Decoded stdout so far
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Decoded stderr so far
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Build a raw frame the way the Docker daemon does (big-endian length in
/// the last four header bytes)
#[cfg(test)]
pub(crate) fn encode_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(tag);
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
