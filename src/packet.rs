//! Wire format and segmentation.
//!
//! Every datagram exchanged between peers is a [`Frame`].  This module is
//! responsible for:
//! - Splitting an outbound payload into segments of at most MSS bytes.
//! - Advancing the modulo-256 sequence number between segments.
//! - Serialising a [`Frame`] into bytes and parsing bytes back, rejecting
//!   truncated or corrupted input.
//!
//! No I/O happens here.
//!
//! # Wire format
//!
//! Every field is a single byte, so byte order does not apply.
//!
//! ```text
//!  0          1          2          3 ...
//! +----------+----------+----------+----------------------+
//! | checksum |  acknum  |  seqnum  |  payload (0..=MSS)   |
//! +----------+----------+----------+----------------------+
//! ```
//!
//! Data frames carry `acknum = 0`.  ACK frames are header-only: `seqnum`
//! names the segment being acknowledged and `acknum` is
//! `(seqnum + payload_len) mod 256`.

use std::slice::Chunks;

use thiserror::Error;

use crate::checksum;

/// Default maximum segment size in bytes.
pub const MSS: usize = 250;

/// Largest MSS the 8-bit sequence space can represent unambiguously.
pub const MAX_MSS: usize = 255;

/// Byte length of the fixed header.
pub const HEADER_LEN: usize = 3;

/// Largest frame that can appear on the wire.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_MSS;

const OFF_CHECKSUM: usize = 0;
const OFF_ACKNUM: usize = 1;
const OFF_SEQNUM: usize = 2;

/// One protocol datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// XOR of every other serialised byte.
    ///
    /// Recomputed by [`Frame::encode`]; verified by [`Frame::decode`].
    pub checksum: u8,
    pub acknum: u8,
    pub seqnum: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// A pure acknowledgment for the segment `seqnum` carrying `len` bytes.
    pub fn ack(seqnum: u8, len: usize) -> Self {
        build_frame(seqnum, ack_for(seqnum, len), &[])
    }

    /// `true` when the frame carries no payload.
    pub fn is_ack(&self) -> bool {
        self.payload.is_empty()
    }

    /// Serialise the frame, recomputing the checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.push(0);
        buf.push(self.acknum);
        buf.push(self.seqnum);
        buf.extend_from_slice(&self.payload);
        buf[OFF_CHECKSUM] = checksum::compute(&buf[OFF_ACKNUM..]);
        buf
    }

    /// Parse a frame from a raw datagram.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`] or the
    /// checksum does not verify.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::BufferTooShort(buf.len()));
        }
        if !checksum::verify(buf) {
            return Err(FrameError::ChecksumFailed);
        }
        Ok(Frame {
            checksum: buf[OFF_CHECKSUM],
            acknum: buf[OFF_ACKNUM],
            seqnum: buf[OFF_SEQNUM],
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer of {0} bytes is too short to contain a header")]
    BufferTooShort(usize),
    #[error("checksum verification failed")]
    ChecksumFailed,
}

/// Assemble a frame with its checksum computed over
/// `[acknum, seqnum, chunk...]`.
pub fn build_frame(seqnum: u8, acknum: u8, chunk: &[u8]) -> Frame {
    let checksum = checksum::compute(&[acknum, seqnum]) ^ checksum::compute(chunk);
    Frame {
        checksum,
        acknum,
        seqnum,
        payload: chunk.to_vec(),
    }
}

/// Sequence number of the segment following `prev`.
///
/// Always advances by `mss`, even after a short final segment, because the
/// receiver computes its expected sequence number the same way.
pub fn next_seqnum(prev: u8, mss: usize) -> u8 {
    ((prev as usize + mss) % 256) as u8
}

/// Acknowledgment number confirming a `len`-byte segment at `seqnum`.
pub fn ack_for(seqnum: u8, len: usize) -> u8 {
    ((seqnum as usize + len) % 256) as u8
}

/// Iterator over the segments of a payload.
///
/// Cloning restarts iteration from the clone point without touching the
/// payload.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    inner: Chunks<'a, u8>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Segments<'_> {}

/// Split `payload` into consecutive chunks of at most `mss` bytes.
///
/// An empty payload yields no chunks.
///
/// # Panics
///
/// Panics if `mss` is zero.
pub fn split(payload: &[u8], mss: usize) -> Segments<'_> {
    assert!(mss >= 1, "mss must be at least 1");
    Segments {
        inner: payload.chunks(mss),
    }
}
