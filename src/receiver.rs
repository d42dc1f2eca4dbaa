//! Inbound half of the stop-and-wait protocol.
//!
//! The [`Receiver`] is responsible for everything that happens after a raw
//! datagram arrives and before the application reads contiguous bytes:
//! - Validating the frame checksum.
//! - Accepting the segment carrying the next expected sequence number.
//! - Re-acknowledging retransmitted duplicates without delivering them again.
//! - Answering corrupted or unexpected frames with the previous ACK, which
//!   the sender treats as stale and answers with a retransmission.
//!
//! [`Receiver::on_datagram`] is pure; [`Receiver::serve`] runs it against a
//! [`Channel`].
//!
//! A receiver tracks a single stream at a time.  The sender picks a fresh
//! initial sequence number for every payload, so each transfer needs its
//! own `serve` call (or an explicit [`Receiver::reset`]); `serve` resets the
//! stream state once the link goes idle.

use std::io;
use std::time::Duration;

use crate::channel::Channel;
use crate::packet::{next_seqnum, Frame};

/// How an inbound datagram was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// New in-order data, appended to the stream.
    Accepted,
    /// A retransmission of the last accepted segment.
    Duplicate,
    /// Failed the checksum or was too short.
    Corrupted,
    /// Valid, but neither expected nor a duplicate.
    Unexpected,
}

/// Timing for [`Receiver::serve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeOptions {
    /// How long to wait for the very first datagram; `None` waits forever.
    pub startup: Option<Duration>,
    /// Once data has arrived, stop after this long without traffic.
    ///
    /// Must exceed the sender's retransmission timeout, or a lost final ACK
    /// leaves the sender retrying against nobody.
    pub idle: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            startup: None,
            idle: Duration::from_secs(15),
        }
    }
}

/// Receive-side state for one stream.
#[derive(Debug)]
pub struct Receiver {
    mss: usize,
    /// Sequence number of the next in-order segment; unknown until the
    /// first segment arrives.
    expected: Option<u8>,
    /// Sequence number of the last accepted segment.
    last_seqnum: Option<u8>,
    /// Encoded ACK for the last accepted segment.
    last_ack: Option<Vec<u8>>,
    /// Bytes ready to be consumed by the application, in order.
    pub app_buffer: Vec<u8>,
}

impl Receiver {
    /// `mss` must match the sender's, since both advance sequence numbers
    /// by it.
    pub fn new(mss: usize) -> Self {
        Self {
            mss,
            expected: None,
            last_seqnum: None,
            last_ack: None,
            app_buffer: Vec::new(),
        }
    }

    /// Sequence number the receiver will accept next.
    pub fn expected(&self) -> Option<u8> {
        self.expected
    }

    /// Forget the current stream so the next data frame starts a new one.
    /// Bytes already in [`app_buffer`](Receiver::app_buffer) are kept.
    pub fn reset(&mut self) {
        self.expected = None;
        self.last_seqnum = None;
        self.last_ack = None;
    }

    /// Process one datagram, returning what happened and the reply to send.
    pub fn on_datagram(&mut self, datagram: &[u8]) -> (Disposition, Option<Vec<u8>>) {
        let frame = match Frame::decode(datagram) {
            Ok(frame) if !frame.is_ack() => frame,
            Ok(_) => return (Disposition::Unexpected, None),
            Err(e) => {
                log::debug!("[arq:rx] dropping frame: {e}");
                return (Disposition::Corrupted, self.last_ack.clone());
            }
        };

        if self.expected.is_none() || self.expected == Some(frame.seqnum) {
            let ack = Frame::ack(frame.seqnum, frame.payload.len()).encode();
            log::debug!(
                "[arq:rx] ← DATA seq={} len={}; → ACK ack={}",
                frame.seqnum,
                frame.payload.len(),
                ack[1]
            );
            self.app_buffer.extend_from_slice(&frame.payload);
            self.expected = Some(next_seqnum(frame.seqnum, self.mss));
            self.last_seqnum = Some(frame.seqnum);
            self.last_ack = Some(ack.clone());
            return (Disposition::Accepted, Some(ack));
        }

        if self.last_seqnum == Some(frame.seqnum) {
            log::debug!("[arq:rx] duplicate seq={}; re-ACK", frame.seqnum);
            return (Disposition::Duplicate, self.last_ack.clone());
        }

        log::debug!(
            "[arq:rx] unexpected seq={} (want {:?})",
            frame.seqnum,
            self.expected
        );
        (Disposition::Unexpected, self.last_ack.clone())
    }

    /// Answer datagrams on `channel` until the stream goes quiet, then
    /// [`reset`](Receiver::reset).
    ///
    /// Returns the number of bytes delivered into
    /// [`app_buffer`](Receiver::app_buffer) during this call.
    pub fn serve<C: Channel>(&mut self, channel: &mut C, opts: ServeOptions) -> io::Result<usize> {
        let start_len = self.app_buffer.len();
        let mut heard = false;
        loop {
            let wait = match (heard, opts.startup) {
                (false, Some(startup)) => startup,
                (false, None) => Duration::from_secs(3600),
                (true, _) => opts.idle,
            };
            channel.set_timeout(wait)?;
            match channel.receive()? {
                Some(datagram) => {
                    heard = true;
                    let (_, reply) = self.on_datagram(&datagram);
                    if let Some(reply) = reply {
                        channel.transmit(&reply)?;
                    }
                }
                None if heard || opts.startup.is_some() => break,
                None => {}
            }
        }
        self.reset();
        Ok(self.app_buffer.len() - start_len)
    }
}
