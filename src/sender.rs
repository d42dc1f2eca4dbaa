//! Outbound state for one stop-and-wait transfer.
//!
//! [`TransferSession`] segments a payload, frames the in-flight segment and
//! judges every inbound datagram.  It does **not** touch the channel;
//! [`crate::engine::SenderEngine`] calls these methods and owns the actual
//! transmit/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** segment is in flight at any moment.
//! - Every [`Step::Transmit`] or [`Step::Retransmit`] asks the caller for
//!   exactly one transmission of [`TransferSession::pending_frame`].
//! - On a correct acknowledgment: advance the sequence number by MSS and
//!   frame the next segment.
//! - On anything else: resend the same bytes unchanged.
//! - A frame whose payload is exactly [`ECHO_PAYLOAD_LEN`] bytes is a
//!   request to resend, whatever its acknowledgment number.

use std::time::Duration;

use crate::packet::{ack_for, build_frame, next_seqnum, split, Frame, Segments};
use crate::state::{AckClass, SessionState};
use crate::timer::{RetryPolicy, FAILURES_BEFORE_BACKOFF};

/// Payload length that marks an inbound frame as an echo request.
pub const ECHO_PAYLOAD_LEN: usize = 3;

/// What the caller must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send the pending frame for the first time.
    Transmit,
    /// Send the pending frame again.
    Retransmit,
    /// All segments were acknowledged.
    Completed,
    /// The retry policy gave up.  The caller sends the pending frame one
    /// final time and stops.
    Aborted,
}

/// Counters reported when a transfer completes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Segments acknowledged in order.
    pub segments: usize,
    /// Datagrams handed to the channel, retransmissions included.
    pub transmissions: u64,
    /// The subset of `transmissions` that were resends.
    pub retransmissions: u64,
    /// Retransmission timeout in force when the transfer ended.
    pub final_timeout: Duration,
}

/// Sender-side state for a single `send` call.
///
/// Created fresh for every payload and discarded afterwards.
#[derive(Debug)]
pub struct TransferSession<'a, P> {
    segments: Segments<'a>,
    mss: usize,
    state: SessionState,
    /// Sequence number of the in-flight segment.
    current_seqnum: u8,
    /// Payload length of the in-flight segment.
    current_len: usize,
    /// Serialised in-flight frame, resent verbatim.
    pending_frame: Vec<u8>,
    /// Consecutive failures for the in-flight segment.
    duplicate_count: u32,
    policy: P,
    stats: TransferStats,
}

impl<'a, P: RetryPolicy> TransferSession<'a, P> {
    /// Prepare to send `payload` in `mss`-byte segments, numbering the first
    /// one `initial_seqnum`.
    pub fn new(payload: &'a [u8], mss: usize, initial_seqnum: u8, policy: P) -> Self {
        Self {
            segments: split(payload, mss),
            mss,
            state: SessionState::Idle,
            current_seqnum: initial_seqnum,
            current_len: 0,
            pending_frame: Vec::new(),
            duplicate_count: 0,
            policy,
            stats: TransferStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_seqnum(&self) -> u8 {
        self.current_seqnum
    }

    pub fn duplicate_count(&self) -> u32 {
        self.duplicate_count
    }

    /// Bytes of the frame currently in flight.
    pub fn pending_frame(&self) -> &[u8] {
        &self.pending_frame
    }

    /// Acknowledgment number that confirms the in-flight segment.
    pub fn expected_ack(&self) -> u8 {
        ack_for(self.current_seqnum, self.current_len)
    }

    /// Current bound on a single wait for an acknowledgment.
    pub fn timeout(&self) -> Duration {
        self.policy.timeout()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            final_timeout: self.policy.timeout(),
            ..self.stats
        }
    }

    /// Frame the first segment, or complete at once for an empty payload.
    pub fn start(&mut self) -> Step {
        debug_assert_eq!(self.state, SessionState::Idle, "session started twice");
        self.frame_next()
    }

    /// Judge an inbound datagram against the in-flight segment.
    ///
    /// Checks run in order: integrity, echo (our own frame reflected back,
    /// or a three-byte payload), the previous segment's acknowledgment, the
    /// expected acknowledgment.
    pub fn classify(&self, datagram: &[u8]) -> AckClass {
        let frame = match Frame::decode(datagram) {
            Ok(frame) => frame,
            Err(_) => return AckClass::Corrupted,
        };
        if datagram == self.pending_frame.as_slice() || frame.payload.len() == ECHO_PAYLOAD_LEN
        {
            AckClass::Echo
        } else if frame.acknum == self.current_seqnum {
            AckClass::Stale
        } else if frame.acknum == self.expected_ack() {
            AckClass::InOrder
        } else {
            AckClass::OutOfOrder
        }
    }

    /// Advance the state machine on an inbound datagram.
    pub fn on_datagram(&mut self, datagram: &[u8]) -> Step {
        if let Some(step) = self.settled() {
            return step;
        }
        let class = self.classify(datagram);
        log::debug!(
            "[arq] ← {} bytes while awaiting ack={} for seq={}: {:?}",
            datagram.len(),
            self.expected_ack(),
            self.current_seqnum,
            class
        );
        match class {
            AckClass::Corrupted => self.fail(),
            AckClass::Echo | AckClass::Stale | AckClass::OutOfOrder => self.retransmit(),
            AckClass::InOrder => self.advance(),
        }
    }

    /// Advance the state machine when no datagram arrived in time.
    pub fn on_timeout(&mut self) -> Step {
        if let Some(step) = self.settled() {
            return step;
        }
        log::debug!(
            "[arq] timeout after {:?} waiting for ack={}",
            self.policy.timeout(),
            self.expected_ack()
        );
        self.fail()
    }

    /// The step to repeat if the session already reached a terminal state.
    fn settled(&self) -> Option<Step> {
        match self.state {
            SessionState::Completed => Some(Step::Completed),
            SessionState::Aborted => Some(Step::Aborted),
            _ => {
                debug_assert_eq!(self.state, SessionState::AwaitingAck);
                None
            }
        }
    }

    fn frame_next(&mut self) -> Step {
        self.state = SessionState::Idle;
        match self.segments.next() {
            Some(chunk) => {
                self.current_len = chunk.len();
                self.pending_frame = build_frame(self.current_seqnum, 0, chunk).encode();
                self.state = SessionState::AwaitingAck;
                self.stats.transmissions += 1;
                log::debug!(
                    "[arq] → DATA seq={} len={} timeout={:?}",
                    self.current_seqnum,
                    chunk.len(),
                    self.policy.timeout()
                );
                Step::Transmit
            }
            None => {
                self.state = SessionState::Completed;
                Step::Completed
            }
        }
    }

    fn advance(&mut self) -> Step {
        self.policy.on_clean_delivery();
        self.duplicate_count = 0;
        self.stats.segments += 1;
        self.current_seqnum = next_seqnum(self.current_seqnum, self.mss);
        self.state = SessionState::Advancing;
        self.frame_next()
    }

    fn retransmit(&mut self) -> Step {
        self.stats.transmissions += 1;
        self.stats.retransmissions += 1;
        Step::Retransmit
    }

    /// A corrupted acknowledgment or a timeout.  The pending frame goes out
    /// again even when the policy then gives up.
    fn fail(&mut self) -> Step {
        let step = self.retransmit();
        self.policy.on_failure();
        self.duplicate_count += 1;
        if self.duplicate_count >= FAILURES_BEFORE_BACKOFF {
            self.duplicate_count = 0;
        }
        if self.policy.is_exhausted() {
            log::warn!(
                "[arq] timeout {:?} above ceiling; aborting at seq={}",
                self.policy.timeout(),
                self.current_seqnum
            );
            self.state = SessionState::Aborted;
            return Step::Aborted;
        }
        step
    }
}
