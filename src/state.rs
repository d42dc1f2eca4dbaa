//! Transfer-session state machine types.
//!
//! ```text
//!           ┌──────── more segments ────────┐
//!           ▼                               │
//!  Idle ──send──▶ AwaitingAck ──in-order──▶ Advancing ──none left──▶ Completed
//!                  │      ▲
//!                  │      │ corrupted / stale / out-of-order / timeout
//!                  │      └── retransmit
//!                  │
//!                  └── timeout above ceiling ──▶ Aborted
//! ```
//!
//! Transitions live in [`crate::sender::TransferSession`].

/// Every state a transfer session can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// A segment is ready to be framed and sent.
    #[default]
    Idle,
    /// The current segment is on the wire; waiting for its acknowledgment.
    AwaitingAck,
    /// The current segment was acknowledged; moving to the next one.
    Advancing,
    /// The retransmission timeout rose above its ceiling.  Terminal.
    Aborted,
    /// Every segment was acknowledged in order.  Terminal.
    Completed,
}

impl SessionState {
    /// `true` for [`SessionState::Aborted`] and [`SessionState::Completed`].
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::Completed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// How an inbound frame was judged while awaiting an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckClass {
    /// Checksum failed or the frame was truncated.
    Corrupted,
    /// A byte-for-byte reflection of the frame we just sent.
    Echo,
    /// The acknowledgment of the previous segment, seen again.
    Stale,
    /// The acknowledgment we are waiting for.
    InOrder,
    /// Any other acknowledgment number.
    OutOfOrder,
}
