//! `udp-arq` — reliable, in-order byte delivery over an unreliable datagram
//! channel using stop-and-wait ARQ.
//!
//! # Architecture
//!
//! ```text
//!  payload ──▶ ┌──────────────┐  frames   ┌───────────┐
//!              │ SenderEngine │──────────▶│  Channel  │──▶ Receiver
//!              └──────┬───────┘◀──────────│ (UDP, sim)│◀── ACKs
//!                     │          ACKs     └───────────┘
//!              ┌──────▼──────────────────────────┐
//!              │ TransferSession (one per send)   │
//!              │  framer + checksum + RetryPolicy │
//!              └──────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`checksum`]   — single-byte XOR integrity check
//! - [`packet`]     — wire format, segmentation, sequence numbers
//! - [`timer`]      — retransmission timeout policies
//! - [`state`]      — session state machine types
//! - [`sender`]     — per-transfer stop-and-wait state
//! - [`engine`]     — the transmit/receive loop driving a session
//! - [`receiver`]   — the matching inbound state machine
//! - [`channel`]    — datagram channel abstraction
//! - [`socket`]     — UDP implementation of [`channel::Channel`]
//! - [`simulator`]  — fault-injecting channel wrapper for testing

pub mod channel;
pub mod checksum;
pub mod engine;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;

pub use channel::Channel;
pub use engine::{SendError, SenderConfig, SenderEngine};
pub use packet::{Frame, FrameError, MSS};
pub use receiver::{Receiver, ServeOptions};
pub use sender::{TransferSession, TransferStats};
pub use state::SessionState;
pub use timer::{AdaptiveTimer, ConfigError, FixedTimeout, RetryPolicy, TimerConfig};
