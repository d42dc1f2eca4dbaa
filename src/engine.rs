//! Stop-and-wait sender engine.
//!
//! A [`SenderEngine`] owns a [`Channel`] and a [`RetryPolicy`] template.
//! Each [`SenderEngine::send`] call builds a fresh
//! [`TransferSession`](crate::sender::TransferSession) and drives it:
//!
//! ```text
//!  transmit(pending) ─▶ set_timeout(policy) ─▶ receive()
//!        ▲                                        │
//!        │      Transmit / Retransmit             │ datagram | timeout
//!        └──────────── session.on_*() ◀───────────┘
//! ```
//!
//! The loop ends when the session reports `Completed`, or `Aborted` after
//! one last transmission of the pending frame.  Every
//! per-segment anomaly is absorbed here; only the fatal timeout and channel
//! I/O failures reach the caller.

use std::io;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::channel::Channel;
use crate::packet::{MAX_MSS, MSS};
use crate::sender::{Step, TransferSession, TransferStats};
use crate::timer::{ConfigError, RetryPolicy};

/// Errors surfaced by [`SenderEngine::send`].
#[derive(Error, Debug)]
pub enum SendError {
    /// The retransmission timeout grew past its ceiling.  The transfer was
    /// abandoned; retrying on the same channel is not expected to help.
    #[error("retransmission timeout grew to {timeout:?}, above the ceiling")]
    TimeoutCeilingExceeded { timeout: Duration },
    /// The channel failed for a reason other than a receive timeout.
    #[error("channel I/O error: {0}")]
    Channel(#[from] io::Error),
}

/// Per-engine settings shared by every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Maximum segment size in bytes.
    pub mss: usize,
    /// Sequence number of the first segment; random when `None`.
    pub initial_seqnum: Option<u8>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            mss: MSS,
            initial_seqnum: None,
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_MSS).contains(&self.mss) {
            return Err(ConfigError::InvalidMss {
                mss: self.mss,
                max: MAX_MSS,
            });
        }
        Ok(())
    }
}

/// Sends whole payloads reliably over an unreliable channel, one segment at
/// a time.
pub struct SenderEngine<C, P> {
    channel: C,
    policy: P,
    config: SenderConfig,
}

impl<C: Channel, P: RetryPolicy + Clone> SenderEngine<C, P> {
    /// Build an engine.  `policy` is cloned into every transfer, so its
    /// adaptation never carries over between payloads.
    pub fn new(channel: C, policy: P, config: SenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            channel,
            policy,
            config,
        })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Deliver `payload` in order and exactly once, or fail with
    /// [`SendError::TimeoutCeilingExceeded`].
    ///
    /// An empty payload completes immediately without touching the channel.
    pub fn send(&mut self, payload: &[u8]) -> Result<TransferStats, SendError> {
        let seqnum = self
            .config
            .initial_seqnum
            .unwrap_or_else(|| rand::rng().random());
        let mut session =
            TransferSession::new(payload, self.config.mss, seqnum, self.policy.clone());
        log::debug!(
            "[arq] sending {} bytes from seq={seqnum} mss={}",
            payload.len(),
            self.config.mss
        );

        let mut step = session.start();
        loop {
            match step {
                Step::Transmit | Step::Retransmit => {
                    self.channel.transmit(session.pending_frame())?;
                    self.channel.set_timeout(session.timeout())?;
                    step = match self.channel.receive()? {
                        Some(datagram) => session.on_datagram(&datagram),
                        None => session.on_timeout(),
                    };
                }
                Step::Completed => {
                    let stats = session.stats();
                    log::info!(
                        "[arq] delivered {} bytes in {} segment(s), {} retransmission(s)",
                        payload.len(),
                        stats.segments,
                        stats.retransmissions
                    );
                    return Ok(stats);
                }
                Step::Aborted => {
                    self.channel.transmit(session.pending_frame())?;
                    return Err(SendError::TimeoutCeilingExceeded {
                        timeout: session.timeout(),
                    });
                }
            }
        }
    }
}
