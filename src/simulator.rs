//! Fault-injecting channel for testing.
//!
//! Real networks drop, reorder, duplicate and corrupt datagrams.  To
//! exercise the reliability mechanisms without depending on actual network
//! conditions, [`Simulator`] wraps any [`Channel`] and applies a
//! configurable fault model to outbound traffic:
//!
//! | Fault       | Description                                            |
//! |-------------|--------------------------------------------------------|
//! | Loss        | Drop a datagram with probability `loss_rate`.          |
//! | Corruption  | Flip one random bit with probability `corrupt_rate`.   |
//! | Duplication | Deliver a datagram twice.                              |
//! | Reordering  | Hold a datagram back until the next one has been sent. |
//!
//! Faults are applied on transmit only.  Wrap both ends to damage traffic
//! in both directions.

use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::Channel;
use crate::timer::ConfigError;

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Probability that a datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a delivered datagram has one bit flipped.
    pub corrupt_rate: f64,
    /// Probability that a delivered datagram is sent twice.
    pub duplicate_rate: f64,
    /// Probability that a datagram is held back behind the next one.
    pub reorder_rate: f64,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Reject probabilities outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("loss_rate", self.loss_rate),
            ("corrupt_rate", self.corrupt_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("reorder_rate", self.reorder_rate),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Counters of the faults injected so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultStats {
    pub sent: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub duplicated: u64,
    pub reordered: u64,
}

/// A fault-injecting wrapper around another channel.
pub struct Simulator<C> {
    inner: C,
    config: SimulatorConfig,
    rng: StdRng,
    held: Option<Vec<u8>>,
    stats: FaultStats,
}

impl<C: Channel> Simulator<C> {
    /// Wrap `inner`.  Fails if any probability lies outside `[0, 1]`.
    pub fn new(inner: C, config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            inner,
            config,
            rng,
            held: None,
            stats: FaultStats::default(),
        })
    }

    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn deliver(&mut self, datagram: &[u8]) -> io::Result<()> {
        let mut out = datagram.to_vec();
        if !out.is_empty() && self.rng.random_bool(self.config.corrupt_rate) {
            let byte = self.rng.random_range(0..out.len());
            let bit: u32 = self.rng.random_range(0..8);
            out[byte] ^= 1 << bit;
            self.stats.corrupted += 1;
        }
        self.inner.transmit(&out)?;
        if self.rng.random_bool(self.config.duplicate_rate) {
            self.stats.duplicated += 1;
            self.inner.transmit(&out)?;
        }
        Ok(())
    }
}

impl<C: Channel> Channel for Simulator<C> {
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.stats.sent += 1;
        if self.rng.random_bool(self.config.loss_rate) {
            self.stats.dropped += 1;
            log::trace!("[sim] dropped {} bytes", datagram.len());
            return Ok(());
        }
        if self.held.is_none() && self.rng.random_bool(self.config.reorder_rate) {
            self.stats.reordered += 1;
            self.held = Some(datagram.to_vec());
            return Ok(());
        }
        self.deliver(datagram)?;
        if let Some(held) = self.held.take() {
            self.deliver(&held)?;
        }
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        let received = self.inner.receive()?;
        // Nothing else will be sent while we wait, so a held datagram would
        // otherwise be stuck forever.
        if received.is_none() {
            if let Some(held) = self.held.take() {
                self.deliver(&held)?;
            }
        }
        Ok(received)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.inner.set_timeout(timeout)
    }
}
