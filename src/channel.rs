//! The unreliable datagram channel the sender runs over.
//!
//! [`Channel`] decouples the protocol engine from transport and fault
//! injection.  [`crate::socket::UdpChannel`] talks to a real peer;
//! [`crate::simulator::Simulator`] wraps any channel and damages traffic.

use std::io;
use std::time::Duration;

/// A datagram channel that may lose, corrupt, duplicate or reorder traffic.
///
/// All methods take `&mut self`; a channel serves one transfer at a time.
pub trait Channel {
    /// Send one datagram.  Delivery is not guaranteed.
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Wait for the next datagram, no longer than the last
    /// [`set_timeout`](Channel::set_timeout) value.
    ///
    /// Returns `Ok(None)` when the wait timed out.
    fn receive(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Bound subsequent [`receive`](Channel::receive) calls.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()> {
        (**self).transmit(datagram)
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        (**self).receive()
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()> {
        (**self).transmit(datagram)
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        (**self).receive()
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }
}
